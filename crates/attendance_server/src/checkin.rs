//! Interactive check-in at the dojo terminal.

use attendance_client::clock::Clock;
use attendance_client::form::CheckInForm;
use attendance_client::preferences::PreferenceStore;
use attendance_client::sessions::{self, SessionMatcher};
use attendance_client::{AttendanceApi, AttendanceError, AttendanceRecord, records_for_date};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// What a completed check-in produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckInOutcome {
    pub row_number: Option<u64>,
    pub name: String,
    /// Everyone checked in today, including this check-in.
    pub today: Vec<AttendanceRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error(transparent)]
    Attendance(#[from] AttendanceError),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The batch name without its schedule, e.g. `Morning`.
pub fn short_batch_name(label: &str) -> &str {
    label.split('(').next().unwrap_or(label).trim()
}

/// Map a list number (1-based) or a batch id to the listed batch id.
fn resolve_batch<'o>(options: &'o [(String, String)], answer: &str) -> Option<&'o str> {
    let by_number = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i));
    by_number
        .or_else(|| options.iter().find(|(id, _)| id.eq_ignore_ascii_case(answer)))
        .map(|(id, _)| id.as_str())
}

pub struct CheckInSession<'a, R, W> {
    api: &'a dyn AttendanceApi,
    store: &'a PreferenceStore,
    clock: &'a dyn Clock,
    input: R,
    output: W,
}

impl<'a, R, W> CheckInSession<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        api: &'a dyn AttendanceApi,
        store: &'a PreferenceStore,
        clock: &'a dyn Clock,
        input: R,
        output: W,
    ) -> Self {
        Self {
            api,
            store,
            clock,
            input,
            output,
        }
    }

    /// Walk through the form once: restore saved values, prompt for each
    /// field (blank keeps the shown value), submit, then print today's list.
    pub async fn run(&mut self, matcher: SessionMatcher) -> Result<CheckInOutcome, CheckInError> {
        let today = self.clock.today();
        let now = self.clock.week_time();
        let mut form = CheckInForm::new(matcher, today.clone());
        form.mount(self.store.load().await, now);

        let message = form.suggestion_message(now);
        self.say(&format!("{message}\n")).await?;

        let name = self.prompt("Name", form.name()).await?;
        form.set_name(name);
        let email = self.prompt("Email", form.email()).await?;
        form.set_email(email);

        let options: Vec<(String, String)> = sessions::batch_options(form.matcher().windows())
            .into_iter()
            .map(|w| (w.id.clone(), w.label.clone()))
            .collect();
        for (i, (id, label)) in options.iter().enumerate() {
            let marker = if *id == form.batch() { '*' } else { ' ' };
            self.say(&format!("{marker} {}. {label}\n", i + 1)).await?;
        }
        let current_batch = form.batch().to_string();
        let picked = self.prompt_batch(&options, &current_batch).await?;
        if picked != current_batch {
            form.choose_batch(picked);
        }

        let shown_date = form.display_date();
        let date = self.prompt("Date", &shown_date).await?;
        if date != shown_date {
            form.set_date(&date);
        }

        let submission = form.submit(&today)?;
        let receipt = self.api.create(submission.record.clone()).await?;
        self.store.save(&submission.preferences).await;
        tracing::info!(row = ?receipt.row_number, batch = %submission.record.batch, "checked in");

        self.say(&format!(
            "\nOSS, {}! Attendance Marked Successfully!\n\n",
            submission.record.name
        ))
        .await?;

        let all = self.api.get_all().await?;
        let todays = records_for_date(&all, &today);
        self.print_list(&todays).await?;

        Ok(CheckInOutcome {
            row_number: receipt.row_number,
            name: submission.record.name,
            today: todays,
        })
    }

    async fn print_list(&mut self, records: &[AttendanceRecord]) -> Result<(), CheckInError> {
        self.say(&format!("Today's Warriors ({} checked in)\n", records.len())).await?;
        if records.is_empty() {
            self.say("No warriors yet today. Be the first to check in!\n").await?;
        }
        for record in records {
            let line = format!("  {} | {}\n", record.name, short_batch_name(&record.batch));
            self.say(&line).await?;
        }
        Ok(())
    }

    async fn say(&mut self, text: &str) -> Result<(), CheckInError> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Ask for a batch by list number or id until the answer names a listed
    /// batch. Blank input keeps `current`.
    async fn prompt_batch(
        &mut self,
        options: &[(String, String)],
        current: &str,
    ) -> Result<String, CheckInError> {
        loop {
            let answer = self.prompt("Batch", current).await?;
            if answer == current {
                return Ok(answer);
            }
            if let Some(id) = resolve_batch(options, &answer) {
                return Ok(id.to_string());
            }
            self.say(&format!(
                "Unknown batch \"{answer}\". Enter a number from 1 to {}.\n",
                options.len()
            ))
            .await?;
        }
    }

    /// Ask for one field. Blank input and end of input keep `current`.
    async fn prompt(&mut self, field: &str, current: &str) -> Result<String, CheckInError> {
        if current.is_empty() {
            self.say(&format!("{field}: ")).await?;
        } else {
            self.say(&format!("{field} [{current}]: ")).await?;
        }
        let mut line = String::new();
        self.input.read_line(&mut line).await?;
        let answer = line.trim();
        Ok(if answer.is_empty() {
            current.to_string()
        } else {
            answer.to_string()
        })
    }
}
