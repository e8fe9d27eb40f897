//! State behind the check-in form.
//!
//! The form pre-selects the suggested batch until the user picks one
//! themselves; a batch restored from saved preferences counts as picked.

use crate::dates::{self, DisplayOptions};
use crate::preferences::UserPreferences;
use crate::sessions::{SessionMatcher, Suggestion, WeekTime, batch_label};
use crate::{AttendanceError, NewRecord};

/// What a successful submit produces: the record to send and the values to
/// remember for next time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub record: NewRecord,
    pub preferences: UserPreferences,
}

#[derive(Clone, Debug)]
pub struct CheckInForm {
    matcher: SessionMatcher,
    name: String,
    email: String,
    batch: String,
    date: String,
    suggestion: Suggestion,
    batch_chosen: bool,
}

impl CheckInForm {
    pub fn new(matcher: SessionMatcher, today: impl Into<String>) -> Self {
        Self {
            matcher,
            name: String::new(),
            email: String::new(),
            batch: String::new(),
            date: today.into(),
            suggestion: Suggestion::none(),
            batch_chosen: false,
        }
    }

    /// Restore saved values and take the first suggestion.
    pub fn mount(&mut self, saved: Option<UserPreferences>, now: WeekTime) {
        if let Some(prefs) = saved {
            self.name = prefs.name;
            self.email = prefs.email;
            if !prefs.preferred_batch.is_empty() {
                self.batch = prefs.preferred_batch;
                self.batch_chosen = true;
            }
        }
        self.refresh(now);
    }

    /// Recompute the suggestion for `now`.
    pub fn refresh(&mut self, now: WeekTime) {
        let suggestion = self.matcher.suggest(now);
        self.apply_suggestion(suggestion);
    }

    /// Take a suggestion computed elsewhere, e.g. by the periodic refresher.
    pub fn apply_suggestion(&mut self, suggestion: Suggestion) {
        if !self.batch_chosen {
            self.batch = suggestion.batch_id.clone();
        }
        self.suggestion = suggestion;
    }

    pub fn choose_batch(&mut self, batch_id: impl Into<String>) {
        self.batch = batch_id.into();
        self.batch_chosen = true;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    /// Accepts any date spelling the normalizer understands.
    pub fn set_date(&mut self, date: &str) {
        self.date = dates::normalize_date(date);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn batch(&self) -> &str {
        &self.batch
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn suggestion(&self) -> &Suggestion {
        &self.suggestion
    }

    pub fn batch_chosen(&self) -> bool {
        self.batch_chosen
    }

    pub fn matcher(&self) -> &SessionMatcher {
        &self.matcher
    }

    pub fn suggestion_message(&self, now: WeekTime) -> String {
        self.matcher.message(&self.suggestion, now)
    }

    /// The selected date as shown under the date field.
    pub fn display_date(&self) -> String {
        dates::format_for_display(&self.date, &DisplayOptions::default())
    }

    /// Check required fields and produce the submission. On success the
    /// batch falls back to the current suggestion and the date to `today`;
    /// name and email stay filled in.
    pub fn submit(&mut self, today: &str) -> Result<Submission, AttendanceError> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("email", &self.email),
            ("batch", &self.batch),
            ("date", &self.date),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
        if !missing.is_empty() {
            return Err(AttendanceError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let batch = batch_label(&self.batch, self.matcher.windows())
            .map(str::to_string)
            .unwrap_or_else(|| self.batch.clone());
        let submission = Submission {
            record: NewRecord {
                name: self.name.clone(),
                email: self.email.clone(),
                batch,
                date: self.date.clone(),
            },
            preferences: UserPreferences {
                name: self.name.clone(),
                email: self.email.clone(),
                preferred_batch: self.batch.clone(),
            },
        };

        self.batch_chosen = false;
        self.batch = self.suggestion.batch_id.clone();
        self.date = today.to_string();
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SuggestionStatus;
    use chrono::Weekday::{Mon, Tue};

    fn at(day: chrono::Weekday, hour: u16, minute: u16) -> WeekTime {
        WeekTime::at(day, hour, minute).expect("time")
    }

    fn form() -> CheckInForm {
        CheckInForm::new(SessionMatcher::default(), "2024-03-05")
    }

    #[test]
    fn mount_without_preferences_selects_suggestion() {
        let mut f = form();
        f.mount(None, at(Tue, 7, 15));
        assert_eq!(f.batch(), "women");
        assert!(!f.batch_chosen());
        assert_eq!(f.suggestion().status, SuggestionStatus::Current);
    }

    #[test]
    fn saved_batch_beats_suggestion_and_survives_refresh() {
        let mut f = form();
        f.mount(
            Some(UserPreferences {
                name: "Asha".into(),
                email: "asha@example.com".into(),
                preferred_batch: "evening".into(),
            }),
            at(Tue, 7, 15),
        );
        assert_eq!(f.name(), "Asha");
        assert_eq!(f.batch(), "evening");
        f.refresh(at(Mon, 6, 30));
        assert_eq!(f.batch(), "evening");
        assert_eq!(f.suggestion().batch_id, "morning");
    }

    #[test]
    fn saved_preferences_without_batch_still_use_suggestion() {
        let mut f = form();
        f.mount(
            Some(UserPreferences {
                name: "Asha".into(),
                email: "asha@example.com".into(),
                preferred_batch: String::new(),
            }),
            at(Mon, 6, 30),
        );
        assert_eq!(f.batch(), "morning");
        assert!(!f.batch_chosen());
    }

    #[test]
    fn refresh_follows_the_clock_until_user_picks() {
        let mut f = form();
        f.mount(None, at(Mon, 6, 30));
        assert_eq!(f.batch(), "morning");
        f.refresh(at(Mon, 11, 0));
        assert_eq!(f.batch(), "afternoon");
        f.choose_batch("evening");
        f.refresh(at(Mon, 12, 5));
        assert_eq!(f.batch(), "evening");
    }

    #[test]
    fn submit_requires_every_field() {
        let mut f = form();
        f.mount(None, at(Mon, 3, 0));
        f.set_name("Asha");
        let err = f.submit("2024-03-05").expect_err("missing email and batch");
        match err {
            AttendanceError::Validation(msg) => {
                assert!(msg.contains("email"));
                assert!(msg.contains("batch"));
                assert!(!msg.contains("name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn submit_sends_label_and_resets_batch() {
        let mut f = form();
        f.mount(None, at(Mon, 6, 30));
        f.set_name("Asha");
        f.set_email("asha@example.com");
        f.choose_batch("evening");
        f.set_date("04/03/2024");
        let sub = f.submit("2024-03-05").expect("submission");
        assert_eq!(sub.record.batch, "Evening (Mon-Fri, 6:30 PM - 8:00 PM)");
        assert_eq!(sub.record.date, "2024-03-04");
        assert_eq!(sub.preferences.preferred_batch, "evening");

        assert_eq!(f.batch(), "morning");
        assert!(!f.batch_chosen());
        assert_eq!(f.date(), "2024-03-05");
        assert_eq!(f.name(), "Asha");
    }

    #[test]
    fn unknown_batch_is_sent_verbatim() {
        let mut f = form();
        f.set_name("Asha");
        f.set_email("asha@example.com");
        f.choose_batch("open-mat");
        let sub = f.submit("2024-03-05").expect("submission");
        assert_eq!(sub.record.batch, "open-mat");
    }

    #[test]
    fn messages_and_display_date() {
        let mut f = form();
        f.mount(None, at(Mon, 6, 30));
        assert_eq!(f.suggestion_message(at(Mon, 6, 30)), "Class starts in 30 minutes");
        assert_eq!(f.display_date(), "Tue, Mar 5");
    }
}
