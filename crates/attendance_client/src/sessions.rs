//! Class-session matching.
//!
//! Given a weekday and a minute of the day, [`SessionMatcher`] decides which
//! batch is in session right now, which one is about to start, or which one
//! has just finished, so the check-in form can pre-select a sensible batch.

use std::cmp::Reverse;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// How far ahead an upcoming class is still suggested.
pub const UPCOMING_LOOKAHEAD_MINUTES: u16 = 120;
/// How long after a class ends it is still reported as in session.
pub const GRACE_MINUTES: u16 = 30;
pub const MINUTES_PER_DAY: u16 = 24 * 60;

const NO_SESSION_MESSAGE: &str = "No class is currently in session. Please select your batch.";
const IN_SESSION_MESSAGE: &str = "Class in session now!";

/// Order in which batches are offered in the batch picker.
const PICKER_ORDER: [&str; 5] = ["morning", "afternoon", "evening", "women", "weekend"];

/// A recurring class time-slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionWindow {
    pub id: String,
    pub label: String,
    /// Minutes since midnight, inclusive.
    pub start_minutes: u16,
    /// Minutes since midnight, inclusive.
    pub end_minutes: u16,
    pub days: Vec<Weekday>,
}

impl SessionWindow {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        start_minutes: u16,
        end_minutes: u16,
        days: &[Weekday],
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            start_minutes,
            end_minutes,
            days: days.to_vec(),
        }
    }

    pub fn meets_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// True when `now` falls on one of the window's days and inside its
    /// inclusive minute range.
    pub fn contains(&self, now: WeekTime) -> bool {
        self.meets_on(now.weekday())
            && (self.start_minutes..=self.end_minutes).contains(&now.minutes())
    }
}

static DEFAULT_WINDOWS: LazyLock<Vec<SessionWindow>> = LazyLock::new(|| {
    use Weekday::{Fri, Mon, Sat, Sun, Thu, Tue, Wed};
    // Women's batch is declared ahead of morning: on Tue/Thu both cover
    // 7:00-8:00 and the first declared window wins.
    vec![
        SessionWindow::new(
            "women",
            "Women (Tue/Thu/Sat, 7:00 AM - 8:00 AM)",
            420,
            480,
            &[Tue, Thu, Sat],
        ),
        SessionWindow::new(
            "morning",
            "Morning (Mon-Fri, 7:00 AM - 8:30 AM)",
            420,
            510,
            &[Mon, Tue, Wed, Thu, Fri],
        ),
        SessionWindow::new(
            "weekend",
            "Weekend (Sat-Sun, 9:00 AM - 10:30 AM)",
            540,
            630,
            &[Sat, Sun],
        ),
        SessionWindow::new(
            "afternoon",
            "Afternoon (Mon/Wed/Fri, 12:00 PM - 1:30 PM)",
            720,
            810,
            &[Mon, Wed, Fri],
        ),
        SessionWindow::new(
            "evening",
            "Evening (Mon-Fri, 6:30 PM - 8:00 PM)",
            1110,
            1200,
            &[Mon, Tue, Wed, Thu, Fri],
        ),
    ]
});

/// The studio's batch timetable, in match order.
pub fn default_windows() -> &'static [SessionWindow] {
    &DEFAULT_WINDOWS
}

/// Windows in the order the batch picker lists them. Batches without a
/// fixed picker position follow in declared order.
pub fn batch_options(windows: &[SessionWindow]) -> Vec<&SessionWindow> {
    let mut options: Vec<&SessionWindow> = windows.iter().collect();
    options.sort_by_key(|w| {
        PICKER_ORDER
            .iter()
            .position(|id| *id == w.id)
            .unwrap_or(PICKER_ORDER.len())
    });
    options
}

pub fn find_window<'a>(id: &str, windows: &'a [SessionWindow]) -> Option<&'a SessionWindow> {
    windows.iter().find(|w| w.id == id)
}

/// Display label for a batch id, if the id is known.
pub fn batch_label<'a>(id: &str, windows: &'a [SessionWindow]) -> Option<&'a str> {
    find_window(id, windows).map(|w| w.label.as_str())
}

/// A point in the week: weekday plus minutes since local midnight (0..=1439).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WeekTime {
    weekday: Weekday,
    minutes: u16,
}

impl WeekTime {
    /// Returns `None` when `minutes` is not a valid minute of the day.
    pub fn new(weekday: Weekday, minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self { weekday, minutes })
    }

    /// Convenience constructor from a wall-clock hour and minute.
    pub fn at(weekday: Weekday, hour: u16, minute: u16) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::new(weekday, hour.checked_mul(60)?.checked_add(minute)?)
    }

    /// Wall-clock weekday and minute of `dt` in its own time zone.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            weekday: dt.weekday(),
            minutes: (dt.hour() * 60 + dt.minute()) as u16,
        }
    }

    pub fn now_local() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn minutes(&self) -> u16 {
        self.minutes
    }

    /// Day of week numbered from Sunday = 0.
    pub fn day_of_week(&self) -> u32 {
        self.weekday.num_days_from_sunday()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Current,
    Upcoming,
    None,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Current => "current",
            SuggestionStatus::Upcoming => "upcoming",
            SuggestionStatus::None => "none",
        }
    }
}

/// The batch the form should pre-select, and why.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub batch_id: String,
    pub status: SuggestionStatus,
}

impl Suggestion {
    pub fn new(batch_id: impl Into<String>, status: SuggestionStatus) -> Self {
        Self {
            batch_id: batch_id.into(),
            status,
        }
    }

    pub fn none() -> Self {
        Self::new("", SuggestionStatus::None)
    }
}

/// Suggests batches from a fixed timetable.
#[derive(Clone, Debug)]
pub struct SessionMatcher {
    windows: Vec<SessionWindow>,
    lookahead_minutes: u16,
    grace_minutes: u16,
}

impl Default for SessionMatcher {
    fn default() -> Self {
        Self::new(default_windows().to_vec())
    }
}

impl SessionMatcher {
    pub fn new(windows: Vec<SessionWindow>) -> Self {
        Self {
            windows,
            lookahead_minutes: UPCOMING_LOOKAHEAD_MINUTES,
            grace_minutes: GRACE_MINUTES,
        }
    }

    pub fn with_lookahead(mut self, minutes: u16) -> Self {
        self.lookahead_minutes = minutes;
        self
    }

    pub fn with_grace(mut self, minutes: u16) -> Self {
        self.grace_minutes = minutes;
        self
    }

    pub fn windows(&self) -> &[SessionWindow] {
        &self.windows
    }

    pub fn suggest(&self, now: WeekTime) -> Suggestion {
        suggest_with(now, &self.windows, self.lookahead_minutes, self.grace_minutes)
    }

    pub fn message(&self, suggestion: &Suggestion, now: WeekTime) -> String {
        suggestion_message(&suggestion.batch_id, suggestion.status, &self.windows, now)
    }
}

/// Suggest a batch using the default lookahead and grace thresholds.
pub fn suggest(now: WeekTime, windows: &[SessionWindow]) -> Suggestion {
    suggest_with(now, windows, UPCOMING_LOOKAHEAD_MINUTES, GRACE_MINUTES)
}

fn suggest_with(
    now: WeekTime,
    windows: &[SessionWindow],
    lookahead_minutes: u16,
    grace_minutes: u16,
) -> Suggestion {
    let minute = now.minutes();
    let day = now.weekday();
    let today = move || windows.iter().filter(move |w| w.meets_on(day));

    if let Some(window) = windows.iter().find(|w| w.contains(now)) {
        return Suggestion::new(&window.id, SuggestionStatus::Current);
    }

    // min_by_key keeps the first of equal keys, so ties go to declared order.
    let upcoming = today()
        .filter(|w| w.start_minutes > minute)
        .min_by_key(|w| w.start_minutes)
        .filter(|w| w.start_minutes - minute <= lookahead_minutes);
    if let Some(window) = upcoming {
        return Suggestion::new(&window.id, SuggestionStatus::Upcoming);
    }

    // A class that ended moments ago is still reported as current.
    let recently_ended = today()
        .filter(|w| w.end_minutes < minute && minute - w.end_minutes <= grace_minutes)
        .min_by_key(|w| Reverse(w.end_minutes));
    if let Some(window) = recently_ended {
        return Suggestion::new(&window.id, SuggestionStatus::Current);
    }

    Suggestion::none()
}

/// User-facing line shown under the batch picker.
pub fn suggestion_message(
    batch_id: &str,
    status: SuggestionStatus,
    windows: &[SessionWindow],
    now: WeekTime,
) -> String {
    if status == SuggestionStatus::None {
        return NO_SESSION_MESSAGE.to_string();
    }
    let Some(window) = find_window(batch_id, windows) else {
        return String::new();
    };
    if status == SuggestionStatus::Current {
        return IN_SESSION_MESSAGE.to_string();
    }

    let until = i32::from(window.start_minutes) - i32::from(now.minutes());
    if until <= 60 {
        format!("Class starts in {until} minutes")
    } else {
        format!("Class starts in {}h {}m", until / 60, until % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Weekday::{Fri, Mon, Sat, Sun, Thu, Tue, Wed};

    const WEEK: [Weekday; 7] = [Sun, Mon, Tue, Wed, Thu, Fri, Sat];

    fn at(day: Weekday, hour: u16, minute: u16) -> WeekTime {
        WeekTime::at(day, hour, minute).expect("valid time")
    }

    fn min(day: Weekday, minutes: u16) -> WeekTime {
        WeekTime::new(day, minutes).expect("valid minute")
    }

    #[test]
    fn tuesday_quarter_past_seven_is_women_in_session() {
        let s = suggest(at(Tue, 7, 15), default_windows());
        assert_eq!(s, Suggestion::new("women", SuggestionStatus::Current));
    }

    #[test]
    fn monday_half_past_six_suggests_upcoming_morning() {
        let s = suggest(at(Mon, 6, 30), default_windows());
        assert_eq!(s, Suggestion::new("morning", SuggestionStatus::Upcoming));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let windows = default_windows();
        assert_eq!(suggest(min(Mon, 420), windows).batch_id, "morning");
        assert_eq!(
            suggest(min(Mon, 510), windows),
            Suggestion::new("morning", SuggestionStatus::Current)
        );
    }

    #[test]
    fn inside_every_window_reports_first_declared_match() {
        let windows = default_windows();
        for day in WEEK {
            for window in windows.iter().filter(|w| w.meets_on(day)) {
                for m in window.start_minutes + 1..window.end_minutes {
                    let now = min(day, m);
                    let expected = windows.iter().find(|w| w.contains(now)).expect("match");
                    let s = suggest(now, windows);
                    assert_eq!(s.status, SuggestionStatus::Current, "{day} {m}");
                    assert_eq!(s.batch_id, expected.id, "{day} {m}");
                }
            }
        }
    }

    #[test]
    fn non_overlapping_windows_report_themselves() {
        let windows = default_windows();
        for (id, day) in [
            ("weekend", Sun),
            ("afternoon", Wed),
            ("evening", Thu),
            ("morning", Mon),
            ("women", Sat),
        ] {
            let window = find_window(id, windows).expect("window");
            for m in window.start_minutes + 1..window.end_minutes {
                assert_eq!(suggest(min(day, m), windows).batch_id, id);
            }
        }
    }

    #[test]
    fn up_to_two_hours_before_start_is_upcoming() {
        let windows = default_windows();
        for before in 1..=UPCOMING_LOOKAHEAD_MINUTES {
            // Wednesday afternoon: nothing else runs between 8:30 and 12:00.
            let s = suggest(min(Wed, 720 - before), windows);
            assert_eq!(s, Suggestion::new("afternoon", SuggestionStatus::Upcoming));
        }
        for before in 1..=UPCOMING_LOOKAHEAD_MINUTES {
            let s = suggest(min(Sun, 540 - before), windows);
            assert_eq!(s, Suggestion::new("weekend", SuggestionStatus::Upcoming));
        }
    }

    #[test]
    fn quiet_hours_report_none() {
        let windows = default_windows();
        for day in WEEK {
            for m in 0..MINUTES_PER_DAY {
                let today: Vec<&SessionWindow> =
                    windows.iter().filter(|w| w.meets_on(day)).collect();
                let inside = today
                    .iter()
                    .any(|w| (w.start_minutes..=w.end_minutes).contains(&m));
                let soon = today.iter().any(|w| {
                    w.start_minutes > m && w.start_minutes - m <= UPCOMING_LOOKAHEAD_MINUTES
                });
                let just_ended = today
                    .iter()
                    .any(|w| w.end_minutes < m && m - w.end_minutes <= GRACE_MINUTES);
                if inside || soon || just_ended {
                    continue;
                }
                assert_eq!(suggest(min(day, m), windows), Suggestion::none(), "{day} {m}");
            }
        }
    }

    #[test]
    fn recently_ended_class_counts_as_current() {
        let windows = default_windows();
        // Friday 13:45: afternoon ended at 13:30, evening is far away.
        assert_eq!(
            suggest(min(Fri, 825), windows),
            Suggestion::new("afternoon", SuggestionStatus::Current)
        );
        assert_eq!(
            suggest(min(Fri, 810 + GRACE_MINUTES), windows).batch_id,
            "afternoon"
        );
        assert_eq!(
            suggest(min(Fri, 810 + GRACE_MINUTES + 1), windows),
            Suggestion::none()
        );
    }

    #[test]
    fn upcoming_takes_precedence_over_grace_period() {
        let windows = vec![
            SessionWindow::new("early", "Early", 600, 660, &[Mon]),
            SessionWindow::new("late", "Late", 700, 760, &[Mon]),
        ];
        let s = suggest(min(Mon, 670), &windows);
        assert_eq!(s, Suggestion::new("late", SuggestionStatus::Upcoming));
    }

    #[test]
    fn most_recently_ended_wins_grace_ties_by_declared_order() {
        let windows = vec![
            SessionWindow::new("a", "A", 600, 660, &[Mon]),
            SessionWindow::new("b", "B", 610, 670, &[Mon]),
            SessionWindow::new("c", "C", 620, 670, &[Mon]),
        ];
        let s = suggest(min(Mon, 680), &windows);
        assert_eq!(s, Suggestion::new("b", SuggestionStatus::Current));
    }

    #[test]
    fn empty_timetable_suggests_nothing() {
        assert_eq!(suggest(at(Mon, 9, 0), &[]), Suggestion::none());
    }

    #[test]
    fn matcher_thresholds_are_configurable() {
        let matcher = SessionMatcher::default().with_lookahead(15).with_grace(0);
        assert_eq!(matcher.suggest(at(Mon, 6, 30)), Suggestion::none());
        assert_eq!(matcher.suggest(at(Mon, 6, 50)).batch_id, "morning");
        assert_eq!(matcher.suggest(min(Fri, 811)), Suggestion::none());
    }

    #[test]
    fn messages_follow_status() {
        let windows = default_windows();
        let now = at(Mon, 6, 30);
        assert_eq!(
            suggestion_message("", SuggestionStatus::None, windows, now),
            NO_SESSION_MESSAGE
        );
        assert_eq!(
            suggestion_message("morning", SuggestionStatus::Current, windows, now),
            "Class in session now!"
        );
        assert_eq!(
            suggestion_message("morning", SuggestionStatus::Upcoming, windows, now),
            "Class starts in 30 minutes"
        );
        assert_eq!(
            suggestion_message("morning", SuggestionStatus::Upcoming, windows, at(Mon, 6, 0)),
            "Class starts in 60 minutes"
        );
        assert_eq!(
            suggestion_message("morning", SuggestionStatus::Upcoming, windows, at(Mon, 5, 15)),
            "Class starts in 1h 45m"
        );
        assert_eq!(
            suggestion_message("kickboxing", SuggestionStatus::Current, windows, now),
            ""
        );
    }

    #[test]
    fn week_time_rejects_out_of_range_minutes() {
        assert!(WeekTime::new(Mon, 1439).is_some());
        assert!(WeekTime::new(Mon, 1440).is_none());
        assert!(WeekTime::at(Mon, 7, 60).is_none());
        assert_eq!(at(Sun, 0, 0).day_of_week(), 0);
        assert_eq!(at(Sat, 23, 59).day_of_week(), 6);
    }

    #[test]
    fn week_time_uses_wall_clock_of_the_zone() {
        let tz = chrono::FixedOffset::west_opt(5 * 3600).expect("offset");
        let dt = tz.with_ymd_and_hms(2024, 1, 2, 7, 15, 0).single().expect("dt");
        let now = WeekTime::from_datetime(&dt);
        assert_eq!(now.weekday(), Tue);
        assert_eq!(now.minutes(), 435);
    }

    #[test]
    fn picker_lists_batches_in_display_order() {
        let ids: Vec<&str> = batch_options(default_windows())
            .into_iter()
            .map(|w| w.id.as_str())
            .collect();
        assert_eq!(ids, ["morning", "afternoon", "evening", "women", "weekend"]);
        assert_eq!(
            batch_label("evening", default_windows()),
            Some("Evening (Mon-Fri, 6:30 PM - 8:00 PM)")
        );
    }
}
