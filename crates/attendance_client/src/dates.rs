//! Calendar-day normalization and display.
//!
//! Dates travel through the system as canonical `YYYY-MM-DD` strings. Every
//! function here is total: input that cannot be understood is handed back
//! unchanged so a bad date never blocks rendering the rest of a record.
//!
//! Conversions that depend on a time zone come in two flavours: a plain
//! version using the machine's local zone and an `_in` version taking the
//! zone explicitly.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("static regex"));

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2})/([0-9]{1,2})/([0-9]{4})$").expect("static regex")
});

/// Wall-clock date-times without an offset, read as local time.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-only spellings. `%B`/`%A` also accept abbreviated names.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%A, %B %d, %Y",
    "%A %B %d %Y",
];

/// True if `s` has the exact `YYYY-MM-DD` shape. Field ranges are not checked.
pub fn is_canonical(s: &str) -> bool {
    CANONICAL.is_match(s)
}

/// Today's calendar day in the local zone.
pub fn today_iso() -> String {
    canonical(Local::now().date_naive())
}

pub fn today_iso_in<Tz: TimeZone>(tz: &Tz) -> String {
    canonical(Utc::now().with_timezone(tz).date_naive())
}

/// Normalize a date string to `YYYY-MM-DD` using the local zone.
pub fn normalize_date(input: &str) -> String {
    normalize_date_in(input, &Local)
}

/// Normalize a date string to `YYYY-MM-DD`.
///
/// - empty input stays empty
/// - canonical input is returned as is
/// - `D/M/YYYY` is read day-first and zero-padded, without range checks
/// - anything else goes through the generic parser; timestamps are reduced
///   to their calendar day in `tz`
/// - unparseable input is returned verbatim
pub fn normalize_date_in<Tz: TimeZone>(input: &str, tz: &Tz) -> String {
    if input.is_empty() {
        return String::new();
    }
    if is_canonical(input) {
        return input.to_string();
    }
    if let Some(caps) = DAY_FIRST.captures(input) {
        return format!("{}-{:0>2}-{:0>2}", &caps[3], &caps[2], &caps[1]);
    }
    match parse_calendar_day(input, tz) {
        Some(day) => canonical(day),
        None => input.to_string(),
    }
}

fn canonical(day: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", day.year(), day.month(), day.day())
}

/// Generic parse of a free-form date into a calendar day in `tz`.
fn parse_calendar_day<Tz: TimeZone>(input: &str, tz: &Tz) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(tz).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(tz).date_naive());
    }
    if let Some(ndt) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(ndt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Build a day from year/month/day fields, carrying overflow the way a
/// calendar constructor does: month 13 is January of the next year and
/// day 0 is the last day of the previous month.
fn carry_calendar(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let months = year.checked_mul(12)?.checked_add(month - 1)?;
    let y = i32::try_from(months.div_euclid(12)).ok()?;
    let m = u32::try_from(months.rem_euclid(12) + 1).ok()?;
    let first = NaiveDate::from_ymd_opt(y, m, 1)?;
    first.checked_add_signed(TimeDelta::try_days(day - 1)?)
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Short,
    Long,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NumericStyle {
    Numeric,
    #[serde(rename = "2-digit")]
    TwoDigit,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonthStyle {
    Numeric,
    #[serde(rename = "2-digit")]
    TwoDigit,
    Short,
    Long,
}

/// Which date fields to render, and how. Rendering is always en-US.
///
/// Fields left out are not rendered; [`Default`] applies only when no
/// options are given at all.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayOptions {
    pub weekday: Option<TextStyle>,
    pub month: Option<MonthStyle>,
    pub day: Option<NumericStyle>,
    pub year: Option<NumericStyle>,
}

impl Default for DisplayOptions {
    /// `Mon, Jan 1`
    fn default() -> Self {
        Self {
            weekday: Some(TextStyle::Short),
            month: Some(MonthStyle::Short),
            day: Some(NumericStyle::Numeric),
            year: None,
        }
    }
}

impl DisplayOptions {
    /// `Monday, January 1, 2024`
    pub fn long() -> Self {
        Self {
            weekday: Some(TextStyle::Long),
            month: Some(MonthStyle::Long),
            day: Some(NumericStyle::Numeric),
            year: Some(NumericStyle::Numeric),
        }
    }

    /// `1/1/2024`
    pub fn numeric() -> Self {
        Self {
            weekday: None,
            month: Some(MonthStyle::Numeric),
            day: Some(NumericStyle::Numeric),
            year: Some(NumericStyle::Numeric),
        }
    }

    fn is_empty(&self) -> bool {
        self.weekday.is_none() && self.month.is_none() && self.day.is_none() && self.year.is_none()
    }
}

/// Format a date for display using the local zone for non-canonical input.
pub fn format_for_display(input: &str, options: &DisplayOptions) -> String {
    format_for_display_in(input, options, &Local)
}

/// Format a date for display.
///
/// Canonical input is assembled from its numeric fields and never goes
/// through a zone-aware parse, so the rendered day is the same everywhere.
/// Other input falls back to the generic parser in `tz`; if that fails too
/// the input is returned unchanged.
pub fn format_for_display_in<Tz: TimeZone>(
    input: &str,
    options: &DisplayOptions,
    tz: &Tz,
) -> String {
    if input.is_empty() {
        return String::new();
    }
    let day = match CANONICAL.captures(input) {
        Some(caps) => {
            let field = |i: usize| caps[i].parse::<i64>().ok();
            field(1)
                .zip(field(2))
                .zip(field(3))
                .and_then(|((y, m), d)| carry_calendar(y, m, d))
        }
        None => parse_calendar_day(input, tz),
    };
    match day {
        Some(day) => render(day, options),
        None => input.to_string(),
    }
}

fn render(date: NaiveDate, options: &DisplayOptions) -> String {
    let options = if options.is_empty() {
        DisplayOptions::numeric()
    } else {
        *options
    };

    let numeric = |style: NumericStyle, value: u32| match style {
        NumericStyle::Numeric => value.to_string(),
        NumericStyle::TwoDigit => format!("{value:02}"),
    };
    let weekday = options.weekday.map(|style| match style {
        TextStyle::Short => date.format("%a").to_string(),
        TextStyle::Long => date.format("%A").to_string(),
    });
    let day = options.day.map(|style| numeric(style, date.day()));
    let year = options.year.map(|style| match style {
        NumericStyle::Numeric => date.year().to_string(),
        NumericStyle::TwoDigit => format!("{:02}", date.year().rem_euclid(100)),
    });

    let body = match options.month {
        Some(MonthStyle::Short) | Some(MonthStyle::Long) => {
            let mut out = if options.month == Some(MonthStyle::Short) {
                date.format("%b").to_string()
            } else {
                date.format("%B").to_string()
            };
            if let Some(day) = &day {
                out.push(' ');
                out.push_str(day);
            }
            if let Some(year) = &year {
                if day.is_some() {
                    out.push(',');
                }
                out.push(' ');
                out.push_str(year);
            }
            out
        }
        numeric_month => {
            let month = numeric_month.map(|style| match style {
                MonthStyle::TwoDigit => format!("{:02}", date.month()),
                _ => date.month().to_string(),
            });
            [month, day, year]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("/")
        }
    };

    match weekday {
        Some(weekday) if body.is_empty() => weekday,
        Some(weekday) => format!("{weekday}, {body}"),
        None => body,
    }
}
