//! Dates encoded in periodic note titles.
//!
//! Periodic notes are titled by the period they cover (`2024-02-08`,
//! `2024-W06`, `2024-Q1`, `2024-02`, `2024`). View options need the span
//! of that period in days.

use chrono::{Datelike, NaiveDate, Weekday};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Root class of all periodic notes.
pub const PERIODIC_FAMILY: &str = "periodic";

/// No period: the view lists without date bounds.
pub const NO_PERIOD: i64 = -1;

// e.g. `2024-02-08-journal`
static DATE_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})").ok());

static WEEKLY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-W([0-9]{1,2})$").ok());

static QUARTERLY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-Q([1-4])$").ok());

static MONTHLY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{1,2})$").ok());

static YEARLY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^([0-9]{4})$").ok());

/// First day of the period a note title names, if it names one.
///
/// Weeks are ISO weeks starting on Monday.
pub fn parse_title_date(title: &str) -> Option<NaiveDate> {
    let title = title.trim();

    if let Some(caps) = captures(&DATE_PREFIX, title) {
        return NaiveDate::from_ymd_opt(number(&caps, 1)?, number(&caps, 2)?, number(&caps, 3)?);
    }
    if let Some(caps) = captures(&WEEKLY, title) {
        return NaiveDate::from_isoywd_opt(number(&caps, 1)?, number(&caps, 2)?, Weekday::Mon);
    }
    if let Some(caps) = captures(&QUARTERLY, title) {
        let quarter: u32 = number(&caps, 2)?;
        return NaiveDate::from_ymd_opt(number(&caps, 1)?, (quarter - 1) * 3 + 1, 1);
    }
    if let Some(caps) = captures(&MONTHLY, title) {
        return NaiveDate::from_ymd_opt(number(&caps, 1)?, number(&caps, 2)?, 1);
    }
    if let Some(caps) = captures(&YEARLY, title) {
        return NaiveDate::from_ymd_opt(number(&caps, 1)?, 1, 1);
    }
    None
}

fn captures<'t>(pattern: &Option<Regex>, title: &'t str) -> Option<regex_lite::Captures<'t>> {
    pattern.as_ref()?.captures(title)
}

fn number<T: std::str::FromStr>(caps: &regex_lite::Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

pub fn days_in_month(date: NaiveDate) -> i64 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| i64::from(last.day()))
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Days covered by a periodic class, given one of its note titles.
///
/// `today` stands in for titles that carry no date.
pub fn view_period(type_name: &str, title: &str, today: NaiveDate) -> i64 {
    let date = parse_title_date(title).unwrap_or(today);
    match type_name {
        PERIODIC_FAMILY | "daily" => 0,
        "weekly" => 7,
        "monthly" => days_in_month(date),
        "quarterly" => 90,
        "yearly" => {
            if is_leap_year(date.year()) {
                366
            } else {
                365
            }
        }
        _ => NO_PERIOD,
    }
}
