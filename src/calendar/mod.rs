//! Business-day arithmetic for projecting dividend credit dates.
//!
//! A business day is Monday through Friday. There is no holiday calendar.

use crate::models::{DATE_FORMAT, PLACEHOLDER};
use chrono::{Datelike, NaiveDate, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Walk forward one calendar day at a time until `n` weekdays have been
/// counted. The start date itself is never counted, so `n == 0` returns it
/// unchanged. `None` only if the walk runs off the end of the calendar.
pub fn add_business_days(start: NaiveDate, n: u32) -> Option<NaiveDate> {
    let mut current = start;
    let mut counted = 0;

    while counted < n {
        current = current.succ_opt()?;
        if is_business_day(current) {
            counted += 1;
        }
    }

    Some(current)
}

pub fn parse_report_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Text-in, text-out variant used where dates travel as report strings.
/// Returns "-" when `date` is not a "DD Mon YYYY" date.
pub fn likely_credit_date(date: &str, n: u32) -> String {
    parse_report_date(date)
        .and_then(|d| add_business_days(d, n))
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}
