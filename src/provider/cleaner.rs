use crate::models::{DividendEvent, DividendHistory, DividendLookup};
use chrono::{DateTime, NaiveDate};
use tracing::warn;

/// Map a provider timestamp to the calendar date on the exchange's clock.
pub fn local_date(timestamp: i64, gmt_offset: i64) -> Option<NaiveDate> {
    let shifted = timestamp.checked_add(gmt_offset)?;
    DateTime::from_timestamp(shifted, 0).map(|dt| dt.date_naive())
}

/// Reduce a full history to its most recent event.
pub fn latest_dividend(symbol: &str, history: &DividendHistory) -> DividendLookup {
    let Some(latest) = history.events.iter().max_by_key(|d| d.date) else {
        return DividendLookup::NoHistory;
    };

    let Some(date) = local_date(latest.date, history.gmt_offset) else {
        warn!("{}: unusable dividend timestamp {}", symbol, latest.date);
        return DividendLookup::InvalidDate;
    };

    let amount_per_share = latest.amount.filter(|a| a.is_finite());

    DividendLookup::Found(DividendEvent {
        date,
        amount_per_share,
    })
}
