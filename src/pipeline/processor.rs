use crate::calendar::add_business_days;
use crate::models::{DividendLookup, DividendStatus, HoldingRow, OutputRecord};
use crate::provider::{lookup_latest, DividendSource};
use tracing::{debug, warn};

/// Turns one holding into one report line. Never fails: every lookup outcome
/// has a record shape, and the share count is always carried through.
pub struct RowProcessor<'a> {
    source: &'a dyn DividendSource,
    business_days: u32,
}

impl<'a> RowProcessor<'a> {
    pub fn new(source: &'a dyn DividendSource, business_days: u32) -> Self {
        Self {
            source,
            business_days,
        }
    }

    pub async fn process(&self, row: &HoldingRow) -> OutputRecord {
        let lookup = match lookup_latest(self.source, &row.symbol).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("{}: dividend lookup failed: {}", row.symbol, e);
                return OutputRecord::without_dividend(&row.symbol, DividendStatus::Error, row.share_count);
            }
        };

        match lookup {
            DividendLookup::NoHistory => {
                OutputRecord::without_dividend(&row.symbol, DividendStatus::NoData, row.share_count)
            }
            DividendLookup::InvalidDate => {
                OutputRecord::without_dividend(&row.symbol, DividendStatus::InvalidDate, row.share_count)
            }
            DividendLookup::Found(event) => {
                let credit_date = add_business_days(event.date, self.business_days);
                // a zero amount carries no payout, same as a missing one
                let total_amount = event
                    .amount_per_share
                    .filter(|a| *a != 0.0)
                    .map(|a| row.share_count as f64 * a);

                debug!(
                    "{}: paid {:?} on {}, credit {:?}",
                    row.symbol, event.amount_per_share, event.date, credit_date
                );

                OutputRecord {
                    symbol: row.symbol.clone(),
                    status: DividendStatus::Paid(event.date),
                    amount_per_share: event.amount_per_share,
                    credit_date,
                    share_count: row.share_count,
                    total_amount,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DividendHistory, RawDividend};
    use crate::provider::LookupError;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Answers by symbol: "EMPTY" has no history, "FAIL" errors, "BAD" has an
    /// unmappable timestamp; everything else paid 2.5 on 2024-01-01.
    struct ScriptedSource;

    #[async_trait]
    impl DividendSource for ScriptedSource {
        async fn dividend_history(&self, symbol: &str) -> Result<DividendHistory, LookupError> {
            let event = |date, amount| DividendHistory {
                gmt_offset: 0,
                events: vec![RawDividend { date, amount }],
            };
            match symbol {
                "EMPTY" => Ok(DividendHistory::default()),
                "FAIL" => Err(LookupError::Provider {
                    code: "Not Found".into(),
                    description: "delisted".into(),
                }),
                "BAD" => Ok(event(i64::MAX, Some(1.0))),
                "ZERO" => Ok(event(1704067200, Some(0.0))),
                "NOAMT" => Ok(event(1704067200, None)),
                _ => Ok(event(1704067200, Some(2.5))),
            }
        }
    }

    fn holding(symbol: &str, share_count: i64) -> HoldingRow {
        HoldingRow {
            symbol: symbol.into(),
            share_count,
        }
    }

    async fn process(symbol: &str, shares: i64) -> OutputRecord {
        RowProcessor::new(&ScriptedSource, 25).process(&holding(symbol, shares)).await
    }

    #[tokio::test]
    async fn test_success_branch() {
        let record = process("AAA", 10).await;
        assert_eq!(record.status, DividendStatus::Paid(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(record.status.label(), "01 Jan 2024");
        assert_eq!(record.amount_per_share, Some(2.5));
        assert_eq!(record.credit_date, NaiveDate::from_ymd_opt(2024, 2, 5));
        assert_eq!(record.share_count, 10);
        assert_eq!(record.total_amount, Some(25.0));
    }

    #[tokio::test]
    async fn test_failure_branches_keep_share_count() {
        for (symbol, status) in [
            ("EMPTY", DividendStatus::NoData),
            ("BAD", DividendStatus::InvalidDate),
            ("FAIL", DividendStatus::Error),
        ] {
            let record = process(symbol, 7).await;
            assert_eq!(record, OutputRecord::without_dividend(symbol, status, 7));
        }
    }

    #[tokio::test]
    async fn test_zero_or_missing_amount_has_no_total() {
        let zero = process("ZERO", 10).await;
        assert_eq!(zero.amount_per_share, Some(0.0));
        assert_eq!(zero.total_amount, None);
        assert!(zero.credit_date.is_some());

        let missing = process("NOAMT", 10).await;
        assert_eq!(missing.amount_per_share, None);
        assert_eq!(missing.total_amount, None);
    }

    #[tokio::test]
    async fn test_business_days_parameter() {
        let record = RowProcessor::new(&ScriptedSource, 0).process(&holding("AAA", 1)).await;
        assert_eq!(record.credit_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }
}
