use chrono::NaiveDate;
use serde::Deserialize;

/// Display format for every date in the report: "01 Jan 2024".
pub const DATE_FORMAT: &str = "%d %b %Y";

pub const NO_DIVIDEND_DATA: &str = "No dividend data available";
pub const INVALID_DIVIDEND_DATE: &str = "Invalid Dividend Date";
pub const LOOKUP_ERROR: &str = "Error";
pub const PLACEHOLDER: &str = "-";

// ── Input ─────────────────────────────────────────────────────────────────────

/// One (symbol, share count) pair that survived input filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingRow {
    pub symbol: String,
    pub share_count: i64,
}

/// Input table row before coercion. Cells are kept as text so CSV and
/// workbook inputs go through the same cleaning rules.
#[derive(Debug, Clone, Default)]
pub struct RawHoldingRow {
    pub symbol: Option<String>,
    pub share_count: Option<String>,
}

// ── Dividends ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub amount_per_share: Option<f64>,
}

/// Provider record before classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDividend {
    /// Unix seconds, UTC.
    pub date: i64,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Full dividend history of one symbol as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendHistory {
    /// Exchange offset from UTC in seconds; shifts timestamps to local dates.
    pub gmt_offset: i64,
    pub events: Vec<RawDividend>,
}

/// Classified result of a successful provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum DividendLookup {
    Found(DividendEvent),
    NoHistory,
    InvalidDate,
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DividendStatus {
    Paid(NaiveDate),
    NoData,
    InvalidDate,
    Error,
}

impl DividendStatus {
    pub fn label(&self) -> String {
        match self {
            DividendStatus::Paid(date) => date.format(DATE_FORMAT).to_string(),
            DividendStatus::NoData => NO_DIVIDEND_DATA.to_string(),
            DividendStatus::InvalidDate => INVALID_DIVIDEND_DATE.to_string(),
            DividendStatus::Error => LOOKUP_ERROR.to_string(),
        }
    }
}

/// One report line, produced per holding row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub symbol: String,
    pub status: DividendStatus,
    pub amount_per_share: Option<f64>,
    pub credit_date: Option<NaiveDate>,
    pub share_count: i64,
    pub total_amount: Option<f64>,
}

/// Rendered value of a single report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl OutputRecord {
    /// A record with no dividend figures, used by every non-success branch.
    pub fn without_dividend(symbol: &str, status: DividendStatus, share_count: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            status,
            amount_per_share: None,
            credit_date: None,
            share_count,
            total_amount: None,
        }
    }

    /// Cells in report column order.
    pub fn cells(&self) -> [Cell; 6] {
        let number_or_dash = |v: Option<f64>| match v {
            Some(n) => Cell::Number(n),
            None => Cell::Text(PLACEHOLDER.to_string()),
        };

        [
            Cell::Text(self.symbol.clone()),
            Cell::Text(self.status.label()),
            number_or_dash(self.amount_per_share),
            Cell::Text(
                self.credit_date
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ),
            Cell::Number(self.share_count as f64),
            number_or_dash(self.total_amount),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_for_paid_record() {
        let record = OutputRecord {
            symbol: "AAA".into(),
            status: DividendStatus::Paid(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            amount_per_share: Some(2.5),
            credit_date: NaiveDate::from_ymd_opt(2024, 2, 5),
            share_count: 10,
            total_amount: Some(25.0),
        };

        assert_eq!(
            record.cells(),
            [
                Cell::Text("AAA".into()),
                Cell::Text("01 Jan 2024".into()),
                Cell::Number(2.5),
                Cell::Text("05 Feb 2024".into()),
                Cell::Number(10.0),
                Cell::Number(25.0),
            ]
        );
    }

    #[test]
    fn test_cells_for_missing_dividend() {
        let record = OutputRecord::without_dividend("BBB", DividendStatus::NoData, 7);
        let cells = record.cells();
        assert_eq!(cells[1], Cell::Text(NO_DIVIDEND_DATA.into()));
        assert_eq!(cells[2], Cell::Text("-".into()));
        assert_eq!(cells[3], Cell::Text("-".into()));
        assert_eq!(cells[4], Cell::Number(7.0));
        assert_eq!(cells[5], Cell::Text("-".into()));
    }
}
