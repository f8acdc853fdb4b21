use super::LookupError;
use crate::models::{DividendHistory, RawDividend};
use serde::Deserialize;
use std::collections::HashMap;

// ── Yahoo chart payload ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    // keyed by timestamp string; order is not guaranteed
    #[serde(default)]
    dividends: HashMap<String, RawDividend>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

/// Decode a chart response body into the symbol's dividend history.
///
/// A provider-reported error (unknown symbol, bad range, ...) becomes
/// `LookupError::Provider`; a result without an `events` block is simply a
/// symbol that never paid.
pub fn parse_chart_dividends(body: &str) -> Result<DividendHistory, LookupError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    if let Some(err) = envelope.chart.error {
        return Err(LookupError::Provider {
            code: err.code,
            description: err.description,
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(LookupError::Decode("chart response has no result".to_string()));
    };

    let gmt_offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let mut events: Vec<RawDividend> = result
        .events
        .map(|e| e.dividends.into_values().collect())
        .unwrap_or_default();
    events.sort_by_key(|d| d.date);

    Ok(DividendHistory { gmt_offset, events })
}
