//! Holdings table loader.
//!
//! Accepts either a workbook (xlsx/xlsm/xls/ods, first sheet) or a CSV file.
//! The first row is the header and must carry `Stock Name` and
//! `Number of Stocks`; other columns are ignored.

use crate::models::{HoldingRow, RawHoldingRow};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const SYMBOL_COLUMN: &str = "Stock Name";
pub const SHARES_COLUMN: &str = "Number of Stocks";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("No selected file")]
    EmptyFile,

    #[error("could not read input table: {0}")]
    Unreadable(String),

    #[error("input table has no sheets")]
    NoSheet,

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Workbook,
    Csv,
}

impl TableFormat {
    /// Pick a reader from the file name, falling back to sniffing the bytes.
    pub fn detect(file_name: Option<&str>, bytes: &[u8]) -> Self {
        let ext = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") | Some("txt") => TableFormat::Csv,
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => TableFormat::Workbook,
            _ if is_workbook_magic(bytes) => TableFormat::Workbook,
            _ => TableFormat::Csv,
        }
    }
}

fn is_workbook_magic(bytes: &[u8]) -> bool {
    // zip container (xlsx/ods) or OLE compound file (xls)
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse raw bytes into filtered holding rows, in input order.
pub fn load_holdings(file_name: Option<&str>, bytes: &[u8]) -> Result<Vec<HoldingRow>, InputError> {
    if bytes.is_empty() {
        return Err(InputError::EmptyFile);
    }

    let format = TableFormat::detect(file_name, bytes);
    debug!("Reading {:?} as {:?}", file_name, format);

    let raw = match format {
        TableFormat::Workbook => read_workbook(bytes)?,
        TableFormat::Csv => read_csv(bytes)?,
    };

    let total = raw.len();
    let rows = clean_holding_rows(raw);
    info!("Input table: {} rows, {} usable holdings", total, rows.len());
    Ok(rows)
}

pub fn load_holdings_file(path: &Path) -> Result<Vec<HoldingRow>, InputError> {
    let bytes = std::fs::read(path).map_err(|e| InputError::Unreadable(e.to_string()))?;
    load_holdings(path.file_name().and_then(|n| n.to_str()), &bytes)
}

/// Column positions of the two required headers.
fn locate_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<(usize, usize), InputError> {
    let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
    let find = |name: &'static str| {
        headers
            .iter()
            .position(|h| *h == name)
            .ok_or(InputError::MissingColumn(name))
    };
    Ok((find(SYMBOL_COLUMN)?, find(SHARES_COLUMN)?))
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<RawHoldingRow>, InputError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| InputError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(InputError::NoSheet)?
        .map_err(|e| InputError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(InputError::MissingColumn(SYMBOL_COLUMN))?
        .iter()
        .map(cell_text)
        .map(Option::unwrap_or_default)
        .collect();
    let (sym_idx, qty_idx) = locate_columns(header.iter().map(String::as_str))?;

    Ok(rows
        .map(|row| RawHoldingRow {
            symbol: row.get(sym_idx).and_then(cell_text),
            share_count: row.get(qty_idx).and_then(cell_text),
        })
        .collect())
}

/// Text form of a workbook cell; `None` for blanks and error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        other => Some(other.to_string()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Vec<RawHoldingRow>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| InputError::Unreadable(e.to_string()))?
        .clone();
    let (sym_idx, qty_idx) = locate_columns(headers.iter())?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| InputError::Unreadable(e.to_string()))?;
        rows.push(RawHoldingRow {
            symbol: record.get(sym_idx).map(|s| s.to_string()),
            share_count: record.get(qty_idx).map(|s| s.to_string()),
        });
    }
    Ok(rows)
}

// ── Cleaning ──────────────────────────────────────────────────────────────────

/// Coerce a share count. Unparseable text counts as 0; fractions truncate.
/// Returns `None` only when the cell is blank.
pub fn parse_share_count(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = s.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n.trunc() as i64),
        _ => Some(0),
    }
}

pub fn raw_row_to_holding(row: &RawHoldingRow) -> Option<HoldingRow> {
    let symbol = row.symbol.as_deref()?.trim();
    if symbol.is_empty() {
        return None;
    }

    let share_count = parse_share_count(row.share_count.as_deref()?)?;
    if share_count <= 0 {
        debug!("Skipping {}: non-positive share count {}", symbol, share_count);
        return None;
    }

    Some(HoldingRow {
        symbol: symbol.to_string(),
        share_count,
    })
}

pub fn clean_holding_rows(rows: Vec<RawHoldingRow>) -> Vec<HoldingRow> {
    rows.iter().filter_map(raw_row_to_holding).collect()
}
