//! Dividend report writer.
//!
//! ```text
//! Sheet: Dividend Tracker
//! | Stock Name | Dividend Date | Dividend Amount | Likely Credit Date | Number of Stocks | Total Dividend Amount |
//! |------------|---------------|-----------------|--------------------|------------------|-----------------------|
//! | ITC.NS     | 10 Jun 2024   | 7.5             | 15 Jul 2024        | 100              | 750                   |
//! ```
//!
//! The credit-date cell is filled when that date is still ahead of `today`.

use crate::config::ReportConfig;
use crate::models::{Cell, OutputRecord};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatPattern, Workbook, Worksheet, XlsxError};
use thiserror::Error;

const CREDIT_DATE_COLUMN: u16 = 3;
const COLUMN_WIDTHS: [f64; 6] = [18.0, 26.0, 18.0, 20.0, 18.0, 24.0];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    pub sheet_name: String,
    pub highlight_color: u32,
    pub currency: Option<String>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

struct ReportFormats {
    header: Format,
    text: Format,
    number: Format,
    highlight: Format,
}

impl ReportBuilder {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
            highlight_color: config.highlight_color,
            currency: config.currency.clone(),
        }
    }

    pub fn headers(&self) -> [String; 6] {
        let amount = |label: &str| match &self.currency {
            Some(c) => format!("{} ({})", label, c),
            None => label.to_string(),
        };
        [
            "Stock Name".to_string(),
            "Dividend Date".to_string(),
            amount("Dividend Amount"),
            "Likely Credit Date".to_string(),
            "Number of Stocks".to_string(),
            amount("Total Dividend Amount"),
        ]
    }

    /// Render the workbook to xlsx bytes.
    pub fn build(&self, records: &[OutputRecord], today: NaiveDate) -> Result<Vec<u8>, ReportError> {
        let mut workbook = Workbook::new();
        let formats = self.create_formats();

        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;
        self.write_header(sheet, &formats)?;

        for (i, record) in records.iter().enumerate() {
            let row = i as u32 + 1;
            let highlight = is_highlighted(record, today);

            for (col, cell) in record.cells().iter().enumerate() {
                let col = col as u16;
                let format = if highlight && col == CREDIT_DATE_COLUMN {
                    &formats.highlight
                } else {
                    match cell {
                        Cell::Text(_) => &formats.text,
                        Cell::Number(_) => &formats.number,
                    }
                };
                match cell {
                    Cell::Text(s) => sheet.write_string_with_format(row, col, s, format)?,
                    Cell::Number(n) => sheet.write_number_with_format(row, col, *n, format)?,
                };
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn write_header(&self, sheet: &mut Worksheet, formats: &ReportFormats) -> Result<(), XlsxError> {
        for (col, label) in self.headers().iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, label, &formats.header)?;
        }
        for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
            sheet.set_column_width(col as u16, *width)?;
        }
        sheet.set_freeze_panes(1, 0)?;
        Ok(())
    }

    fn create_formats(&self) -> ReportFormats {
        ReportFormats {
            header: Format::new().set_bold(),
            text: Format::new(),
            number: Format::new().set_num_format("General"),
            highlight: Format::new()
                .set_pattern(FormatPattern::Solid)
                .set_background_color(self.highlight_color),
        }
    }
}

/// A credit date strictly after `today` is still pending.
pub fn is_highlighted(record: &OutputRecord, today: NaiveDate) -> bool {
    record.credit_date.is_some_and(|d| d > today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DividendStatus;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paid(symbol: &str, credit: NaiveDate) -> OutputRecord {
        OutputRecord {
            symbol: symbol.into(),
            status: DividendStatus::Paid(ymd(2024, 1, 1)),
            amount_per_share: Some(1.0),
            credit_date: Some(credit),
            share_count: 1,
            total_amount: Some(1.0),
        }
    }

    #[test]
    fn test_highlight_only_strictly_future() {
        let today = ymd(2024, 2, 5);
        assert!(is_highlighted(&paid("A", ymd(2024, 2, 6)), today));
        assert!(!is_highlighted(&paid("A", today), today));
        assert!(!is_highlighted(&paid("A", ymd(2024, 2, 4)), today));
        assert!(!is_highlighted(
            &OutputRecord::without_dividend("B", DividendStatus::Error, 3),
            today
        ));
    }

    #[test]
    fn test_headers_with_currency() {
        let builder = ReportBuilder {
            currency: Some("INR".into()),
            ..ReportBuilder::default()
        };
        let headers = builder.headers();
        assert_eq!(headers[2], "Dividend Amount (INR)");
        assert_eq!(headers[5], "Total Dividend Amount (INR)");
        assert_eq!(ReportBuilder::default().headers()[3], "Likely Credit Date");
    }

    #[test]
    fn test_build_produces_xlsx_that_reads_back() {
        use calamine::{open_workbook_auto_from_rs, Data, Reader};

        let records = vec![
            paid("AAA", ymd(2024, 2, 5)),
            OutputRecord::without_dividend("BBB", DividendStatus::NoData, 4),
        ];
        let bytes = ReportBuilder::default().build(&records, ymd(2024, 1, 1)).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let mut wb = open_workbook_auto_from_rs(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Dividend Tracker".to_string()]);
        let range = wb.worksheet_range("Dividend Tracker").unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Data::String("Stock Name".into()));
        assert_eq!(rows[1][3], Data::String("05 Feb 2024".into()));
        assert_eq!(rows[2][1], Data::String("No dividend data available".into()));
        assert_eq!(rows[2][4], Data::Float(4.0));
        assert_eq!(rows[2][5], Data::String("-".into()));
    }

    fn zip_entry(bytes: &[u8], name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        let key = format!(" {name}=\"");
        let start = tag.find(&key)? + key.len();
        let len = tag[start..].find('"')?;
        Some(&tag[start..start + len])
    }

    fn section<'a>(xml: &'a str, open: &str, close: &str) -> &'a str {
        let start = xml.find(open).unwrap();
        let end = start + xml[start..].find(close).unwrap();
        &xml[start..end]
    }

    /// The `<fill>` element applied to `cell` (e.g. "D2"), via its xf style.
    fn cell_fill(sheet: &str, styles: &str, cell: &str) -> String {
        let style: usize = sheet
            .find(&format!("<c r=\"{cell}\""))
            .map(|at| &sheet[at..at + sheet[at..].find('>').unwrap()])
            .and_then(|tag| attr(tag, "s"))
            .map(|s| s.parse().unwrap())
            .unwrap_or(0);

        let xfs = section(styles, "<cellXfs", "</cellXfs>");
        let xf = xfs.split("<xf ").nth(style + 1).unwrap();
        let xf_tag = format!(" {}", &xf[..xf.find('>').unwrap()]);
        let fill_id: usize = attr(&xf_tag, "fillId").unwrap_or("0").parse().unwrap();

        let fills = section(styles, "<fills", "</fills>");
        fills.split("<fill>").nth(fill_id + 1).unwrap().to_string()
    }

    #[test]
    fn test_fill_lands_on_future_credit_date_cell_only() {
        let today = ymd(2024, 1, 15);
        let records = vec![
            paid("SOON", ymd(2024, 2, 5)),
            paid("PAST", ymd(2024, 1, 10)),
            OutputRecord::without_dividend("NONE", DividendStatus::NoData, 2),
        ];
        let bytes = ReportBuilder::default().build(&records, today).unwrap();

        let sheet = zip_entry(&bytes, "xl/worksheets/sheet1.xml");
        let styles = zip_entry(&bytes, "xl/styles.xml");

        let highlighted = cell_fill(&sheet, &styles, "D2");
        assert!(highlighted.contains("solid"), "{highlighted}");
        assert!(highlighted.to_uppercase().contains("FFFF00"), "{highlighted}");

        for cell in ["A2", "B2", "C2", "E2", "F2", "D1", "D3", "D4"] {
            let fill = cell_fill(&sheet, &styles, cell);
            assert!(!fill.to_uppercase().contains("FFFF00"), "{cell} is filled: {fill}");
        }
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let bytes = ReportBuilder::default().build(&[], ymd(2024, 1, 1)).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_invalid_sheet_name_is_error() {
        let builder = ReportBuilder {
            sheet_name: "bad[name]".into(),
            ..ReportBuilder::default()
        };
        assert!(builder.build(&[], ymd(2024, 1, 1)).is_err());
    }
}
