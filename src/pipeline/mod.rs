//! Job orchestrator: ties input table → dividend lookups → report together.
//!
//! ## Run
//!
//! `JobRunner::run()`:
//!   1. Reset progress to 0 and mark the job running
//!   2. Process each holding in input order, one lookup at a time; progress
//!      after row `i` of `k` is `(i + 1) / k * 100`
//!   3. Set progress to 100 and write the report
//!   Lookup failures stay inside their row. Only report failures fail the job.

pub mod processor;

use crate::jobs::{JobHandle, JobState, ProgressSink};
use crate::loader::InputError;
use crate::models::{DividendStatus, HoldingRow, OutputRecord};
use crate::provider::DividendSource;
use crate::report::{ReportBuilder, ReportError};
use crate::utils::Timer;
use chrono::Local;
use thiserror::Error;
use tracing::{error, info};

pub use self::processor::RowProcessor;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

pub struct JobRunner<'a> {
    processor: RowProcessor<'a>,
    report: &'a ReportBuilder,
}

impl<'a> JobRunner<'a> {
    pub fn new(source: &'a dyn DividendSource, report: &'a ReportBuilder, business_days: u32) -> Self {
        Self {
            processor: RowProcessor::new(source, business_days),
            report,
        }
    }

    /// Resolve every row, reporting progress to `sink`. Output order is input order.
    pub async fn process_rows(&self, rows: &[HoldingRow], sink: &dyn ProgressSink) -> Vec<OutputRecord> {
        sink.set_progress(0.0);

        let total = rows.len();
        let mut records = Vec::with_capacity(total);
        let mut errors = 0usize;

        for (idx, row) in rows.iter().enumerate() {
            let record = self.processor.process(row).await;
            if record.status == DividendStatus::Error {
                errors += 1;
            }
            records.push(record);
            sink.set_progress((idx + 1) as f64 / total as f64 * 100.0);
        }

        sink.set_progress(100.0);
        info!("{} rows processed, {} lookup errors", total, errors);
        records
    }

    /// Full job: process, then build the report with today's date.
    pub async fn run(&self, rows: &[HoldingRow], handle: &JobHandle) -> Result<Vec<u8>, JobError> {
        let mut timer = Timer::start(format!("job {} ({} holdings)", handle.id(), rows.len()));
        handle.set_state(JobState::Running);

        let records = self.process_rows(rows, handle).await;
        timer.note(outcome_summary(&records));

        let today = Local::now().date_naive();
        match self.report.build(&records, today) {
            Ok(bytes) => {
                handle.set_state(JobState::Done);
                Ok(bytes)
            }
            Err(e) => {
                error!("job {}: {}", handle.id(), e);
                timer.note(format!("{}, report failed", outcome_summary(&records)));
                handle.set_state(JobState::Failed);
                Err(e.into())
            }
        }
    }
}

fn outcome_summary(records: &[OutputRecord]) -> String {
    let errors = records
        .iter()
        .filter(|r| r.status == DividendStatus::Error)
        .count();
    format!("{} rows, {} lookup errors", records.len(), errors)
}
