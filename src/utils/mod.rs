use std::time::Instant;
use tracing::info;

/// Logs how long a job took when dropped, with whatever outcome was noted.
pub struct Timer {
    label: String,
    outcome: Option<String>,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            outcome: None,
            start: Instant::now(),
        }
    }

    /// Attach a result summary (e.g. row and error counts) to the finish line.
    pub fn note(&mut self, outcome: impl Into<String>) {
        self.outcome = Some(outcome.into());
    }

    fn finish_line(&self) -> String {
        match &self.outcome {
            Some(outcome) => format!("{}: {}", self.label, outcome),
            None => self.label.clone(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.finish_line(),
            self.start.elapsed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_line_carries_outcome() {
        let mut timer = Timer::start("job 3 (4 holdings)");
        assert_eq!(timer.finish_line(), "job 3 (4 holdings)");

        timer.note("4 rows, 1 lookup error");
        assert_eq!(timer.finish_line(), "job 3 (4 holdings): 4 rows, 1 lookup error");

        timer.note("report failed");
        assert_eq!(timer.finish_line(), "job 3 (4 holdings): report failed");
    }
}
