//! Aggregated outcome of a batch run.

use std::fmt;

use crate::driver::ItemOutcome;

/// Counts and failures across every item of a run.
///
/// Skipped items count toward `completed()` but are also reported on their
/// own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Titles of failed items, in processing order.
    pub failed_titles: Vec<String>,
    /// A stop request ended the run before every item was processed.
    pub stopped: bool,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, title: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Success => self.succeeded += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed(_) => {
                self.failed += 1;
                self.failed_titles.push(title.to_string());
            }
            ItemOutcome::Stopped => self.stopped = true,
        }
    }

    /// Items that reached a finished state, including skipped ones.
    pub fn completed(&self) -> usize {
        self.succeeded + self.skipped
    }

    /// Items with no final outcome; the interrupted item counts here.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed() + self.failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.stopped
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}/{} books done, {} failed, {} skipped",
            self.completed(),
            self.total,
            self.failed,
            self.skipped
        )?;
        if !self.failed_titles.is_empty() {
            writeln!(f, "Failed books:")?;
            for title in &self.failed_titles {
                writeln!(f, "  - {title}")?;
            }
        }
        if self.stopped {
            writeln!(
                f,
                "Stopped early. {} book(s) were not processed.",
                self.remaining()
            )?;
        }
        Ok(())
    }
}
