use std::collections::BTreeSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConversionError, Result};
use crate::processors::ConversionReport;

/// What to do when a row cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first bad row
    #[default]
    Abort,
    /// Log the bad row and carry on
    Skip,
}

/// Per-row decisions: the declared skip list and the error policy.
#[derive(Debug, Clone, Default)]
pub struct RowPolicy {
    on_error: ErrorPolicy,
    skip_lines: BTreeSet<u64>,
}

impl RowPolicy {
    pub fn new(on_error: ErrorPolicy) -> Self {
        Self {
            on_error,
            skip_lines: BTreeSet::new(),
        }
    }

    pub fn with_skip_lines(mut self, lines: impl IntoIterator<Item = u64>) -> Self {
        self.skip_lines.extend(lines);
        self
    }

    pub fn on_error(&self) -> ErrorPolicy {
        self.on_error
    }

    pub fn skip_lines(&self) -> &BTreeSet<u64> {
        &self.skip_lines
    }

    /// True for lines on the declared skip list.
    pub fn should_skip(&self, line: u64) -> bool {
        let skip = self.skip_lines.contains(&line);
        if skip {
            info!("Skipping line {}", line);
        }
        skip
    }

    /// Decide whether a failed row ends the run.
    ///
    /// Row errors are tallied either way. Under [`ErrorPolicy::Skip`] they are
    /// swallowed; anything else is handed back to the caller.
    pub fn handle(&self, err: ConversionError, report: &mut ConversionReport) -> Result<()> {
        report.record_failure(&err);

        if self.on_error == ErrorPolicy::Skip && err.is_row_error() {
            warn!("Skipping row: {}", err);
            return Ok(());
        }

        Err(err)
    }
}
