use crate::error::ConversionError;
use crate::utils::constants::MAX_REPORTED_FAILURES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SchemaMismatch,
    Geometry,
}

#[derive(Debug, Clone)]
pub struct RowFailure {
    pub line: u64,
    pub kind: FailureKind,
    pub details: String,
}

/// Tally of a conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub rows_read: u64,
    pub features_written: u64,
    /// Rows dropped because their line is on the skip list
    pub rows_skipped: u64,
    pub schema_mismatches: u64,
    pub geometry_errors: u64,
    /// Non-text values stored as NULL because they did not parse
    pub nulled_values: u64,
    /// First failures, capped at `MAX_REPORTED_FAILURES`
    pub failures: Vec<RowFailure>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_failed(&self) -> u64 {
        self.schema_mismatches + self.geometry_errors
    }

    /// Count a row error. Run-level errors are ignored.
    pub fn record_failure(&mut self, err: &ConversionError) {
        let (line, kind) = match err {
            ConversionError::SchemaMismatch { line, .. } => {
                self.schema_mismatches += 1;
                (*line, FailureKind::SchemaMismatch)
            }
            ConversionError::GeometryError { line, .. } => {
                self.geometry_errors += 1;
                (*line, FailureKind::Geometry)
            }
            _ => return,
        };

        if self.failures.len() < MAX_REPORTED_FAILURES {
            self.failures.push(RowFailure {
                line,
                kind,
                details: err.to_string(),
            });
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rows_failed() == 0 && self.nulled_values == 0
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("Conversion Summary:\n");
        summary.push_str(&format!("  Rows read: {}\n", self.rows_read));
        summary.push_str(&format!("  Features written: {}\n", self.features_written));
        summary.push_str(&format!("  Rows skipped (listed): {}\n", self.rows_skipped));
        summary.push_str(&format!(
            "  Rows failed: {} ({} schema mismatches, {} geometry errors)\n",
            self.rows_failed(),
            self.schema_mismatches,
            self.geometry_errors
        ));
        summary.push_str(&format!("  Values stored as NULL: {}\n", self.nulled_values));

        if !self.failures.is_empty() {
            summary.push_str("\nFirst failures:\n");
            for failure in &self.failures {
                summary.push_str(&format!("  - {}\n", failure.details));
            }
            if self.rows_failed() > self.failures.len() as u64 {
                summary.push_str(&format!(
                    "  ... and {} more\n",
                    self.rows_failed() - self.failures.len() as u64
                ));
            }
        }

        summary
    }
}
