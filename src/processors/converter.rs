use crate::error::Result;
use crate::processors::{ConversionReport, DatasetBuilder, RowPolicy};
use crate::readers::TaflReader;
use crate::utils::constants::PROGRESS_UPDATE_INTERVAL;
use crate::utils::filename::{validate_input_path, validate_output_path};
use crate::utils::progress::ProgressReporter;
use crate::writers::GpkgWriter;
use std::path::Path;
use tracing::{debug, info};

/// Runs one CSV → GeoPackage conversion, row by row.
pub struct Converter {
    builder: DatasetBuilder,
    policy: RowPolicy,
    reader: TaflReader,
    writer: GpkgWriter,
    overwrite: bool,
}

impl Converter {
    pub fn new(builder: DatasetBuilder, policy: RowPolicy) -> Self {
        Self {
            builder,
            policy,
            reader: TaflReader::new(),
            writer: GpkgWriter::new(),
            overwrite: false,
        }
    }

    pub fn with_reader(mut self, reader: TaflReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_spatial_index(mut self, spatial_index: bool) -> Self {
        self.writer = self.writer.with_spatial_index(spatial_index);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self.writer = self.writer.with_overwrite(overwrite);
        self
    }

    pub fn builder(&self) -> &DatasetBuilder {
        &self.builder
    }

    /// Convert `input` into a new GeoPackage at `output`.
    ///
    /// Paths are checked before the input is opened. On any error the output
    /// file is not created.
    pub fn convert(
        &self,
        input: &Path,
        output: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<ConversionReport> {
        validate_output_path(output, self.overwrite)?;
        validate_input_path(input)?;

        info!(
            "Converting {} to {} (layer '{}', encoding {})",
            input.display(),
            output.display(),
            self.builder.layer(),
            self.reader.encoding_name()
        );

        let request = self.builder.output_request(output);
        let mut sink = self.writer.create(&request)?;
        let mut report = ConversionReport::new();

        for row in self.reader.rows(input)? {
            let row = row?;
            report.rows_read += 1;
            let line = row.line;
            let byte_offset = row.byte_offset;

            if self.policy.should_skip(line) {
                report.rows_skipped += 1;
                continue;
            }

            match self.builder.process_row(row) {
                Ok(feature) => {
                    let nulled = sink.write_feature(&feature)?;
                    report.nulled_values += nulled as u64;
                }
                Err(e) => self.policy.handle(e, &mut report)?,
            }

            if report.rows_read % PROGRESS_UPDATE_INTERVAL == 0 {
                debug!("Processed {} rows", report.rows_read);
                if let Some(progress) = progress {
                    progress.update(byte_offset);
                }
            }
        }

        let summary = sink.finish()?;
        report.features_written = summary.features;

        info!(
            "Converted {} of {} rows ({} skipped, {} failed)",
            report.features_written,
            report.rows_read,
            report.rows_skipped,
            report.rows_failed()
        );

        Ok(report)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DatasetBuilder::default(), RowPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use crate::processors::ErrorPolicy;
    use crate::utils::constants::TAFL_FIELD_COUNT;
    use std::io::Write;
    use tempfile::TempDir;

    fn tafl_line(lat: &str, lon: &str) -> String {
        let mut cells = vec![String::new(); TAFL_FIELD_COUNT];
        cells[0] = "AM".to_string();
        cells[1] = "810.0".to_string();
        cells[40] = lat.to_string();
        cells[41] = lon.to_string();
        cells.join(",")
    }

    fn write_input(dir: &TempDir, lines: &[String]) -> std::path::PathBuf {
        let path = dir.path().join("tafl.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_convert_counts_rows() -> Result<()> {
        let dir = TempDir::new()?;
        let input = write_input(
            &dir,
            &[
                tafl_line("45.5017", "-73.5673"),
                tafl_line("49.2827", "-123.1207"),
            ],
        );
        let output = dir.path().join("out.gpkg");

        let report = Converter::default().convert(&input, &output, None)?;

        assert_eq!(report.rows_read, 2);
        assert_eq!(report.features_written, 2);
        assert!(report.is_clean());
        assert!(output.exists());
        Ok(())
    }

    #[test]
    fn test_abort_leaves_no_output() -> Result<()> {
        let dir = TempDir::new()?;
        let mut short = tafl_line("45.5017", "-73.5673");
        short.truncate(short.rfind(',').unwrap());
        let input = write_input(&dir, &[tafl_line("45.5", "-73.5"), short]);
        let output = dir.path().join("out.gpkg");

        let err = Converter::default()
            .convert(&input, &output, None)
            .unwrap_err();

        assert!(matches!(
            err,
            ConversionError::SchemaMismatch {
                line: 2,
                found: 60,
                ..
            }
        ));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_skip_policy_and_skip_list() -> Result<()> {
        let dir = TempDir::new()?;
        let input = write_input(
            &dir,
            &[
                tafl_line("45.5", "-73.5"),
                "AM,810.0".to_string(),
                tafl_line("north", "-73.5"),
                tafl_line("46.8", "-71.2"),
            ],
        );
        let output = dir.path().join("out.gpkg");

        let policy = RowPolicy::new(ErrorPolicy::Skip).with_skip_lines([4]);
        let report = Converter::new(DatasetBuilder::default(), policy)
            .convert(&input, &output, None)?;

        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.schema_mismatches, 1);
        assert_eq!(report.geometry_errors, 1);
        assert_eq!(report.features_written, 1);
        Ok(())
    }

    #[test]
    fn test_blank_line_is_a_schema_mismatch() -> Result<()> {
        let dir = TempDir::new()?;
        let input = write_input(
            &dir,
            &[
                tafl_line("45.5", "-73.5"),
                String::new(),
                tafl_line("46.8", "-71.2"),
            ],
        );
        let output = dir.path().join("out.gpkg");

        let err = Converter::default()
            .convert(&input, &output, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::SchemaMismatch {
                line: 2,
                found: 0,
                ..
            }
        ));
        assert!(!output.exists());

        let report = Converter::new(DatasetBuilder::default(), RowPolicy::new(ErrorPolicy::Skip))
            .convert(&input, &output, None)?;
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.schema_mismatches, 1);
        assert_eq!(report.failures[0].line, 2);
        assert_eq!(report.features_written, 2);
        Ok(())
    }

    #[test]
    fn test_wrong_extension_rejected_before_input() {
        let dir = TempDir::new().unwrap();
        let err = Converter::default()
            .convert(
                &dir.path().join("does-not-exist.csv"),
                &dir.path().join("result.shp"),
                None,
            )
            .unwrap_err();

        assert!(matches!(err, ConversionError::OutputPathInvalid { .. }));
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = Converter::default()
            .convert(
                &dir.path().join("missing.csv"),
                &dir.path().join("out.gpkg"),
                None,
            )
            .unwrap_err();

        assert!(matches!(err, ConversionError::InputNotFound(_)));
        assert!(!dir.path().join("out.gpkg").exists());
    }
}
