use crate::cli::args::{Cli, Commands};
use crate::config::ConversionConfig;
use crate::error::Result;
use crate::processors::{Converter, DatasetBuilder, RowPolicy};
use crate::readers::TaflReader;
use crate::utils::filename::default_output_path;
use crate::utils::progress::ProgressReporter;
use crate::writers::GpkgWriter;
use std::io::{self, Write};
use tracing::debug;

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    run_with_output(cli, &mut stdout.lock())
}

/// Run a command, printing results to `out`.
///
/// With `--quiet` only results are printed: the conversion summary, the
/// file report and the schema template.
pub fn run_with_output<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let quiet = cli.quiet;

    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            layer,
            on_error,
            skip_lines,
            encoding,
            no_spatial_index,
            overwrite,
        } => {
            let mut settings = ConversionConfig::load(config.as_deref())?;

            // Command line flags win over the config file
            if let Some(layer) = layer {
                settings.layer = layer;
            }
            if let Some(on_error) = on_error {
                settings.on_error = on_error;
            }
            if let Some(encoding) = encoding {
                settings.encoding = encoding;
            }
            if no_spatial_index {
                settings.spatial_index = false;
            }
            settings.skip_lines.extend(skip_lines);
            debug!("Effective settings: {:?}", settings);

            let output_file = output.unwrap_or_else(|| default_output_path(&input));

            if !quiet {
                writeln!(out, "Converting TAFL data...")?;
                writeln!(out, "Input file: {}", input.display())?;
                writeln!(out, "Output file: {}", output_file.display())?;
                writeln!(out, "Layer: {}, on error: {:?}", settings.layer, settings.on_error)?;
            }

            let builder = DatasetBuilder::new(settings.schema()?)
                .with_layer(settings.layer.clone())
                .with_description(settings.description());
            let policy = RowPolicy::new(settings.on_error).with_skip_lines(settings.skip_lines);
            let converter = Converter::new(builder, policy)
                .with_reader(TaflReader::with_encoding(&settings.encoding)?)
                .with_spatial_index(settings.spatial_index)
                .with_overwrite(overwrite);

            let total_bytes = std::fs::metadata(&input).map(|m| m.len()).unwrap_or(0);
            let progress = ProgressReporter::new_bytes(total_bytes, "Converting rows...", quiet);

            let report = converter.convert(&input, &output_file, Some(&progress))?;
            progress.finish_with_message(&format!(
                "Wrote {} features",
                report.features_written
            ));

            writeln!(out, "\n{}", report.summary())?;
            if !quiet {
                writeln!(out, "Conversion complete!")?;
            }
        }

        Commands::Info { file, sample } => {
            if !quiet {
                writeln!(out, "Analyzing GeoPackage file: {}", file.display())?;
            }

            let writer = GpkgWriter::new();
            let file_info = writer.get_file_info(&file)?;
            writeln!(out, "\n{}", file_info.summary())?;

            if sample > 0 {
                for layer in &file_info.layers {
                    writeln!(
                        out,
                        "Sample features from '{}' (showing up to {}):",
                        layer.name, sample
                    )?;
                    match writer.read_sample_features(&file, &layer.name, sample) {
                        Ok(features) => {
                            for feature in features {
                                let geometry = feature
                                    .geometry
                                    .map(|g| g.to_wkt())
                                    .unwrap_or_else(|| "EMPTY".to_string());
                                let preview: Vec<String> = feature
                                    .attributes
                                    .iter()
                                    .filter_map(|(name, value)| {
                                        value.as_ref().filter(|v| !v.is_empty()).map(|v| {
                                            format!("{}={}", name, v)
                                        })
                                    })
                                    .take(4)
                                    .collect();
                                writeln!(
                                    out,
                                    "{}. {} {}",
                                    feature.fid,
                                    geometry,
                                    preview.join(", ")
                                )?;
                            }
                        }
                        Err(e) => writeln!(out, "Error reading sample data: {}", e)?,
                    }
                }
            }
        }

        Commands::Schema { config } => {
            let settings = ConversionConfig::load(config.as_deref())?;
            let schema = settings.schema()?;
            let template = ConversionConfig::template(&schema);
            writeln!(out, "{}", serde_json::to_string_pretty(&template)?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use crate::utils::constants::TAFL_FIELD_COUNT;
    use clap::Parser;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn tafl_line(call_sign: &str, lat: &str, lon: &str) -> String {
        let mut cells = vec![String::new(); TAFL_FIELD_COUNT];
        cells[0] = "FM".to_string();
        cells[1] = "98.5".to_string();
        cells[33] = call_sign.to_string();
        cells[40] = lat.to_string();
        cells[41] = lon.to_string();
        cells.join(",")
    }

    fn write_input(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn run_args(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("tafl-gpkg").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        run_with_output(cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn arg(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_convert_flags_override_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config = dir.path().join("run.toml");
        std::fs::write(&config, "layer = \"from_config\"\nskip_lines = [2]\n")?;
        let input = write_input(
            dir.path(),
            "tafl.csv",
            &[
                tafl_line("CJAD", "45.5017", "-73.5673"),
                "BROKEN,ROW".to_string(),
                tafl_line("CKNW", "north", "-123.1207"),
                "ALSO,BROKEN".to_string(),
                tafl_line("VOCM", "47.5615", "-52.7126"),
            ],
        );
        let output = dir.path().join("stations.gpkg");

        let printed = run_args(&[
            "--quiet",
            "convert",
            arg(&input),
            arg(&output),
            "--config",
            arg(&config),
            "--layer",
            "stations",
            "--on-error",
            "skip",
            "--skip-line",
            "4",
            "--no-spatial-index",
        ])?;

        assert!(printed.contains("Rows read: 5"));
        assert!(printed.contains("Rows skipped (listed): 2"));
        assert!(printed.contains("1 geometry errors"));
        assert!(!printed.contains("Converting TAFL data"));
        assert!(!printed.contains("Conversion complete"));

        let info = GpkgWriter::new().get_file_info(&output)?;
        assert_eq!(info.layers.len(), 1);
        assert_eq!(info.layers[0].name, "stations");
        assert_eq!(info.layers[0].feature_count, 2);
        assert!(!info.layers[0].has_spatial_index);
        Ok(())
    }

    #[test]
    fn test_convert_default_output_path() -> Result<()> {
        let dir = TempDir::new()?;
        let input = write_input(
            dir.path(),
            "TAFL_LTAF.csv",
            &[tafl_line("CJAD", "45.5017", "-73.5673")],
        );

        let printed = run_args(&["convert", arg(&input)])?;

        let expected = dir.path().join("TAFL_LTAF.gpkg");
        assert!(expected.is_file());
        assert!(printed.contains("Converting TAFL data..."));
        assert!(printed.contains(&format!("Output file: {}", expected.display())));
        assert!(printed.contains("Conversion complete!"));
        Ok(())
    }

    #[test]
    fn test_convert_rejects_shapefile_output() -> Result<()> {
        let dir = TempDir::new()?;
        let input = write_input(
            dir.path(),
            "tafl.csv",
            &[tafl_line("CJAD", "45.5017", "-73.5673")],
        );
        let output = dir.path().join("stations.shp");

        let err = run_args(&["-q", "convert", arg(&input), arg(&output)]).unwrap_err();

        assert!(matches!(err, ConversionError::OutputPathInvalid { .. }));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_schema_output_reloads_as_config() -> Result<()> {
        let dir = TempDir::new()?;
        let printed = run_args(&["schema"])?;
        let template: ConversionConfig = serde_json::from_str(&printed)?;
        assert_eq!(template.fields.as_ref().map(Vec::len), Some(TAFL_FIELD_COUNT));

        let config = dir.path().join("schema.json");
        std::fs::write(&config, &printed)?;
        let input = write_input(
            dir.path(),
            "tafl.csv",
            &[tafl_line("CJAD", "45.5017", "-73.5673")],
        );
        let output = dir.path().join("from_schema.gpkg");

        run_args(&[
            "-q",
            "convert",
            arg(&input),
            arg(&output),
            "--config",
            arg(&config),
        ])?;

        let info = GpkgWriter::new().get_file_info(&output)?;
        assert_eq!(info.layers[0].name, "tafl");
        assert_eq!(info.layers[0].feature_count, 1);
        // fid + geom + every field but the coordinates
        assert_eq!(info.layers[0].columns.len(), TAFL_FIELD_COUNT);
        Ok(())
    }

    #[test]
    fn test_info_reports_layer_and_samples() -> Result<()> {
        let dir = TempDir::new()?;
        let input = write_input(
            dir.path(),
            "tafl.csv",
            &[
                tafl_line("CJAD", "45.5017", "-73.5673"),
                tafl_line("CKNW", "49.2827", "-123.1207"),
            ],
        );
        let output = dir.path().join("info.gpkg");
        run_args(&["-q", "convert", arg(&input), arg(&output)])?;

        let printed = run_args(&["info", arg(&output), "--sample", "1"])?;
        assert!(printed.contains("Analyzing GeoPackage file"));
        assert!(printed.contains("Layer 'tafl': 2 features"));
        assert!(printed.contains("Spatial index: yes"));
        assert!(printed.contains("1. POINT(-73.5673 45.5017)"));
        assert!(printed.contains("Call_sign=CJAD"));
        assert!(!printed.contains("CKNW"));

        let quiet = run_args(&["--quiet", "info", arg(&output), "--sample", "0"])?;
        assert!(!quiet.contains("Analyzing GeoPackage file"));
        assert!(quiet.contains("Layer 'tafl': 2 features"));
        Ok(())
    }
}
