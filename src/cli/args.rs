use crate::processors::ErrorPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tafl-gpkg")]
#[command(about = "Convert TAFL radio station CSV exports to GeoPackage")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide the progress bar and status messages")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a TAFL CSV file into a GeoPackage point layer
    Convert {
        #[arg(help = "Input TAFL CSV file (no header row)")]
        input: PathBuf,

        #[arg(help = "Output GeoPackage path [default: input path with .gpkg extension]")]
        output: Option<PathBuf>,

        #[arg(short, long, help = "Config file (TOML, JSON or YAML)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Output layer name [default: tafl]")]
        layer: Option<String>,

        #[arg(long, value_enum, help = "What to do with rows that fail to convert")]
        on_error: Option<ErrorPolicy>,

        #[arg(
            long = "skip-line",
            value_name = "LINE",
            help = "Skip this input line (repeatable)"
        )]
        skip_lines: Vec<u64>,

        #[arg(long, help = "Input text encoding, e.g. windows-1252 [default: utf-8]")]
        encoding: Option<String>,

        #[arg(long, help = "Do not build the R-tree spatial index")]
        no_spatial_index: bool,

        #[arg(long, help = "Replace the output file if it exists")]
        overwrite: bool,
    },

    /// Display information about a GeoPackage file
    Info {
        #[arg(help = "GeoPackage file")]
        file: PathBuf,

        #[arg(short, long, default_value = "5")]
        sample: usize,
    },

    /// Print the column schema as a JSON config template
    Schema {
        #[arg(short, long, help = "Config file whose schema to print")]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "tafl-gpkg",
            "convert",
            "TAFL_LTAF.csv",
            "out.gpkg",
            "--on-error",
            "skip",
            "--skip-line",
            "333920",
            "--skip-line",
            "12",
            "--encoding",
            "windows-1252",
        ])
        .unwrap();

        match cli.command {
            Commands::Convert {
                input,
                output,
                on_error,
                skip_lines,
                encoding,
                no_spatial_index,
                ..
            } => {
                assert_eq!(input, PathBuf::from("TAFL_LTAF.csv"));
                assert_eq!(output, Some(PathBuf::from("out.gpkg")));
                assert_eq!(on_error, Some(ErrorPolicy::Skip));
                assert_eq!(skip_lines, vec![333920, 12]);
                assert_eq!(encoding.as_deref(), Some("windows-1252"));
                assert!(!no_spatial_index);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_info_defaults() {
        let cli = Cli::try_parse_from(["tafl-gpkg", "-v", "info", "out.gpkg"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Info { file, sample } => {
                assert_eq!(file, PathBuf::from("out.gpkg"));
                assert_eq!(sample, 5);
            }
            _ => panic!("expected info"),
        }
    }
}
