use clap::Parser;
use tafl_gpkg::cli::{run, Cli};
use tafl_gpkg::utils::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    run(cli)?;
    Ok(())
}
