pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::{run, run_with_output};
