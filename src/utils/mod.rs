pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use coordinates::{parse_coordinate, parse_coordinate_or_zero};
pub use filename::{default_output_path, validate_input_path, validate_output_path};
pub use logging::init_logging;
pub use progress::ProgressReporter;
