pub mod tafl_reader;

pub use tafl_reader::{TaflReader, TaflRows};
