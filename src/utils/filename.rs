use std::path::{Path, PathBuf};

use crate::error::{ConversionError, Result};
use crate::utils::constants::GPKG_EXTENSION;

/// Default output path: the input path with a `.gpkg` extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(GPKG_EXTENSION)
}

pub fn has_gpkg_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(GPKG_EXTENSION))
}

/// Check an output path before any input is touched.
pub fn validate_output_path(path: &Path, overwrite: bool) -> Result<()> {
    let invalid = |reason: &str| ConversionError::OutputPathInvalid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if !has_gpkg_extension(path) {
        return Err(invalid("GeoPackages must have a .gpkg extension"));
    }

    if path.is_dir() {
        return Err(invalid("path is a directory"));
    }

    if path.exists() && !overwrite {
        return Err(invalid("output file already exists"));
    }

    Ok(())
}

pub fn validate_input_path(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ConversionError::InputNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Directory that will hold the output file.
pub fn output_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
