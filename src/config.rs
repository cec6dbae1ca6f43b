use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ConversionError, Result};
use crate::models::{validate_layer_name, FieldSpec, Schema};
use crate::processors::ErrorPolicy;
use crate::utils::constants::{DEFAULT_ENCODING, DEFAULT_LAYER, LATITUDE_FIELD, LONGITUDE_FIELD};

/// Declarative run settings, loaded from a TOML/JSON/YAML file and `TAFL_*`
/// environment variables.
///
/// Every key is optional. Without `fields` the built-in TAFL layout is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConversionConfig {
    /// Where the CSV came from; recorded as the layer description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[validate(length(min = 1))]
    pub layer: String,

    #[validate(length(min = 1))]
    pub latitude_field: String,

    #[validate(length(min = 1))]
    pub longitude_field: String,

    #[validate(length(min = 1))]
    pub encoding: String,

    pub on_error: ErrorPolicy,

    pub skip_lines: Vec<u64>,

    pub spatial_index: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldSpec>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            layer: DEFAULT_LAYER.to_string(),
            latitude_field: LATITUDE_FIELD.to_string(),
            longitude_field: LONGITUDE_FIELD.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            on_error: ErrorPolicy::default(),
            skip_lines: Vec::new(),
            spatial_index: true,
            fields: None,
        }
    }
}

impl ConversionConfig {
    /// Load settings from an optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConversionError::InputNotFound(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TAFL")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("skip_lines"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        validate_layer_name(&config.layer)?;
        Ok(config)
    }

    /// The schema to map rows with: configured fields or the TAFL default.
    pub fn schema(&self) -> Result<Schema> {
        match &self.fields {
            Some(fields) => Schema::with_coordinate_fields(
                fields.clone(),
                &self.latitude_field,
                &self.longitude_field,
            ),
            None if self.latitude_field == LATITUDE_FIELD
                && self.longitude_field == LONGITUDE_FIELD =>
            {
                Ok(Schema::tafl())
            }
            None => Schema::with_coordinate_fields(
                Schema::tafl().fields().to_vec(),
                &self.latitude_field,
                &self.longitude_field,
            ),
        }
    }

    pub fn description(&self) -> Option<String> {
        self.source_url
            .as_ref()
            .map(|url| format!("Source: {}", url))
    }

    /// A config document spelling out the given schema, for use as a template.
    pub fn template(schema: &Schema) -> Self {
        Self {
            latitude_field: schema.latitude_field().name.clone(),
            longitude_field: schema.longitude_field().name.clone(),
            fields: Some(schema.fields().to_vec()),
            ..Self::default()
        }
    }
}
