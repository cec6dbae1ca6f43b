use std::path::Path;

use crate::error::{ConversionError, Result};
use crate::models::{GeoPoint, OutputFeature, OutputRequest, RawRow, Record, Schema};
use crate::processors::schema_mapper::map_row;
use crate::utils::constants::DEFAULT_LAYER;
use crate::utils::coordinates::parse_coordinate_or_zero;

/// Turns schema-mapped records into point features for one output layer.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    schema: Schema,
    layer: String,
    description: Option<String>,
}

impl DatasetBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            layer: DEFAULT_LAYER.to_string(),
            description: None,
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn map_row(&self, row: RawRow) -> Result<Record> {
        map_row(&self.schema, row)
    }

    /// Derive the point geometry and strip the coordinate fields.
    ///
    /// Blank coordinates fall back to 0.0 so every row yields a feature.
    pub fn build_feature(&self, record: Record) -> Result<OutputFeature> {
        let latitude = self.coordinate(&record, self.schema.latitude_index())?;
        let longitude = self.coordinate(&record, self.schema.longitude_index())?;

        let line = record.line();
        let (lat_index, lon_index) = (self.schema.latitude_index(), self.schema.longitude_index());
        let values = record
            .into_values()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != lat_index && *i != lon_index)
            .map(|(_, v)| v)
            .collect();

        Ok(OutputFeature {
            attributes: Record::new(line, self.schema.attribute_names().clone(), values),
            geometry: GeoPoint::new(longitude, latitude),
        })
    }

    /// Map and build in one step.
    pub fn process_row(&self, row: RawRow) -> Result<OutputFeature> {
        let record = self.map_row(row)?;
        self.build_feature(record)
    }

    pub fn output_request(&self, path: &Path) -> OutputRequest {
        let mut request = OutputRequest::new(
            path,
            self.layer.clone(),
            self.schema.attribute_fields().cloned().collect(),
        );
        request.description = self.description.clone();
        request
    }

    fn coordinate(&self, record: &Record, index: usize) -> Result<f64> {
        let raw = record.value_at(index).unwrap_or_default();
        parse_coordinate_or_zero(raw).map_err(|_| ConversionError::GeometryError {
            line: record.line(),
            field: self.schema.fields()[index].name.clone(),
            value: raw.to_string(),
        })
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new(Schema::tafl())
    }
}
