use std::collections::HashSet;
use std::sync::Arc;

use validator::Validate;

use crate::error::{ConversionError, Result};
use crate::models::{FieldSpec, FieldType};
use crate::utils::constants::{
    FEATURE_ID_COLUMN, GEOMETRY_COLUMN, LATITUDE_FIELD, LONGITUDE_FIELD,
};

use crate::models::FieldType::{Date, Real, Text};

/// Column layout of a TAFL export: name, type, display width.
pub const TAFL_FIELDS: &[(&str, FieldType, u32)] = &[
    ("Radio_Type", Text, 2),
    ("Frequency_MHZ", Real, 4),
    ("Frequency_record_identifier", Text, 10),
    ("Regulatory_service", Text, 10),
    ("Communication_type", Text, 4),
    ("Conformity_to_freq_plan", Text, 10),
    ("Frequency_allocation_name", Text, 50),
    ("Channel", Text, 10),
    ("International_coordination_number", Text, 20),
    ("Analog_digital", Text, 1),
    ("Occupied_bandwidth_khz", Text, 20),
    ("Designation_of_emission", Text, 20),
    ("Modulation_type", Text, 13),
    ("Filtration_installed", Text, 5),
    ("Tx_effective_radiated_power_dbw", Text, 10),
    ("Tx_transmitter_power_w", Text, 40),
    ("Total_losses_db", Text, 10),
    ("Analog_capacity", Text, 20),
    ("Digital_capacity", Text, 20),
    ("Rx_unfaded_received_signal_level_dbw", Text, 15),
    ("Rx_threshold_signal_level_for_BER_dbw", Text, 15),
    ("Manufacturer", Text, 70),
    ("Model_number", Text, 100),
    ("Antenna_gain_dbi", Text, 15),
    ("Antenna_pattern", Text, 6),
    ("Half_power_beam_width_deg", Text, 4),
    ("Front_back_ratio_db", Text, 5),
    ("Polarization", Text, 1),
    ("Height_AGL_m", Text, 10),
    ("Azimuth_main_lobe_deg", Text, 10),
    ("Vertical_elevation_angle_deg", Text, 10),
    ("Station_location", Text, 200),
    ("Licensee_station_reference", Text, 100),
    ("Call_sign", Text, 10),
    ("Type_of_station", Text, 2),
    ("ITU_class", Text, 2),
    ("Station_cost_category", Text, 2),
    ("Num_identical_stations", Text, 5),
    ("Reference_id", Text, 100),
    ("Province", Text, 2),
    (LATITUDE_FIELD, Real, 12),
    (LONGITUDE_FIELD, Real, 12),
    ("Ground_elevation_MSL_m", Text, 10),
    ("Antenna_structure_height_AGL_m", Text, 10),
    ("Congestion_zone", Text, 1),
    ("Radius_of_operation_km", Text, 7),
    ("Satellite_name", Text, 1),
    ("Authorization_number", Text, 13),
    ("Service", Text, 1),
    ("Subservice", Text, 3),
    ("Licence_type", Text, 1),
    ("Authorization_status", Text, 2),
    ("In_service_date", Date, 10),
    ("Account_number", Text, 12),
    ("Licensee_name", Text, 200),
    ("Licensee_address", Text, 200),
    ("Operational_status", Text, 1),
    ("Station_class", Text, 1),
    ("Horizontal_power_w", Text, 50),
    ("Vertical_power_w", Text, 50),
    ("Standby_transmitter_information", Text, 1),
];

/// Ordered, validated column layout shared by every row of a run.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    names: Arc<[String]>,
    attribute_names: Arc<[String]>,
    latitude_index: usize,
    longitude_index: usize,
}

impl Schema {
    /// Build a schema whose coordinates live in `Latitude` and `Longitude`.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        Self::with_coordinate_fields(fields, LATITUDE_FIELD, LONGITUDE_FIELD)
    }

    pub fn with_coordinate_fields(
        fields: Vec<FieldSpec>,
        latitude_field: &str,
        longitude_field: &str,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(ConversionError::InvalidSchema(
                "schema has no fields".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            field.validate()?;
            if is_reserved_column(&field.name) {
                return Err(ConversionError::InvalidSchema(format!(
                    "field name '{}' is reserved for the output layer",
                    field.name
                )));
            }
            // SQLite column names are case-insensitive
            if !seen.insert(field.name.to_lowercase()) {
                return Err(ConversionError::InvalidSchema(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }

        let latitude_index = coordinate_index(&fields, latitude_field)?;
        let longitude_index = coordinate_index(&fields, longitude_field)?;
        if latitude_index == longitude_index {
            return Err(ConversionError::InvalidSchema(
                "latitude and longitude must be different fields".to_string(),
            ));
        }

        Ok(Self::from_parts(fields, latitude_index, longitude_index))
    }

    /// The 61-column TAFL layout.
    pub fn tafl() -> Self {
        let fields: Vec<FieldSpec> = TAFL_FIELDS
            .iter()
            .map(|&(name, field_type, width)| FieldSpec::new(name, field_type, Some(width)))
            .collect();
        let position = |name: &str| TAFL_FIELDS.iter().position(|(n, _, _)| *n == name);

        Self::from_parts(
            fields,
            position(LATITUDE_FIELD).unwrap_or(40),
            position(LONGITUDE_FIELD).unwrap_or(41),
        )
    }

    fn from_parts(fields: Vec<FieldSpec>, latitude_index: usize, longitude_index: usize) -> Self {
        let names: Arc<[String]> = fields.iter().map(|f| f.name.clone()).collect();
        let attribute_names: Arc<[String]> = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != latitude_index && *i != longitude_index)
            .map(|(_, f)| f.name.clone())
            .collect();

        Self {
            fields,
            names,
            attribute_names,
            latitude_index,
            longitude_index,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn names(&self) -> &Arc<[String]> {
        &self.names
    }

    /// Field names carried as attributes, i.e. everything but the coordinates.
    pub fn attribute_names(&self) -> &Arc<[String]> {
        &self.attribute_names
    }

    pub fn attribute_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        let (lat, lon) = (self.latitude_index, self.longitude_index);
        self.fields
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != lat && *i != lon)
            .map(|(_, f)| f)
    }

    pub fn latitude_index(&self) -> usize {
        self.latitude_index
    }

    pub fn longitude_index(&self) -> usize {
        self.longitude_index
    }

    pub fn latitude_field(&self) -> &FieldSpec {
        &self.fields[self.latitude_index]
    }

    pub fn longitude_field(&self) -> &FieldSpec {
        &self.fields[self.longitude_index]
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::tafl()
    }
}

fn coordinate_index(fields: &[FieldSpec], name: &str) -> Result<usize> {
    let index = fields.iter().position(|f| f.name == name).ok_or_else(|| {
        ConversionError::InvalidSchema(format!("coordinate field '{}' is missing", name))
    })?;

    if fields[index].field_type != FieldType::Real {
        return Err(ConversionError::InvalidSchema(format!(
            "coordinate field '{}' must be of type real",
            name
        )));
    }

    Ok(index)
}

fn is_reserved_column(name: &str) -> bool {
    name.eq_ignore_ascii_case(FEATURE_ID_COLUMN) || name.eq_ignore_ascii_case(GEOMETRY_COLUMN)
}

/// Check a layer name before it becomes a table name.
///
/// Names starting with `gpkg_` or `rtree_` belong to the GeoPackage itself.
pub fn validate_layer_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConversionError::InvalidSchema(
            "layer name is empty".to_string(),
        ));
    }

    let lower = name.to_ascii_lowercase();
    if lower.starts_with("gpkg_") || lower.starts_with("rtree_") {
        return Err(ConversionError::InvalidSchema(format!(
            "layer name '{}' uses a reserved prefix",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::TAFL_FIELD_COUNT;

    #[test]
    fn test_tafl_schema_layout() {
        let schema = Schema::tafl();

        assert_eq!(schema.len(), TAFL_FIELD_COUNT);
        assert_eq!(schema.latitude_index(), 40);
        assert_eq!(schema.longitude_index(), 41);
        assert_eq!(schema.field(0).unwrap().name, "Radio_Type");
        assert_eq!(schema.field(52).unwrap().field_type, FieldType::Date);
        assert_eq!(schema.field(60).unwrap().name, "Standby_transmitter_information");
        assert_eq!(schema.attribute_names().len(), TAFL_FIELD_COUNT - 2);
        assert_eq!(schema.attribute_fields().count(), TAFL_FIELD_COUNT - 2);
        assert!(!schema.attribute_names().iter().any(|n| n == LATITUDE_FIELD));
    }

    #[test]
    fn test_tafl_table_passes_validation() {
        let tafl = Schema::tafl();
        let validated = Schema::new(tafl.fields().to_vec()).unwrap();

        assert_eq!(validated.latitude_index(), tafl.latitude_index());
        assert_eq!(validated.longitude_index(), tafl.longitude_index());
        assert_eq!(validated.names(), tafl.names());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let fields = vec![
            FieldSpec::new("Latitude", FieldType::Real, None),
            FieldSpec::new("Longitude", FieldType::Real, None),
            FieldSpec::text("Call_sign", 10),
            FieldSpec::text("call_sign", 10),
        ];
        let err = Schema::new(fields).unwrap_err();
        assert!(err.to_string().contains("duplicate field name"));
    }

    #[test]
    fn test_rejects_missing_or_textual_coordinates() {
        let fields = vec![
            FieldSpec::new("Latitude", FieldType::Real, None),
            FieldSpec::text("Call_sign", 10),
        ];
        assert!(Schema::new(fields).is_err());

        let fields = vec![
            FieldSpec::text("Latitude", 12),
            FieldSpec::new("Longitude", FieldType::Real, None),
        ];
        assert!(Schema::new(fields).is_err());

        assert!(Schema::new(Vec::new()).is_err());

        let fields = vec![
            FieldSpec::new("Latitude", FieldType::Integer, None),
            FieldSpec::new("Longitude", FieldType::Real, None),
        ];
        let err = Schema::new(fields).unwrap_err();
        assert!(err.to_string().contains("must be of type real"));
    }

    #[test]
    fn test_rejects_reserved_column_names() {
        for reserved in ["fid", "GEOM", "Fid"] {
            let fields = vec![
                FieldSpec::new("Latitude", FieldType::Real, None),
                FieldSpec::new("Longitude", FieldType::Real, None),
                FieldSpec::text(reserved, 10),
            ];
            let err = Schema::new(fields).unwrap_err();
            assert!(matches!(err, ConversionError::InvalidSchema(_)));
            assert!(err.to_string().contains("reserved"));
        }
    }

    #[test]
    fn test_layer_names() {
        assert!(validate_layer_name("tafl").is_ok());
        assert!(validate_layer_name("stations_2024").is_ok());
        assert!(validate_layer_name("").is_err());
        assert!(validate_layer_name("   ").is_err());
        assert!(validate_layer_name("gpkg_contents").is_err());
        assert!(validate_layer_name("RTREE_tafl_geom").is_err());
    }

    #[test]
    fn test_custom_coordinate_fields() {
        let fields = vec![
            FieldSpec::text("Call_sign", 10),
            FieldSpec::new("lon", FieldType::Real, None),
            FieldSpec::new("lat", FieldType::Real, None),
        ];
        let schema = Schema::with_coordinate_fields(fields, "lat", "lon").unwrap();

        assert_eq!(schema.latitude_index(), 2);
        assert_eq!(schema.longitude_index(), 1);
        assert_eq!(schema.attribute_names().to_vec(), vec!["Call_sign".to_string()]);
    }
}
