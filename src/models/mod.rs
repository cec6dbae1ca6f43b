pub mod feature;
pub mod field;
pub mod record;
pub mod schema;

pub use feature::{Extent, GeoPoint, OutputFeature, OutputRequest};
pub use field::{FieldSpec, FieldType, FieldValue};
pub use record::{RawRow, Record};
pub use schema::{validate_layer_name, Schema, TAFL_FIELDS};
