use crate::error::{ConversionError, Result};
use crate::models::{RawRow, Record, Schema};

/// Map the cells of a raw row onto the schema's field names.
///
/// The row must have exactly one cell per schema field. Cells are not
/// coerced here, so codes with leading zeros survive unchanged.
pub fn map_row(schema: &Schema, row: RawRow) -> Result<Record> {
    if row.cells.len() != schema.len() {
        return Err(ConversionError::SchemaMismatch {
            line: row.line,
            expected: schema.len(),
            found: row.cells.len(),
            row: row.cells,
        });
    }

    Ok(Record::new(row.line, schema.names().clone(), row.cells))
}
