pub mod conversion_report;
pub mod converter;
pub mod dataset_builder;
pub mod row_policy;
pub mod schema_mapper;

pub use conversion_report::{ConversionReport, FailureKind, RowFailure};
pub use converter::Converter;
pub use dataset_builder::DatasetBuilder;
pub use row_policy::{ErrorPolicy, RowPolicy};
pub use schema_mapper::map_row;
