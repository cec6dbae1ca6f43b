pub mod geometry;
pub mod gpkg_writer;

pub use gpkg_writer::{GpkgFileInfo, GpkgWriter, LayerInfo, LayerSink, LayerSummary, SampleFeature};
