use std::fmt;
use std::path::PathBuf;

use geo_types::Point;

use crate::models::{FieldSpec, Record};
use crate::utils::constants::{GPKG_DRIVER, WGS84_SRS_ID};

/// A WGS84 point, stored in (longitude, latitude) order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint(Point<f64>);

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self(Point::new(longitude, latitude))
    }

    pub fn x(&self) -> f64 {
        self.0.x()
    }

    pub fn y(&self) -> f64 {
        self.0.y()
    }

    pub fn longitude(&self) -> f64 {
        self.x()
    }

    pub fn latitude(&self) -> f64 {
        self.y()
    }

    pub fn to_point(self) -> Point<f64> {
        self.0
    }

    pub fn srs_id(&self) -> i32 {
        WGS84_SRS_ID
    }

    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.x(), self.y())
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(point: Point<f64>) -> Self {
        Self(point)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

/// Bounding box of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            min_x: point.x(),
            min_y: point.y(),
            max_x: point.x(),
            max_y: point.y(),
        }
    }

    pub fn include(&mut self, point: GeoPoint) {
        self.min_x = self.min_x.min(point.x());
        self.min_y = self.min_y.min(point.y());
        self.max_x = self.max_x.max(point.x());
        self.max_y = self.max_y.max(point.y());
    }

    /// Grow an optional extent, starting it on the first point.
    pub fn extend(extent: &mut Option<Extent>, point: GeoPoint) {
        match extent {
            Some(e) => e.include(point),
            None => *extent = Some(Extent::from_point(point)),
        }
    }
}

/// A record ready for the writer: attributes minus coordinates, plus geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFeature {
    pub attributes: Record,
    pub geometry: GeoPoint,
}

impl OutputFeature {
    pub fn line(&self) -> u64 {
        self.attributes.line()
    }
}

/// Everything the writer needs to create the output layer.
#[derive(Debug, Clone)]
pub struct OutputRequest {
    pub path: PathBuf,
    pub driver: &'static str,
    pub layer: String,
    pub srs_id: i32,
    /// Attribute columns, in feature attribute order
    pub fields: Vec<FieldSpec>,
    pub description: Option<String>,
}

impl OutputRequest {
    pub fn new(path: impl Into<PathBuf>, layer: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            path: path.into(),
            driver: GPKG_DRIVER,
            layer: layer.into(),
            srs_id: WGS84_SRS_ID,
            fields,
            description: None,
        }
    }
}
