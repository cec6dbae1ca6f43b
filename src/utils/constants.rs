/// Output container
pub const GPKG_DRIVER: &str = "GPKG";
pub const GPKG_EXTENSION: &str = "gpkg";
pub const DEFAULT_LAYER: &str = "tafl";
pub const GEOMETRY_COLUMN: &str = "geom";
pub const FEATURE_ID_COLUMN: &str = "fid";

/// GeoPackage 1.3 file identification
pub const GPKG_APPLICATION_ID: i32 = 0x4750_4B47; // "GPKG"
pub const GPKG_USER_VERSION: i32 = 10300;

/// Coordinate reference system
pub const WGS84_SRS_ID: i32 = 4326;
pub const WGS84_DEFINITION: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],AXIS[\"Latitude\",NORTH],AXIS[\"Longitude\",EAST],AUTHORITY[\"EPSG\",\"4326\"]]";

/// TAFL column layout
pub const TAFL_FIELD_COUNT: usize = 61;
pub const LATITUDE_FIELD: &str = "Latitude";
pub const LONGITUDE_FIELD: &str = "Longitude";

/// Processing defaults
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const MAX_REPORTED_FAILURES: usize = 50;
pub const PROGRESS_UPDATE_INTERVAL: u64 = 5000;
