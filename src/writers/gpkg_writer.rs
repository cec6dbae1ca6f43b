use crate::error::{ConversionError, Result};
use crate::models::{
    validate_layer_name, Extent, FieldSpec, FieldType, FieldValue, GeoPoint, OutputFeature,
    OutputRequest,
};
use crate::utils::constants::{
    FEATURE_ID_COLUMN, GEOMETRY_COLUMN, GPKG_APPLICATION_ID, GPKG_USER_VERSION, WGS84_DEFINITION,
    WGS84_SRS_ID,
};
use crate::utils::filename::{output_dir, validate_output_path};
use crate::writers::geometry::{decode_point, encode_point};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

const CORE_TABLES: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT uk_gc_table_name UNIQUE (table_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);
CREATE TABLE gpkg_extensions (
    table_name TEXT,
    column_name TEXT,
    extension_name TEXT NOT NULL,
    definition TEXT NOT NULL,
    scope TEXT NOT NULL,
    CONSTRAINT ge_tce UNIQUE (table_name, column_name, extension_name)
);
INSERT INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system');
";

const RTREE_EXTENSION: &str = "gpkg_rtree_index";
const RTREE_DEFINITION: &str = "http://www.geopackage.org/spec120/#extension_rtree";

/// Writes point layers into GeoPackage files.
pub struct GpkgWriter {
    spatial_index: bool,
    overwrite: bool,
}

impl GpkgWriter {
    pub fn new() -> Self {
        Self {
            spatial_index: true,
            overwrite: false,
        }
    }

    pub fn with_spatial_index(mut self, spatial_index: bool) -> Self {
        self.spatial_index = spatial_index;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Start a new GeoPackage holding one empty point layer.
    ///
    /// The file is built under a temporary name next to the target and only
    /// moved into place by [`LayerSink::finish`]. Dropping the sink before
    /// that discards everything written so far.
    pub fn create(&self, request: &OutputRequest) -> Result<LayerSink> {
        validate_output_path(&request.path, self.overwrite)?;
        validate_layer_name(&request.layer)?;
        if request.srs_id != WGS84_SRS_ID {
            return Err(ConversionError::InvalidFormat(format!(
                "Unsupported srs id {}",
                request.srs_id
            )));
        }

        let dir = output_dir(&request.path);
        std::fs::create_dir_all(&dir)?;
        let temp = tempfile::Builder::new()
            .prefix(".tafl-")
            .suffix(".gpkg.tmp")
            .tempfile_in(&dir)?
            .into_temp_path();

        let conn = Connection::open(&temp)?;
        conn.pragma_update(None, "application_id", GPKG_APPLICATION_ID)?;
        conn.pragma_update(None, "user_version", GPKG_USER_VERSION)?;
        conn.execute_batch(CORE_TABLES)?;
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84 geodetic', ?1, 'EPSG', ?1, ?2, 'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid')",
            params![WGS84_SRS_ID, WGS84_DEFINITION],
        )?;
        create_layer(&conn, request, self.spatial_index)?;
        conn.execute_batch("BEGIN")?;

        info!(
            "Created {} layer '{}' with {} attribute columns",
            request.driver,
            request.layer,
            request.fields.len()
        );

        Ok(LayerSink {
            conn,
            temp,
            target: request.path.clone(),
            overwrite: self.overwrite,
            layer: request.layer.clone(),
            fields: request.fields.clone(),
            srs_id: request.srs_id,
            insert_sql: insert_sql(request),
            rtree_sql: self
                .spatial_index
                .then(|| rtree_insert_sql(&request.layer)),
            extent: None,
            features: 0,
            nulled_values: 0,
        })
    }

    /// Write a complete set of features in one call.
    pub fn write_features(
        &self,
        request: &OutputRequest,
        features: &[OutputFeature],
    ) -> Result<LayerSummary> {
        let mut sink = self.create(request)?;
        for feature in features {
            sink.write_feature(feature)?;
        }
        sink.finish()
    }

    /// Read back layer metadata from an existing GeoPackage.
    pub fn get_file_info(&self, path: &Path) -> Result<GpkgFileInfo> {
        let conn = open_read_only(path)?;
        let file_size = std::fs::metadata(path)?.len();

        let mut stmt = conn.prepare(
            "SELECT c.table_name, g.column_name, g.geometry_type_name, g.srs_id, \
                    c.min_x, c.min_y, c.max_x, c.max_y, c.description \
             FROM gpkg_contents c \
             JOIN gpkg_geometry_columns g ON g.table_name = c.table_name \
             WHERE c.data_type = 'features' \
             ORDER BY c.table_name",
        )?;
        let rows = stmt.query_map([], |row| {
            let extent = match (
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<f64>>(5)?,
                row.get::<_, Option<f64>>(6)?,
                row.get::<_, Option<f64>>(7)?,
            ) {
                (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => Some(Extent {
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                }),
                _ => None,
            };
            Ok(LayerInfo {
                name: row.get(0)?,
                geometry_column: row.get(1)?,
                geometry_type: row.get(2)?,
                srs_id: row.get(3)?,
                extent,
                description: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                feature_count: 0,
                columns: Vec::new(),
                has_spatial_index: false,
            })
        })?;

        let mut layers = Vec::new();
        for layer in rows {
            let mut layer = layer?;
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_identifier(&layer.name)),
                [],
                |row| row.get(0),
            )?;
            layer.feature_count = count as u64;
            layer.columns = column_names(&conn, &layer.name)?;
            layer.has_spatial_index = conn
                .query_row(
                    "SELECT 1 FROM gpkg_extensions WHERE table_name = ?1 AND extension_name = ?2",
                    params![layer.name, RTREE_EXTENSION],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            layers.push(layer);
        }

        Ok(GpkgFileInfo {
            path: path.to_path_buf(),
            file_size,
            layers,
        })
    }

    /// Read the first `limit` features of a layer.
    pub fn read_sample_features(
        &self,
        path: &Path,
        layer: &str,
        limit: usize,
    ) -> Result<Vec<SampleFeature>> {
        let conn = open_read_only(path)?;
        let geometry_column: String = conn
            .query_row(
                "SELECT column_name FROM gpkg_geometry_columns WHERE table_name = ?1",
                params![layer],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                ConversionError::InvalidFormat(format!("No feature layer named '{}'", layer))
            })?;

        let columns: Vec<String> = column_names(&conn, layer)?
            .into_iter()
            .filter(|c| c != FEATURE_ID_COLUMN && *c != geometry_column)
            .collect();

        let select_list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        let sql = format!(
            "SELECT {}, {}{}{} FROM {} ORDER BY {} LIMIT ?1",
            quote_identifier(FEATURE_ID_COLUMN),
            quote_identifier(&geometry_column),
            if select_list.is_empty() { "" } else { ", " },
            select_list.join(", "),
            quote_identifier(layer),
            quote_identifier(FEATURE_ID_COLUMN),
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![limit as i64])?;
        let mut features = Vec::new();

        while let Some(row) = rows.next()? {
            let fid: i64 = row.get(0)?;
            let geometry = match row.get_ref(1)? {
                ValueRef::Blob(blob) => Some(decode_point(blob)?.0),
                _ => None,
            };
            let attributes = columns
                .iter()
                .enumerate()
                .map(|(i, name)| -> Result<(String, Option<String>)> {
                    Ok((name.clone(), display_value(row.get_ref(i + 2)?)))
                })
                .collect::<Result<Vec<_>>>()?;

            features.push(SampleFeature {
                fid,
                geometry,
                attributes,
            });
        }

        Ok(features)
    }
}

impl Default for GpkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// An open layer receiving features inside a single transaction.
pub struct LayerSink {
    // Declared before `temp` so the connection closes before the file is removed
    conn: Connection,
    temp: TempPath,
    target: PathBuf,
    overwrite: bool,
    layer: String,
    fields: Vec<FieldSpec>,
    srs_id: i32,
    insert_sql: String,
    rtree_sql: Option<String>,
    extent: Option<Extent>,
    features: u64,
    nulled_values: u64,
}

impl LayerSink {
    /// Insert one feature. Returns how many attribute values were stored as
    /// NULL because they did not parse as their column type.
    pub fn write_feature(&mut self, feature: &OutputFeature) -> Result<usize> {
        let attributes = feature.attributes.values();
        if attributes.len() != self.fields.len() {
            return Err(ConversionError::InvalidFormat(format!(
                "Line {}: feature has {} attributes, layer has {} columns",
                feature.line(),
                attributes.len(),
                self.fields.len()
            )));
        }

        let mut nulled = 0;
        let mut values = Vec::with_capacity(attributes.len() + 1);
        values.push(Value::Blob(encode_point(feature.geometry, self.srs_id)?));

        for (field, raw) in self.fields.iter().zip(attributes) {
            let value = match field.field_type.coerce(raw) {
                Ok(value) => to_sql_value(value),
                Err(e) => {
                    debug!("Line {}: {} stored as NULL: {}", feature.line(), field.name, e);
                    nulled += 1;
                    Value::Null
                }
            };
            values.push(value);
        }

        self.conn
            .prepare_cached(&self.insert_sql)?
            .execute(params_from_iter(values))?;

        if let Some(rtree_sql) = &self.rtree_sql {
            let fid = self.conn.last_insert_rowid();
            let (x, y) = (feature.geometry.x(), feature.geometry.y());
            self.conn.prepare_cached(rtree_sql)?.execute(params![fid, x, y])?;
        }

        Extent::extend(&mut self.extent, feature.geometry);
        self.features += 1;
        self.nulled_values += nulled as u64;
        Ok(nulled)
    }

    pub fn features_written(&self) -> u64 {
        self.features
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Commit, record the layer extent and move the file to its target path.
    pub fn finish(self) -> Result<LayerSummary> {
        let (min_x, min_y, max_x, max_y) = match self.extent {
            Some(e) => (Some(e.min_x), Some(e.min_y), Some(e.max_x), Some(e.max_y)),
            None => (None, None, None, None),
        };
        self.conn.execute(
            "UPDATE gpkg_contents SET min_x = ?1, min_y = ?2, max_x = ?3, max_y = ?4, \
             last_change = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE table_name = ?5",
            params![min_x, min_y, max_x, max_y, self.layer],
        )?;
        self.conn.execute_batch("COMMIT")?;
        self.conn.close().map_err(|(_, e)| e)?;

        if self.overwrite {
            self.temp.persist(&self.target)?;
        } else {
            self.temp.persist_noclobber(&self.target)?;
        }

        info!(
            "Wrote {} features to {}",
            self.features,
            self.target.display()
        );

        Ok(LayerSummary {
            path: self.target,
            layer: self.layer,
            features: self.features,
            nulled_values: self.nulled_values,
            extent: self.extent,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LayerSummary {
    pub path: PathBuf,
    pub layer: String,
    pub features: u64,
    pub nulled_values: u64,
    pub extent: Option<Extent>,
}

#[derive(Debug, Clone)]
pub struct LayerInfo {
    pub name: String,
    pub geometry_column: String,
    pub geometry_type: String,
    pub srs_id: i32,
    pub extent: Option<Extent>,
    pub description: String,
    pub feature_count: u64,
    pub columns: Vec<String>,
    pub has_spatial_index: bool,
}

#[derive(Debug, Clone)]
pub struct GpkgFileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub layers: Vec<LayerInfo>,
}

impl GpkgFileInfo {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "File: {}\nSize: {:.2} MB\nLayers: {}\n",
            self.path.display(),
            self.file_size as f64 / (1024.0 * 1024.0),
            self.layers.len()
        );

        for layer in &self.layers {
            summary.push_str(&format!(
                "\nLayer '{}': {} features, {} geometry in column '{}', EPSG:{}\n",
                layer.name,
                layer.feature_count,
                layer.geometry_type,
                layer.geometry_column,
                layer.srs_id
            ));
            match layer.extent {
                Some(e) => summary.push_str(&format!(
                    "  Extent: ({:.4}, {:.4}) - ({:.4}, {:.4})\n",
                    e.min_x, e.min_y, e.max_x, e.max_y
                )),
                None => summary.push_str("  Extent: empty\n"),
            }
            summary.push_str(&format!(
                "  Columns: {}\n  Spatial index: {}\n",
                layer.columns.len(),
                if layer.has_spatial_index { "yes" } else { "no" }
            ));
            if !layer.description.is_empty() {
                summary.push_str(&format!("  Description: {}\n", layer.description));
            }
        }

        summary
    }
}

#[derive(Debug, Clone)]
pub struct SampleFeature {
    pub fid: i64,
    pub geometry: Option<GeoPoint>,
    pub attributes: Vec<(String, Option<String>)>,
}

impl SampleFeature {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }
}

fn create_layer(conn: &Connection, request: &OutputRequest, spatial_index: bool) -> Result<()> {
    let mut columns = vec![
        format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
            quote_identifier(FEATURE_ID_COLUMN)
        ),
        format!("{} POINT", quote_identifier(GEOMETRY_COLUMN)),
    ];
    columns.extend(
        request
            .fields
            .iter()
            .map(|f| format!("{} {}", quote_identifier(&f.name), column_type(f))),
    );

    let layer = quote_identifier(&request.layer);
    conn.execute_batch(&format!("CREATE TABLE {} ({})", layer, columns.join(", ")))?;

    conn.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, description, srs_id) \
         VALUES (?1, 'features', ?1, ?2, ?3)",
        params![
            request.layer,
            request.description.clone().unwrap_or_default(),
            request.srs_id
        ],
    )?;
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, ?2, 'POINT', ?3, 0, 0)",
        params![request.layer, GEOMETRY_COLUMN, request.srs_id],
    )?;

    if spatial_index {
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE {} USING rtree(id, minx, maxx, miny, maxy)",
            quote_identifier(&rtree_table(&request.layer))
        ))?;
        conn.execute(
            "INSERT INTO gpkg_extensions VALUES (?1, ?2, ?3, ?4, 'write-only')",
            params![
                request.layer,
                GEOMETRY_COLUMN,
                RTREE_EXTENSION,
                RTREE_DEFINITION
            ],
        )?;
    }

    Ok(())
}

fn insert_sql(request: &OutputRequest) -> String {
    let mut columns = vec![quote_identifier(GEOMETRY_COLUMN)];
    columns.extend(request.fields.iter().map(|f| quote_identifier(&f.name)));
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(&request.layer),
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn rtree_table(layer: &str) -> String {
    format!("rtree_{}_{}", layer, GEOMETRY_COLUMN)
}

fn rtree_insert_sql(layer: &str) -> String {
    format!(
        "INSERT INTO {} (id, minx, maxx, miny, maxy) VALUES (?1, ?2, ?2, ?3, ?3)",
        quote_identifier(&rtree_table(layer))
    )
}

fn column_type(field: &FieldSpec) -> String {
    match (field.field_type, field.max_width) {
        (FieldType::Text, Some(width)) => format!("TEXT({})", width),
        (FieldType::Text, None) => "TEXT".to_string(),
        (FieldType::Real, _) => "REAL".to_string(),
        (FieldType::Integer, _) => "INTEGER".to_string(),
        (FieldType::Date, _) => "DATE".to_string(),
    }
}

fn to_sql_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(s) => Value::Text(s),
        FieldValue::Real(v) => Value::Real(v),
        FieldValue::Integer(v) => Value::Integer(v),
        FieldValue::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
    }
}

fn display_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(format!("<{} bytes>", b.len())),
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(ConversionError::InputNotFound(path.to_path_buf()));
    }
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
