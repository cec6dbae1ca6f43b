//! GeoPackage binary geometry for points.
//!
//! A blob is the `GP` header (magic, version, flags, srs id, optional
//! envelope) followed by standard WKB, which the `wkb` crate reads and writes.

use geo_traits::{CoordTrait, GeometryTrait, GeometryType, PointTrait};
use wkb::reader::read_wkb;
use wkb::writer::{write_geometry, WriteOptions};
use wkb::Endianness;

use crate::error::{ConversionError, Result};
use crate::models::GeoPoint;

const MAGIC: [u8; 2] = *b"GP";
const VERSION: u8 = 0;
const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const FLAG_EMPTY: u8 = 0b0001_0000;
const ENVELOPE_SHIFT: u8 = 1;
const ENVELOPE_MASK: u8 = 0b0000_1110;
const HEADER_LEN: usize = 8;
const WKB_POINT_LEN: usize = 21;

/// Encode a point with no envelope, little endian throughout.
pub fn encode_point(point: GeoPoint, srs_id: i32) -> Result<Vec<u8>> {
    let mut blob = Vec::with_capacity(HEADER_LEN + WKB_POINT_LEN);
    blob.extend_from_slice(&MAGIC);
    blob.push(VERSION);
    blob.push(FLAG_LITTLE_ENDIAN);
    blob.extend_from_slice(&srs_id.to_le_bytes());

    let options = WriteOptions {
        endianness: Endianness::LittleEndian,
    };
    write_geometry(&mut blob, &point.to_point(), &options)
        .map_err(|e| invalid(&e.to_string()))?;
    Ok(blob)
}

/// Decode a point blob, returning the point and its srs id.
pub fn decode_point(blob: &[u8]) -> Result<(GeoPoint, i32)> {
    if blob.len() < HEADER_LEN || blob[0..2] != MAGIC {
        return Err(invalid("missing GP header"));
    }

    let flags = blob[3];
    if flags & FLAG_EMPTY != 0 {
        return Err(invalid("empty geometry"));
    }
    let srs_bytes = [blob[4], blob[5], blob[6], blob[7]];
    let srs_id = if flags & FLAG_LITTLE_ENDIAN != 0 {
        i32::from_le_bytes(srs_bytes)
    } else {
        i32::from_be_bytes(srs_bytes)
    };

    let envelope_len = match (flags & ENVELOPE_MASK) >> ENVELOPE_SHIFT {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => return Err(invalid(&format!("bad envelope indicator {}", other))),
    };

    let body = blob
        .get(HEADER_LEN + envelope_len..)
        .ok_or_else(|| invalid("truncated envelope"))?;
    let geometry = read_wkb(body).map_err(|e| invalid(&e.to_string()))?;

    let xy = match geometry.as_type() {
        GeometryType::Point(point) => point.coord().map(|c| c.x_y()),
        _ => return Err(invalid("expected a point")),
    };
    let (x, y) = xy.ok_or_else(|| invalid("empty point"))?;

    Ok((GeoPoint::new(x, y), srs_id))
}

fn invalid(message: &str) -> ConversionError {
    ConversionError::InvalidFormat(format!("GeoPackage geometry: {}", message))
}
