//! Well point geometry: WKB decoding and GeoJSON rendering.

use serde::Serialize;

/// WKB geometry type code for a point.
const WKB_POINT: u32 = 1;

/// EWKB flag: an SRID follows the type code.
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// EWKB flag bits, including Z and M.
const EWKB_FLAGS: u32 = 0xE000_0000;

/// A 2D point in the database's coordinate order (x = longitude, y = latitude).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("WKB is truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("invalid WKB byte order marker {0:#04x}")]
    ByteOrder(u8),

    #[error("expected a point, got WKB geometry type {0}")]
    NotAPoint(u32),
}

/// Decodes a WKB or EWKB point.
///
/// Both byte orders are accepted. Z and M ordinates are ignored. An empty
/// point (NaN coordinates) decodes to `(0, 0)`.
pub fn parse_wkb_point(wkb: &[u8]) -> Result<Point, GeometryError> {
    let mut reader = WkbReader::new(wkb)?;

    let raw_type = reader.read_u32()?;
    let has_srid = raw_type & EWKB_SRID_FLAG != 0;
    // ISO WKB encodes Z/M as +1000/+2000/+3000.
    let geometry_type = (raw_type & !EWKB_FLAGS) % 1000;
    if geometry_type != WKB_POINT {
        return Err(GeometryError::NotAPoint(raw_type));
    }
    if has_srid {
        reader.read_u32()?;
    }

    let x = reader.read_f64()?;
    let y = reader.read_f64()?;
    if x.is_nan() && y.is_nan() {
        return Ok(Point::default());
    }
    Ok(Point::new(x, y))
}

/// Decodes a nullable geometry column. NULL becomes `(0, 0)`.
pub fn point_from_column(value: Option<&[u8]>) -> Result<Point, GeometryError> {
    value.map_or(Ok(Point::default()), parse_wkb_point)
}

struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, GeometryError> {
        let little_endian = match bytes.first() {
            Some(0) => false,
            Some(1) => true,
            Some(&other) => return Err(GeometryError::ByteOrder(other)),
            None => {
                return Err(GeometryError::Truncated {
                    needed: 1,
                    actual: 0,
                });
            }
        };
        Ok(Self {
            bytes,
            pos: 1,
            little_endian,
        })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], GeometryError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(GeometryError::Truncated {
                needed: end,
                actual: self.bytes.len(),
            })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32, GeometryError> {
        let raw = self.take::<4>()?;
        Ok(if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn read_f64(&mut self) -> Result<f64, GeometryError> {
        let raw = self.take::<8>()?;
        Ok(if self.little_endian {
            f64::from_le_bytes(raw)
        } else {
            f64::from_be_bytes(raw)
        })
    }
}

#[derive(Serialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: PointGeometry,
    properties: Option<()>,
}

#[derive(Serialize)]
struct PointGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

/// Renders points as a GeoJSON `FeatureCollection`.
///
/// Coordinates are written `[y, x]` (latitude first); existing map clients
/// depend on that order.
pub fn render_feature_collection(points: &[Point]) -> Result<Vec<u8>, serde_json::Error> {
    let collection = FeatureCollection {
        kind: "FeatureCollection",
        features: points
            .iter()
            .map(|p| Feature {
                kind: "Feature",
                geometry: PointGeometry {
                    kind: "Point",
                    coordinates: [p.y, p.x],
                },
                properties: None,
            })
            .collect(),
    };
    serde_json::to_vec(&collection)
}
