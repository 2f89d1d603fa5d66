use std::borrow::Cow;

use foundation::hit::{point_within, polygon_contains, polyline_within};
use foundation::{Aabb2, LonLat};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LonLat),
    MultiPoint(Vec<LonLat>),
    LineString(Vec<LonLat>),
    MultiLineString(Vec<Vec<LonLat>>),
    Polygon(Vec<Vec<LonLat>>),
    MultiPolygon(Vec<Vec<Vec<LonLat>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    pub fn bounds(&self) -> Aabb2 {
        match self {
            Geometry::Point(p) => Aabb2::from_points([p]),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => Aabb2::from_points(ps),
            Geometry::MultiLineString(parts) | Geometry::Polygon(parts) => {
                Aabb2::from_points(parts.iter().flatten())
            }
            Geometry::MultiPolygon(polys) => Aabb2::from_points(polys.iter().flatten().flatten()),
            Geometry::GeometryCollection(members) => members
                .iter()
                .fold(Aabb2::empty(), |acc, g| acc.union(&g.bounds())),
        }
    }

    /// Returns `true` if `p` lies on this geometry.
    ///
    /// Points and lines are hit within `tolerance` degrees; polygons are hit
    /// anywhere inside their area or within `tolerance` of a ring.
    pub fn hit(&self, p: LonLat, tolerance: f64) -> bool {
        match self {
            Geometry::Point(q) => point_within(p, *q, tolerance),
            Geometry::MultiPoint(qs) => qs.iter().any(|q| point_within(p, *q, tolerance)),
            Geometry::LineString(line) => polyline_within(p, line, tolerance),
            Geometry::MultiLineString(lines) => {
                lines.iter().any(|line| polyline_within(p, line, tolerance))
            }
            Geometry::Polygon(rings) => polygon_hit(p, rings, tolerance),
            Geometry::MultiPolygon(polys) => polys.iter().any(|rings| polygon_hit(p, rings, tolerance)),
            Geometry::GeometryCollection(members) => members.iter().any(|g| g.hit(p, tolerance)),
        }
    }
}

fn polygon_hit(p: LonLat, rings: &[Vec<LonLat>], tolerance: f64) -> bool {
    polygon_contains(p, rings) || rings.iter().any(|ring| polyline_within(p, ring, tolerance))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// GeoJSON allows `"geometry": null`; such features can be looked up by
    /// property but never hit.
    pub geometry: Option<Geometry>,
    bounds: Aabb2,
}

impl Feature {
    pub fn new(id: Option<String>, properties: Map<String, Value>, geometry: Option<Geometry>) -> Self {
        let bounds = geometry.as_ref().map(Geometry::bounds).unwrap_or_default();
        Self {
            id,
            properties,
            geometry,
            bounds,
        }
    }

    pub fn bounds(&self) -> Aabb2 {
        self.bounds
    }

    /// Property lookup that treats an explicit JSON `null` as absent.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    /// Textual view of a scalar property: strings as-is, numbers and booleans
    /// rendered. Arrays and objects have no textual view.
    pub fn property_text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.property(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    /// Numeric view of a property. Numeric strings are accepted since
    /// shapefile exports frequently stringify attribute columns.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        match self.property(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn hit(&self, p: LonLat, tolerance: f64) -> bool {
        let Some(geometry) = &self.geometry else {
            return false;
        };
        if !self.bounds.expanded(tolerance).contains(p) {
            return false;
        }
        geometry.hit(p, tolerance)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug)]
pub enum FeatureCollectionError {
    InvalidJson(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for FeatureCollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureCollectionError::InvalidJson(e) => write!(f, "JSON parse error: {e}"),
            FeatureCollectionError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            FeatureCollectionError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for FeatureCollectionError {}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// First feature whose `key` property equals `value`.
    pub fn find_by_property(&self, key: &str, value: &Value) -> Option<&Feature> {
        self.features.iter().find(|f| f.property(key) == Some(value))
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, FeatureCollectionError> {
        Self::from_geojson_slice(payload.as_bytes())
    }

    pub fn from_geojson_slice(payload: &[u8]) -> Result<Self, FeatureCollectionError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| FeatureCollectionError::InvalidJson(e.to_string()))?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, FeatureCollectionError> {
        let obj = value
            .as_object()
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| FeatureCollectionError::InvalidFeature { index, reason };

            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;

            let feat_type = feat_obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| invalid("feature missing type".to_string()))?;
            if feat_type != "Feature" {
                return Err(invalid(format!("unexpected feature type: {feat_type}")));
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let geometry = match feat_obj.get("geometry") {
                None => return Err(invalid("feature missing geometry".to_string())),
                Some(Value::Null) => None,
                Some(g) => Some(parse_geometry(g).map_err(invalid)?),
            };

            features.push(Feature::new(id, properties, geometry));
        }

        Ok(Self { features })
    }

    /// Semantic round-trip exporter: emits a GeoJSON FeatureCollection.
    /// (Property ordering may differ from the original input.)
    pub fn to_geojson_value(&self) -> Value {
        features_to_geojson_value(&self.features)
    }
}

/// Builds a FeatureCollection value from any subset of features.
pub fn features_to_geojson_value<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Value {
    let mut root = Map::new();
    root.insert(
        "type".to_string(),
        Value::String("FeatureCollection".to_string()),
    );

    let features: Vec<Value> = features
        .into_iter()
        .map(|feat| {
            let mut fobj = Map::new();
            fobj.insert("type".to_string(), Value::String("Feature".to_string()));
            if let Some(id) = &feat.id {
                fobj.insert("id".to_string(), Value::String(id.clone()));
            }
            fobj.insert(
                "properties".to_string(),
                Value::Object(feat.properties.clone()),
            );
            fobj.insert(
                "geometry".to_string(),
                feat.geometry
                    .as_ref()
                    .map(geometry_to_geojson_value)
                    .unwrap_or(Value::Null),
            );
            Value::Object(fobj)
        })
        .collect();

    root.insert("features".to_string(), Value::Array(features));
    Value::Object(root)
}

fn geometry_to_geojson_value(geom: &Geometry) -> Value {
    let (ty, key, body) = match geom {
        Geometry::Point(p) => ("Point", "coordinates", point_coords(p)),
        Geometry::MultiPoint(ps) => ("MultiPoint", "coordinates", points_coords(ps)),
        Geometry::LineString(ps) => ("LineString", "coordinates", points_coords(ps)),
        Geometry::MultiLineString(lines) => ("MultiLineString", "coordinates", rings_coords(lines)),
        Geometry::Polygon(rings) => ("Polygon", "coordinates", rings_coords(rings)),
        Geometry::MultiPolygon(polys) => (
            "MultiPolygon",
            "coordinates",
            Value::Array(polys.iter().map(|rings| rings_coords(rings)).collect()),
        ),
        Geometry::GeometryCollection(members) => (
            "GeometryCollection",
            "geometries",
            Value::Array(members.iter().map(geometry_to_geojson_value).collect()),
        ),
    };

    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(ty.to_string()));
    obj.insert(key.to_string(), body);
    Value::Object(obj)
}

fn point_coords(p: &LonLat) -> Value {
    Value::from(p.to_array().to_vec())
}

fn points_coords(ps: &[LonLat]) -> Value {
    Value::Array(ps.iter().map(point_coords).collect())
}

fn rings_coords(rings: &[Vec<LonLat>]) -> Value {
    Value::Array(rings.iter().map(|ring| points_coords(ring)).collect())
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    if ty == "GeometryCollection" {
        let members = obj
            .get("geometries")
            .and_then(|v| v.as_array())
            .ok_or("GeometryCollection missing geometries".to_string())?;
        return members
            .iter()
            .map(parse_geometry)
            .collect::<Result<_, _>>()
            .map(Geometry::GeometryCollection);
    }

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<LonLat, String> {
    let arr = coords
        .as_array()
        .ok_or("Point coordinates must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("Point coordinates must have [lon, lat]".to_string());
    }
    let lon = arr[0]
        .as_f64()
        .ok_or("Point lon must be a number".to_string())?;
    let lat = arr[1]
        .as_f64()
        .ok_or("Point lat must be a number".to_string())?;
    Ok([lon, lat].into())
}

fn parse_points(coords: &Value) -> Result<Vec<LonLat>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<LonLat>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of point arrays".to_string())?;
    arr.iter().map(parse_points).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Vec<LonLat>>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_rings).collect()
}
