//! Turns the world dataset into discrete GeoJSON features.
//!
//! The dataset is usually a TopoJSON `Topology` (shared, quantized,
//! delta-encoded arcs); an already decoded GeoJSON `FeatureCollection` is
//! accepted as-is.

use crate::error::{PipelineError, Result};
use geojson::{
    feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Position, Value as GeoValue,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    objects: HashMap<String, TopoObject>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct TopoObject {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<JsonObject>,
    #[serde(default)]
    arcs: Option<Value>,
    #[serde(default)]
    coordinates: Option<Value>,
    #[serde(default)]
    geometries: Vec<TopoObject>,
}

/// Extracts the features of `object` from a decoded world document.
pub fn features(resource: &str, doc: Value, object: &str) -> Result<Vec<Feature>> {
    match doc.get("type").and_then(Value::as_str) {
        Some("Topology") => {
            let topology: Topology =
                serde_json::from_value(doc).map_err(|e| PipelineError::parse(resource, e))?;
            topology_features(&topology, object).map_err(|msg| PipelineError::parse(resource, msg))
        }
        Some("FeatureCollection") => {
            let collection: FeatureCollection =
                serde_json::from_value(doc).map_err(|e| PipelineError::parse(resource, e))?;
            Ok(collection.features)
        }
        other => Err(PipelineError::parse(
            resource,
            format!("expected a Topology or FeatureCollection, found type {other:?}"),
        )),
    }
}

fn topology_features(topology: &Topology, object: &str) -> Result<Vec<Feature>, String> {
    let root = topology
        .objects
        .get(object)
        .ok_or_else(|| format!("topology has no object named '{object}'"))?;
    let arcs = ArcDecoder::new(topology);

    if root.kind.as_deref() == Some("GeometryCollection") {
        root.geometries.iter().map(|g| arcs.feature(g)).collect()
    } else {
        Ok(vec![arcs.feature(root)?])
    }
}

struct ArcDecoder {
    arcs: Vec<Vec<Position>>,
    transform: Option<Transform>,
}

impl ArcDecoder {
    fn new(topology: &Topology) -> Self {
        let transform = topology.transform;
        let arcs = topology
            .arcs
            .iter()
            .map(|arc| decode_arc(arc, transform))
            .collect();
        Self { arcs, transform }
    }

    fn feature(&self, obj: &TopoObject) -> Result<Feature, String> {
        let id = match &obj.id {
            Some(Value::String(s)) => Some(Id::String(s.clone())),
            Some(Value::Number(n)) => Some(Id::Number(n.clone())),
            _ => None,
        };

        Ok(Feature {
            bbox: None,
            geometry: self.geometry(obj)?,
            id,
            properties: Some(obj.properties.clone().unwrap_or_default()),
            foreign_members: None,
        })
    }

    fn geometry(&self, obj: &TopoObject) -> Result<Option<Geometry>, String> {
        let Some(kind) = obj.kind.as_deref() else {
            return Ok(None);
        };

        let value = match kind {
            "Point" => {
                let coords: Vec<f64> = field(&obj.coordinates, "coordinates")?;
                GeoValue::Point(self.point(&coords))
            }
            "MultiPoint" => {
                let coords: Vec<Vec<f64>> = field(&obj.coordinates, "coordinates")?;
                GeoValue::MultiPoint(coords.iter().map(|c| self.point(c)).collect())
            }
            "LineString" => {
                let arcs: Vec<i64> = field(&obj.arcs, "arcs")?;
                GeoValue::LineString(self.line(&arcs)?)
            }
            "MultiLineString" => {
                let arcs: Vec<Vec<i64>> = field(&obj.arcs, "arcs")?;
                let lines = arcs.iter().map(|a| self.line(a)).collect::<Result<_, _>>()?;
                GeoValue::MultiLineString(lines)
            }
            "Polygon" => {
                let arcs: Vec<Vec<i64>> = field(&obj.arcs, "arcs")?;
                GeoValue::Polygon(self.polygon(&arcs)?)
            }
            "MultiPolygon" => {
                let arcs: Vec<Vec<Vec<i64>>> = field(&obj.arcs, "arcs")?;
                let polygons = arcs.iter().map(|p| self.polygon(p)).collect::<Result<_, _>>()?;
                GeoValue::MultiPolygon(polygons)
            }
            "GeometryCollection" => {
                let mut geometries = Vec::with_capacity(obj.geometries.len());
                for child in &obj.geometries {
                    if let Some(geometry) = self.geometry(child)? {
                        geometries.push(geometry);
                    }
                }
                GeoValue::GeometryCollection(geometries)
            }
            other => return Err(format!("unknown geometry type '{other}'")),
        };

        Ok(Some(Geometry::new(value)))
    }

    fn point(&self, coords: &[f64]) -> Position {
        let mut position = coords.to_vec();
        if let (Some(t), true) = (self.transform, position.len() >= 2) {
            position[0] = position[0] * t.scale[0] + t.translate[0];
            position[1] = position[1] * t.scale[1] + t.translate[1];
        }
        position
    }

    /// Stitches arcs end to end; a negative index `i` means arc `!i` reversed.
    fn line(&self, indices: &[i64]) -> Result<Vec<Position>, String> {
        let mut points: Vec<Position> = Vec::new();
        for &index in indices {
            let (arc_index, reversed) = if index < 0 {
                (!index, true)
            } else {
                (index, false)
            };
            let arc = usize::try_from(arc_index)
                .ok()
                .and_then(|i| self.arcs.get(i))
                .ok_or_else(|| format!("arc index {index} out of range"))?;

            // Consecutive arcs share their joining point.
            points.pop();
            if reversed {
                points.extend(arc.iter().rev().cloned());
            } else {
                points.extend(arc.iter().cloned());
            }
        }

        if points.len() == 1 {
            points.push(points[0].clone());
        }
        Ok(points)
    }

    fn ring(&self, indices: &[i64]) -> Result<Vec<Position>, String> {
        let mut points = self.line(indices)?;
        if let Some(first) = points.first().cloned() {
            while points.len() < 4 {
                points.push(first.clone());
            }
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<Position>>, String> {
        rings.iter().map(|r| self.ring(r)).collect()
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<Transform>) -> Vec<Position> {
    let Some(t) = transform else {
        return arc.to_vec();
    };

    let (mut x, mut y) = (0.0, 0.0);
    arc.iter()
        .map(|p| {
            let mut position = p.clone();
            if position.len() >= 2 {
                x += position[0];
                y += position[1];
                position[0] = x * t.scale[0] + t.translate[0];
                position[1] = y * t.scale[1] + t.translate[1];
            }
            position
        })
        .collect()
}

fn field<T: DeserializeOwned>(value: &Option<Value>, name: &str) -> Result<T, String> {
    let value = value.as_ref().ok_or_else(|| format!("geometry is missing '{name}'"))?;
    serde_json::from_value(value.clone()).map_err(|e| format!("invalid '{name}': {e}"))
}
