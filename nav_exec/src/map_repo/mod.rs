//! # Map repository module
//!
//! Supplies the forbidden areas and points of interest of a named map. Stored records come in
//! more than one shape, they are normalised here so the rest of the software only sees
//! [`Polygon`]s and [`PointOfInterest`]s.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod json;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use json::JsonMapRepository;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, path::PathBuf};

use log::warn;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auto::map::Polygon;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait MapRepository {
    /// Load the map with the given name.
    fn load_map(&self, name: &str) -> Result<MapData, MapRepoError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A normalised map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapData {
    pub forbidden_areas: Vec<Polygon>,
    pub points_of_interest: BTreeMap<String, PointOfInterest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub x_m: f64,
    pub y_m: f64,

    /// What the point is, e.g. `table`.
    pub kind: String,
}

/// Map file as stored.
#[derive(Debug, Deserialize)]
struct MapFile {
    #[serde(default)]
    forbidden_areas: Vec<AreaRecord>,

    #[serde(default)]
    points_of_interest: BTreeMap<String, PoiRecord>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MapRepoError {
    #[error("Invalid map name {0:?}")]
    InvalidName(String),

    #[error("Cannot read the map file {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Cannot parse the map: {0}")]
    Parse(serde_json::Error),
}

/// A stored forbidden area.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AreaRecord {
    /// Bare list of `[x, y]` vertices.
    Legacy(Vec<[f64; 2]>),

    Named {
        #[serde(default)]
        id: Option<u64>,

        #[serde(default)]
        name: Option<String>,

        coordinates: Vec<[f64; 2]>,
    },
}

/// A stored point of interest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PoiRecord {
    Typed(f64, f64, String),

    /// `[x, y]` only, the kind defaults to `table`.
    Bare(f64, f64),

    Object {
        x: f64,
        y: f64,
        #[serde(default = "default_poi_kind")]
        kind: String,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MapData {
    /// Parse and normalise a map from its JSON representation.
    pub fn from_json_str(s: &str) -> Result<Self, MapRepoError> {
        let file: MapFile = serde_json::from_str(s).map_err(MapRepoError::Parse)?;

        let forbidden_areas = file
            .forbidden_areas
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let poly = r.to_polygon();
                if poly.is_none() {
                    warn!(
                        "Forbidden area {} ({}) has fewer than 3 valid vertices, skipped",
                        i,
                        r.label()
                    );
                }
                poly
            })
            .collect();

        let points_of_interest = file
            .points_of_interest
            .into_iter()
            .map(|(name, r)| (name, PointOfInterest::from(r)))
            .collect();

        Ok(Self {
            forbidden_areas,
            points_of_interest,
        })
    }

    pub fn poi(&self, name: &str) -> Option<&PointOfInterest> {
        self.points_of_interest.get(name)
    }
}

impl PointOfInterest {
    pub fn position_m(&self) -> Point2<f64> {
        Point2::new(self.x_m, self.y_m)
    }
}

impl AreaRecord {
    pub fn coordinates(&self) -> &[[f64; 2]] {
        match self {
            AreaRecord::Legacy(c) => c,
            AreaRecord::Named { coordinates, .. } => coordinates,
        }
    }

    pub fn to_polygon(&self) -> Option<Polygon> {
        Polygon::from_pairs(self.coordinates())
    }

    fn label(&self) -> String {
        match self {
            AreaRecord::Named {
                name: Some(name), ..
            } => name.clone(),
            AreaRecord::Named { id: Some(id), .. } => format!("id {}", id),
            _ => String::from("unnamed"),
        }
    }
}

impl From<PoiRecord> for PointOfInterest {
    fn from(r: PoiRecord) -> Self {
        match r {
            PoiRecord::Typed(x_m, y_m, kind) => Self { x_m, y_m, kind },
            PoiRecord::Bare(x_m, y_m) => Self {
                x_m,
                y_m,
                kind: default_poi_kind(),
            },
            PoiRecord::Object { x, y, kind } => Self {
                x_m: x,
                y_m: y,
                kind,
            },
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_poi_kind() -> String {
    String::from("table")
}
