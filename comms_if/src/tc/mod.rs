//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications 
//! interface.
//!
//! TCs are carried as JSON of the form `{"type": <variant>, "payload": {...}}`.
//! Types without data omit the payload.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static TC_TYPES: [&str; 8] = [
    "NavigateAndReturn",
    "NavigateToPoi",
    "Reset",
    "SetSpeedMultiplier",
    "SetForbiddenAreas",
    "SetAutonomous",
    "MoveManual",
    "LoadMap",
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot by an operator or a
/// script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Tc {
    /// Travel to the given point, pause, then return to the home base.
    NavigateAndReturn {
        x_m: f64,
        y_m: f64,
    },

    /// As `NavigateAndReturn` but targeting a named point of interest.
    NavigateToPoi {
        name: String,
    },

    /// Reset the navigation system to its initial state.
    Reset,

    /// Set the forward speed multiplier. Limited to `[1.0, 2.0]`.
    SetSpeedMultiplier {
        multiplier: f64,
    },

    /// Replace the forbidden areas. Each area is a list of `[x, y]` vertices.
    SetForbiddenAreas {
        areas: Vec<Vec<[f64; 2]>>,
    },

    /// Enable or disable autonomous mode.
    SetAutonomous {
        enabled: bool,
    },

    /// Drive the wheels directly. Only accepted when not autonomous.
    MoveManual {
        forward: f64,
        turn: f64,
    },

    /// Load the named map, replacing forbidden areas and points of interest.
    LoadMap {
        name: String,
    },
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        let val: Value = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        // Check the type first so unknown types get a clear error
        let tc_type = match val.get("type").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        if !TC_TYPES.contains(&tc_type.as_str()) {
            return Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", tc_type)
            ))
        }

        serde_json::from_value(val)
            .map_err(|e| TcParseError::InvalidPayload(tc_type, e))
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_json() {
        assert_eq!(
            Tc::from_json(r#"{"type": "NavigateAndReturn", "payload": {"x_m": 4, "y_m": 6.5}}"#)
                .unwrap(),
            Tc::NavigateAndReturn { x_m: 4.0, y_m: 6.5 }
        );
        assert_eq!(Tc::from_json(r#"{"type": "Reset"}"#).unwrap(), Tc::Reset);
        assert_eq!(
            Tc::from_json(
                r#"{"type": "SetForbiddenAreas", "payload": {"areas": [[[1, 1], [2, 1], [2, 2]]]}}"#
            ).unwrap(),
            Tc::SetForbiddenAreas {
                areas: vec![vec![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0]]]
            }
        );
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(Tc::from_json("{"), Err(TcParseError::InvalidJson(_))));
        assert!(matches!(
            Tc::from_json(r#"{"payload": {}}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "Teleport"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "MoveManual", "payload": {"forward": 0.5}}"#),
            Err(TcParseError::InvalidPayload(_, _))
        ));
    }

    #[test]
    fn test_json_matches_wire_format() {
        let tc = Tc::SetAutonomous { enabled: true };
        let json = tc.to_json().unwrap();

        assert_eq!(json, r#"{"type":"SetAutonomous","payload":{"enabled":true}}"#);
        assert_eq!(Tc::from_json(&json).unwrap(), tc);
    }
}
