//! This module defines the core data structures and types used throughout the engine:
//! entity ids, the state/edge/label/control-point records, the editing mode and the
//! error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::analyzer::AnalysisError;
use crate::vector::Vector;

/// The blank symbol. A tape cell holding no symbol reads as this character.
pub const BLANK_SYMBOL: char = ' ';
/// The maximum number of characters in a state's mnemonic.
pub const MAX_MNEMONIC_LEN: usize = 4;
/// The maximum number of steps `run_to_halt` executes before giving up.
pub const MAX_EXECUTION_STEPS: usize = 10000;
/// The machine name used when none has been chosen.
pub const DEFAULT_MACHINE_NAME: &str = "Untitled";

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Prefix used for ids issued by the store.
            pub const PREFIX: &'static str = $prefix;

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

entity_id!(
    /// Identifies a machine state.
    StateId,
    "s"
);
entity_id!(
    /// Identifies an edge (the arrow between two states).
    EdgeId,
    "e"
);
entity_id!(
    /// Identifies a transition label.
    LabelId,
    "l"
);
entity_id!(
    /// Identifies the control point of an edge.
    ControlPointId,
    "c"
);

/// A machine state, drawn as a node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: StateId,
    /// A short name (at most [`MAX_MNEMONIC_LEN`] characters) that makes the state's purpose clearer.
    pub mnemonic: String,
    pub position: Vector,
    pub is_final: bool,
}

/// A directed relation between two states. `start == end` is a self-loop.
///
/// All labels between the same ordered pair of states share one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub start: StateId,
    pub end: StateId,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.start == self.end
    }

    pub fn touches(&self, state: &StateId) -> bool {
        &self.start == state || &self.end == state
    }
}

/// The read/write/move triple governing one transition along an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub edge: EdgeId,
    pub read: char,
    pub write: char,
    #[serde(rename = "move")]
    pub direction: Direction,
}

/// The editable part of a [`Label`], used by commands that create or change labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelFields {
    pub read: char,
    pub write: char,
    pub direction: Direction,
}

impl LabelFields {
    pub fn new(read: char, write: char, direction: Direction) -> Self {
        Self {
            read,
            write,
            direction,
        }
    }
}

impl From<&Label> for LabelFields {
    fn from(label: &Label) -> Self {
        Self::new(label.read, label.write, label.direction)
    }
}

/// The curve-shape handle of an edge. Exactly one exists per edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub id: ControlPointId,
    pub edge: EdgeId,
    pub position: Vector,
}

/// The direction a transition moves the head. Serialized as `"L"` / `"R"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "L", alias = "Left")]
    Left,
    #[serde(rename = "R", alias = "Right")]
    Right,
}

impl Direction {
    /// How the head index changes when this move is applied.
    ///
    /// The head is drawn at a fixed position and the tape scrolls beneath it,
    /// so a move to the right shifts the tape left: `Right` lowers the index
    /// and `Left` raises it.
    pub fn head_delta(self) -> i64 {
        match self {
            Direction::Left => 1,
            Direction::Right => -1,
        }
    }
}

/// Machine-wide descriptive data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_MACHINE_NAME.to_string(),
        }
    }
}

/// Whether the machine can currently be edited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Editing,
    /// A simulation is running; every editing command is refused.
    Simulating,
}

/// Represents the errors that engine commands and queries can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Unknown state: {0}")]
    UnknownState(StateId),
    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),
    #[error("Unknown transition label: {0}")]
    UnknownLabel(LabelId),
    #[error("Unknown control point: {0}")]
    UnknownControlPoint(ControlPointId),
    /// A command that edits the machine was issued while a simulation is running.
    #[error("The machine cannot be edited while a simulation is running")]
    NotEditable,
    #[error("Mnemonic '{0}' is longer than {} characters", MAX_MNEMONIC_LEN)]
    InvalidMnemonic(String),
    /// A cross reference points at an entity that does not exist. This is
    /// always a bug in an earlier command, never a user error.
    #[error("Inconsistency in machine state: {0}")]
    Inconsistency(String),
    #[error("Machine validation error: {0}")]
    Validation(#[from] AnalysisError),
    #[error("File error: {0}")]
    FileError(String),
    #[error("Unknown sample: {0}")]
    UnknownSample(String),
    /// The sample registry lock was poisoned by a panicking writer.
    #[error("Sample registry unavailable: {0}")]
    SampleRegistry(String),
    #[error("Malformed snapshot: {0}")]
    SnapshotFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serialization() {
        let left_json = serde_json::to_string(&Direction::Left).unwrap();
        let right_json = serde_json::to_string(&Direction::Right).unwrap();

        assert_eq!(left_json, "\"L\"");
        assert_eq!(right_json, "\"R\"");

        let left: Direction = serde_json::from_str("\"Left\"").unwrap();
        let right: Direction = serde_json::from_str(&right_json).unwrap();
        assert_eq!(left, Direction::Left);
        assert_eq!(right, Direction::Right);
    }

    #[test]
    fn test_head_delta_is_inverted() {
        assert_eq!(Direction::Right.head_delta(), -1);
        assert_eq!(Direction::Left.head_delta(), 1);
    }

    #[test]
    fn test_label_serialization_uses_move_key() {
        let label = Label {
            id: LabelId::from("l1"),
            edge: EdgeId::from("e1"),
            read: 'A',
            write: 'B',
            direction: Direction::Right,
        };
        let json = serde_json::to_value(&label).unwrap();
        assert_eq!(json["move"], "R");
        assert_eq!(json["read"], "A");
        assert_eq!(json["edge"], "e1");
    }

    #[test]
    fn test_state_serialization_is_camel_case() {
        let state = State {
            id: StateId::from("q0"),
            mnemonic: "q0".to_string(),
            position: Vector::new(1.0, 2.0),
            is_final: true,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["isFinal"], true);
        assert_eq!(json["position"]["x"], 1.0);
    }

    #[test]
    fn test_error_display() {
        let error = EngineError::UnknownState(StateId::from("q9"));
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Unknown state"));
        assert!(error_msg.contains("q9"));
    }
}
