//! The serialized form of a machine: one table per entity kind, keyed by id.
//!
//! A [`Snapshot`] is also what the entity store keeps as its committed buffer,
//! so taking a snapshot is a clone and installing one is a replace.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tape::Tape;
use crate::types::{
    ControlPoint, ControlPointId, Edge, EdgeId, EngineError, Label, LabelId, Metadata, State,
    StateId,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub states: BTreeMap<StateId, State>,
    #[serde(default)]
    pub start_state: Option<StateId>,
    #[serde(default)]
    pub edges: BTreeMap<EdgeId, Edge>,
    #[serde(default)]
    pub labels: BTreeMap<LabelId, Label>,
    #[serde(default)]
    pub control_points: BTreeMap<ControlPointId, ControlPoint>,
    #[serde(default)]
    pub tape: Tape,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Snapshot {
    /// Parses a snapshot from JSON text. Only the shape is checked here;
    /// referential integrity is checked by [`crate::analyzer::check_references`].
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(|e| EngineError::SnapshotFormat(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::SnapshotFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use crate::vector::Vector;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::default();
        let q0 = StateId::from("q0");
        snapshot.states.insert(
            q0.clone(),
            State {
                id: q0.clone(),
                mnemonic: "q0".to_string(),
                position: Vector::new(100.0, 100.0),
                is_final: false,
            },
        );
        let edge = EdgeId::from("q0->q0");
        snapshot.edges.insert(
            edge.clone(),
            Edge {
                id: edge.clone(),
                start: q0.clone(),
                end: q0.clone(),
            },
        );
        snapshot.labels.insert(
            LabelId::from("q0->q0.0"),
            Label {
                id: LabelId::from("q0->q0.0"),
                edge: edge.clone(),
                read: '1',
                write: '0',
                direction: Direction::Left,
            },
        );
        snapshot.control_points.insert(
            ControlPointId::from("c"),
            ControlPoint {
                id: ControlPointId::from("c"),
                edge,
                position: Vector::new(100.0, -20.0),
            },
        );
        snapshot.start_state = Some(q0);
        snapshot.tape.write(0, '1');
        snapshot
    }

    #[test]
    fn test_json_keys() {
        let json: serde_json::Value = serde_json::to_value(sample()).unwrap();
        for key in [
            "states",
            "startState",
            "edges",
            "labels",
            "controlPoints",
            "tape",
            "metadata",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["tape"]["0"], "1");
        assert_eq!(json["metadata"]["name"], "Untitled");
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = sample();
        let text = snapshot.to_json().unwrap();
        assert_eq!(Snapshot::from_json(&text).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_tables_default_to_empty() {
        let snapshot = Snapshot::from_json("{}").unwrap();
        assert!(snapshot.states.is_empty());
        assert_eq!(snapshot.start_state, None);
    }

    #[test]
    fn test_malformed_json() {
        let result = Snapshot::from_json("{ \"states\": 3 }");
        assert!(matches!(result, Err(EngineError::SnapshotFormat(_))));
    }
}
