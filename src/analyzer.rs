//! This module provides functions for analyzing a machine before it runs or
//! after it is imported: the determinism check, the pre-run validation, a
//! reachability lint, and the referential integrity check applied to
//! snapshots that come from outside the engine.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use thiserror::Error;

use crate::snapshot::Snapshot;
use crate::types::{LabelId, StateId, MAX_MNEMONIC_LEN};

/// Conditions that make a machine unfit to run or to install.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum AnalysisError {
    /// No state has been designated as the start state.
    #[error("Missing start state")]
    MissingStartState,
    /// Labels leaving the same state share a read symbol.
    #[error("Nondeterministic transitions: {0:?}")]
    NondeterministicTransitions(Vec<LabelId>),
    /// Some cross reference points at an entity that does not exist.
    #[error("Dangling reference: {0}")]
    DanglingReference(String),
    /// An edge has no control point or more than one.
    #[error("Edge {0} must have exactly one control point, found {1}")]
    ControlPointCount(String, usize),
    /// Two edges connect the same ordered pair of states.
    #[error("More than one edge from {0} to {1}")]
    DuplicateEdge(StateId, StateId),
    #[error("State {0} has a mnemonic longer than {} characters", MAX_MNEMONIC_LEN)]
    InvalidMnemonic(StateId),
}

/// Returns the id of every label that shares its read symbol with another
/// label leaving the same state.
///
/// Labels are grouped by the source state of their edge, then by read
/// symbol; every member of a group larger than one is reported. Labels whose
/// edge does not exist are ignored here and reported by [`check_references`].
pub fn find_duplicates(snapshot: &Snapshot) -> BTreeSet<LabelId> {
    let mut groups: BTreeMap<(&StateId, char), Vec<&LabelId>> = BTreeMap::new();
    for label in snapshot.labels.values() {
        if let Some(edge) = snapshot.edges.get(&label.edge) {
            groups
                .entry((&edge.start, label.read))
                .or_default()
                .push(&label.id);
        }
    }

    groups
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .cloned()
        .collect()
}

/// Checks whether a machine may start simulating.
///
/// The checks run in order and the first failure is returned: a missing start
/// state, then nondeterministic transitions.
pub fn analyze(snapshot: &Snapshot) -> Result<(), AnalysisError> {
    [check_start_state, check_determinism]
        .iter()
        .try_for_each(|check| check(snapshot))
}

fn check_start_state(snapshot: &Snapshot) -> Result<(), AnalysisError> {
    match &snapshot.start_state {
        Some(start) if snapshot.states.contains_key(start) => Ok(()),
        _ => Err(AnalysisError::MissingStartState),
    }
}

fn check_determinism(snapshot: &Snapshot) -> Result<(), AnalysisError> {
    let duplicates = find_duplicates(snapshot);
    if !duplicates.is_empty() {
        return Err(AnalysisError::NondeterministicTransitions(
            duplicates.into_iter().collect(),
        ));
    }
    Ok(())
}

/// Returns the states that cannot be reached from the start state through any
/// sequence of transitions, in id order. Edges without labels never fire and
/// are not followed. Without a start state, nothing is reported.
pub fn unreachable_states(snapshot: &Snapshot) -> Vec<StateId> {
    let Some(start) = &snapshot.start_state else {
        return Vec::new();
    };

    let live_edges: HashSet<_> = snapshot.labels.values().map(|l| &l.edge).collect();
    let mut visited = HashSet::new();
    let mut queue = vec![start];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }
        for edge in snapshot.edges.values() {
            if &edge.start == state && live_edges.contains(&edge.id) && !visited.contains(&edge.end)
            {
                queue.push(&edge.end);
            }
        }
    }

    snapshot
        .states
        .keys()
        .filter(|id| !visited.contains(id))
        .cloned()
        .collect()
}

/// Verifies that every cross reference in `snapshot` resolves, that each edge
/// has exactly one control point and is the only edge for its pair of states,
/// and that mnemonics fit.
///
/// The engine itself never produces a snapshot that fails this check; it is
/// meant for snapshots read from files or storage before they are installed.
pub fn check_references(snapshot: &Snapshot) -> Result<(), AnalysisError> {
    for (key, state) in &snapshot.states {
        if key != &state.id {
            return Err(AnalysisError::DanglingReference(format!(
                "state stored under \"{key}\" has id \"{}\"",
                state.id
            )));
        }
        if state.mnemonic.chars().count() > MAX_MNEMONIC_LEN {
            return Err(AnalysisError::InvalidMnemonic(state.id.clone()));
        }
    }

    if let Some(start) = &snapshot.start_state {
        if !snapshot.states.contains_key(start) {
            return Err(AnalysisError::DanglingReference(format!(
                "start state \"{start}\" does not exist"
            )));
        }
    }

    let mut pairs = HashSet::new();
    for (key, edge) in &snapshot.edges {
        if key != &edge.id {
            return Err(AnalysisError::DanglingReference(format!(
                "edge stored under \"{key}\" has id \"{}\"",
                edge.id
            )));
        }
        for endpoint in [&edge.start, &edge.end] {
            if !snapshot.states.contains_key(endpoint) {
                return Err(AnalysisError::DanglingReference(format!(
                    "edge \"{}\" references nonexistent state \"{endpoint}\"",
                    edge.id
                )));
            }
        }
        if !pairs.insert((&edge.start, &edge.end)) {
            return Err(AnalysisError::DuplicateEdge(
                edge.start.clone(),
                edge.end.clone(),
            ));
        }
        let control_points = snapshot
            .control_points
            .values()
            .filter(|cp| cp.edge == edge.id)
            .count();
        if control_points != 1 {
            return Err(AnalysisError::ControlPointCount(
                edge.id.to_string(),
                control_points,
            ));
        }
    }

    for (key, label) in &snapshot.labels {
        if key != &label.id || !snapshot.edges.contains_key(&label.edge) {
            return Err(AnalysisError::DanglingReference(format!(
                "transition label \"{key}\" references nonexistent edge \"{}\"",
                label.edge
            )));
        }
    }

    for (key, cp) in &snapshot.control_points {
        if key != &cp.id || !snapshot.edges.contains_key(&cp.edge) {
            return Err(AnalysisError::DanglingReference(format!(
                "control point \"{key}\" references nonexistent edge \"{}\"",
                cp.edge
            )));
        }
    }

    Ok(())
}
