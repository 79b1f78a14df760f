//! The entity store: normalized tables of states, edges, labels, control
//! points and tape cells, plus the editing mode flag.
//!
//! Entities never hold references to each other; an edge names its states by
//! id, a label names its edge, a control point names its edge. Every cross
//! reference is resolved through the accessors below, and every deletion
//! cascades so that a dangling id is never observable.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::overlay::Overlay;
use crate::snapshot::Snapshot;
use crate::tape::Tape;
use crate::types::{
    ControlPoint, ControlPointId, Direction, Edge, EdgeId, EngineError, Label, LabelFields,
    LabelId, Mode, State, StateId, MAX_MNEMONIC_LEN,
};
use crate::vector::Vector;

/// How far above its state a self-loop's control point starts.
pub const SELF_LOOP_OFFSET: f64 = 120.0;
/// How far a new control point is pushed off the chord between its endpoints,
/// so the label sits beside the arrow rather than on it.
pub const CONTROL_POINT_NUDGE: f64 = 1.0;

/// Everything the stepper needs to fire one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub label: LabelId,
    pub edge: EdgeId,
    pub control_point: ControlPointId,
    /// The state the machine moves to.
    pub target: StateId,
    pub write: char,
    pub direction: Direction,
}

/// The initial control point position for an edge between `start` and `end`.
pub fn initial_control_position(start: Vector, end: Vector, self_loop: bool) -> Vector {
    if self_loop {
        return start - Vector::new(0.0, SELF_LOOP_OFFSET);
    }
    let chord = end - start;
    start + chord.scale(0.5) + chord.unit_normal().scale(CONTROL_POINT_NUDGE)
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Overlay<Snapshot>,
    mode: Mode,
    next_id: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            entities: Overlay::new(snapshot),
            ..Self::default()
        }
    }

    // ---------------------------------------------------------------------
    // Buffers

    /// The tables as the view should display them, including any drag in progress.
    pub fn latest(&self) -> &Snapshot {
        self.entities.latest()
    }

    /// The tables as of the last completed command.
    pub fn committed(&self) -> &Snapshot {
        self.entities.committed()
    }

    /// A copy of the committed tables, never including a drag in progress.
    pub fn snapshot(&self) -> Snapshot {
        self.entities.committed().clone()
    }

    /// Replaces every table and discards any work in progress.
    pub fn install(&mut self, snapshot: Snapshot) {
        self.entities.replace(snapshot);
    }

    pub fn has_overlay(&self) -> bool {
        self.entities.has_wip()
    }

    pub(crate) fn begin_overlay(&mut self) -> &mut Snapshot {
        self.entities.begin()
    }

    pub(crate) fn overlay_mut(&mut self) -> Option<&mut Snapshot> {
        self.entities.wip_mut()
    }

    pub(crate) fn commit_overlay(&mut self) -> bool {
        self.entities.commit()
    }

    pub(crate) fn discard_overlay(&mut self) {
        self.entities.discard();
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!(?mode, "switching mode");
            self.mode = mode;
        }
    }

    // ---------------------------------------------------------------------
    // Queries

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.latest().states.values()
    }

    pub fn state(&self, id: &StateId) -> Result<&State, EngineError> {
        self.latest()
            .states
            .get(id)
            .ok_or_else(|| EngineError::UnknownState(id.clone()))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.latest().edges.values()
    }

    pub fn edge(&self, id: &EdgeId) -> Result<&Edge, EngineError> {
        self.latest()
            .edges
            .get(id)
            .ok_or_else(|| EngineError::UnknownEdge(id.clone()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.latest().labels.values()
    }

    pub fn label(&self, id: &LabelId) -> Result<&Label, EngineError> {
        self.latest()
            .labels
            .get(id)
            .ok_or_else(|| EngineError::UnknownLabel(id.clone()))
    }

    pub fn control_points(&self) -> impl Iterator<Item = &ControlPoint> {
        self.latest().control_points.values()
    }

    pub fn control_point(&self, id: &ControlPointId) -> Result<&ControlPoint, EngineError> {
        self.latest()
            .control_points
            .get(id)
            .ok_or_else(|| EngineError::UnknownControlPoint(id.clone()))
    }

    /// The control point of `edge`. Every edge has exactly one, so a missing
    /// control point is an inconsistency rather than a lookup failure.
    pub fn control_point_for_edge(&self, edge: &EdgeId) -> Result<&ControlPoint, EngineError> {
        self.latest()
            .control_points
            .values()
            .find(|cp| &cp.edge == edge)
            .ok_or_else(|| {
                EngineError::Inconsistency(format!("no control point for edge \"{edge}\""))
            })
    }

    pub fn edge_between(&self, start: &StateId, end: &StateId) -> Option<&Edge> {
        self.edges().find(|e| &e.start == start && &e.end == end)
    }

    pub fn edges_from<'a>(&'a self, state: &'a StateId) -> impl Iterator<Item = &'a Edge> {
        self.edges().filter(move |e| &e.start == state)
    }

    pub fn labels_for_edge<'a>(&'a self, edge: &'a EdgeId) -> impl Iterator<Item = &'a Label> {
        self.labels().filter(move |l| &l.edge == edge)
    }

    /// Every label, grouped by the edge it belongs to.
    pub fn labels_by_edge(&self) -> BTreeMap<EdgeId, Vec<&Label>> {
        let mut grouped: BTreeMap<EdgeId, Vec<&Label>> = BTreeMap::new();
        for label in self.labels() {
            grouped.entry(label.edge.clone()).or_default().push(label);
        }
        grouped
    }

    pub fn start_state(&self) -> Option<&StateId> {
        self.latest().start_state.as_ref()
    }

    pub fn has_start_state(&self) -> bool {
        self.start_state().is_some()
    }

    pub fn is_final(&self, id: &StateId) -> Result<bool, EngineError> {
        Ok(self.state(id)?.is_final)
    }

    pub fn tape(&self) -> &Tape {
        &self.latest().tape
    }

    pub fn name(&self) -> &str {
        &self.latest().metadata.name
    }

    /// Finds the transition leaving `state` that reads `symbol`.
    ///
    /// Under a deterministic machine at most one label matches; otherwise the
    /// first in id order wins. A label whose edge or control point is missing
    /// is reported as an [`EngineError::Inconsistency`].
    pub fn resolve(&self, state: &StateId, symbol: char) -> Result<Option<Resolved>, EngineError> {
        let outgoing: BTreeSet<&EdgeId> = self.edges_from(state).map(|e| &e.id).collect();
        let Some(label) = self
            .labels()
            .find(|l| outgoing.contains(&l.edge) && l.read == symbol)
        else {
            return Ok(None);
        };

        let edge = self.latest().edges.get(&label.edge).ok_or_else(|| {
            EngineError::Inconsistency(format!(
                "transition label \"{}\" references nonexistent edge \"{}\"",
                label.id, label.edge
            ))
        })?;
        let control_point = self.control_point_for_edge(&edge.id)?;

        Ok(Some(Resolved {
            label: label.id.clone(),
            edge: edge.id.clone(),
            control_point: control_point.id.clone(),
            target: edge.end.clone(),
            write: label.write,
            direction: label.direction,
        }))
    }

    // ---------------------------------------------------------------------
    // Commands. Each one applies to the committed tables and drops any overlay.

    fn issue_id<K, V>(next_id: &mut u64, prefix: &str, table: &BTreeMap<K, V>) -> K
    where
        K: Ord + for<'a> From<&'a str>,
    {
        loop {
            *next_id += 1;
            let candidate = K::from(format!("{prefix}{next_id}").as_str());
            if !table.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn add_state(&mut self, position: Vector) -> StateId {
        let tables = self.entities.committed_mut();
        let id: StateId = Self::issue_id(&mut self.next_id, StateId::PREFIX, &tables.states);
        tables.states.insert(
            id.clone(),
            State {
                id: id.clone(),
                mnemonic: String::new(),
                position,
                is_final: false,
            },
        );
        debug!(state = %id, "added state");
        id
    }

    /// Deletes `ids` together with every edge touching them and the labels and
    /// control points of those edges. Clears the start state if it was deleted.
    pub fn delete_states(&mut self, ids: &[StateId]) -> Result<(), EngineError> {
        for id in ids {
            self.state(id)?;
        }

        let doomed_edges: BTreeSet<EdgeId> = self
            .edges()
            .filter(|e| ids.iter().any(|id| e.touches(id)))
            .map(|e| e.id.clone())
            .collect();

        let tables = self.entities.committed_mut();
        Self::remove_edges(tables, &doomed_edges);
        for id in ids {
            tables.states.remove(id);
        }
        if tables
            .start_state
            .as_ref()
            .is_some_and(|start| ids.contains(start))
        {
            tables.start_state = None;
        }
        debug!(states = ?ids, edges = doomed_edges.len(), "deleted states");
        Ok(())
    }

    fn remove_edges(tables: &mut Snapshot, edges: &BTreeSet<EdgeId>) {
        tables.edges.retain(|id, _| !edges.contains(id));
        tables.labels.retain(|_, l| !edges.contains(&l.edge));
        tables.control_points.retain(|_, cp| !edges.contains(&cp.edge));
    }

    /// Renames a state. Returns whether the mnemonic actually changed.
    pub fn rename_state(&mut self, id: &StateId, mnemonic: &str) -> Result<bool, EngineError> {
        if mnemonic.chars().count() > MAX_MNEMONIC_LEN {
            return Err(EngineError::InvalidMnemonic(mnemonic.to_string()));
        }
        if self.state(id)?.mnemonic == mnemonic {
            return Ok(false);
        }
        if let Some(state) = self.entities.committed_mut().states.get_mut(id) {
            state.mnemonic = mnemonic.to_string();
        }
        Ok(true)
    }

    pub fn set_start_state(&mut self, id: Option<&StateId>) -> Result<(), EngineError> {
        if let Some(id) = id {
            self.state(id)?;
        }
        self.entities.committed_mut().start_state = id.cloned();
        Ok(())
    }

    /// Toggles the final flag of a group of states: if any of them is final,
    /// all become non-final; otherwise all become final.
    pub fn toggle_final(&mut self, ids: &[StateId]) -> Result<(), EngineError> {
        let mut any_final = false;
        for id in ids {
            any_final |= self.state(id)?.is_final;
        }
        let tables = self.entities.committed_mut();
        for id in ids {
            if let Some(state) = tables.states.get_mut(id) {
                state.is_final = !any_final;
            }
        }
        Ok(())
    }

    /// Returns the edge from `start` to `end`, creating it (with its control
    /// point) if it does not exist yet.
    pub fn ensure_edge(&mut self, start: &StateId, end: &StateId) -> Result<EdgeId, EngineError> {
        let start_pos = self.state(start)?.position;
        let end_pos = self.state(end)?.position;
        if let Some(edge) = self.edge_between(start, end) {
            return Ok(edge.id.clone());
        }

        let tables = self.entities.committed_mut();
        let id: EdgeId = Self::issue_id(&mut self.next_id, EdgeId::PREFIX, &tables.edges);
        let edge = Edge {
            id: id.clone(),
            start: start.clone(),
            end: end.clone(),
        };
        let control_position = initial_control_position(start_pos, end_pos, edge.is_self_loop());
        tables.edges.insert(id.clone(), edge);

        let cp_id: ControlPointId = Self::issue_id(
            &mut self.next_id,
            ControlPointId::PREFIX,
            &tables.control_points,
        );
        tables.control_points.insert(
            cp_id.clone(),
            ControlPoint {
                id: cp_id,
                edge: id.clone(),
                position: control_position,
            },
        );
        debug!(edge = %id, %start, %end, "added edge");
        Ok(id)
    }

    pub fn add_label(&mut self, edge: &EdgeId, fields: LabelFields) -> Result<LabelId, EngineError> {
        self.edge(edge)?;
        let tables = self.entities.committed_mut();
        let id: LabelId = Self::issue_id(&mut self.next_id, LabelId::PREFIX, &tables.labels);
        tables.labels.insert(
            id.clone(),
            Label {
                id: id.clone(),
                edge: edge.clone(),
                read: fields.read,
                write: fields.write,
                direction: fields.direction,
            },
        );
        debug!(label = %id, %edge, "added label");
        Ok(id)
    }

    /// Adds a transition from `start` to `end`, reusing the edge between them
    /// if there is one.
    pub fn add_transition(
        &mut self,
        start: &StateId,
        end: &StateId,
        fields: LabelFields,
    ) -> Result<LabelId, EngineError> {
        let edge = self.ensure_edge(start, end)?;
        self.add_label(&edge, fields)
    }

    pub fn update_label(&mut self, id: &LabelId, fields: LabelFields) -> Result<(), EngineError> {
        self.label(id)?;
        if let Some(label) = self.entities.committed_mut().labels.get_mut(id) {
            label.read = fields.read;
            label.write = fields.write;
            label.direction = fields.direction;
        }
        Ok(())
    }

    /// Deletes a label. Deleting the last label of an edge also deletes the
    /// edge and its control point.
    pub fn delete_label(&mut self, id: &LabelId) -> Result<(), EngineError> {
        let edge = self.label(id)?.edge.clone();
        let remaining = self.labels_for_edge(&edge).filter(|l| &l.id != id).count();

        if remaining == 0 {
            return self.delete_edge(&edge);
        }
        self.entities.committed_mut().labels.remove(id);
        Ok(())
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> Result<(), EngineError> {
        self.edge(id)?;
        let doomed = BTreeSet::from([id.clone()]);
        Self::remove_edges(self.entities.committed_mut(), &doomed);
        debug!(edge = %id, "deleted edge");
        Ok(())
    }

    /// Sets (or with `None`, clears) one tape cell.
    pub fn write_cell(&mut self, index: i64, symbol: Option<char>) {
        let tape = &mut self.entities.committed_mut().tape;
        match symbol {
            Some(symbol) => tape.write(index, symbol),
            None => tape.clear(index),
        }
    }

    pub(crate) fn replace_tape(&mut self, tape: Tape) {
        self.entities.committed_mut().tape = tape;
    }

    pub fn set_name(&mut self, name: &str) {
        self.entities.committed_mut().metadata.name = name.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::find_duplicates;
    use proptest::prelude::*;

    fn fields(read: char, write: char, direction: Direction) -> LabelFields {
        LabelFields::new(read, write, direction)
    }

    fn two_state_store() -> (EntityStore, StateId, StateId, LabelId) {
        let mut store = EntityStore::new();
        let q0 = store.add_state(Vector::new(100.0, 100.0));
        let q1 = store.add_state(Vector::new(300.0, 100.0));
        let label = store
            .add_transition(&q0, &q1, fields('A', 'B', Direction::Right))
            .unwrap();
        store.set_start_state(Some(&q0)).unwrap();
        store.toggle_final(std::slice::from_ref(&q1)).unwrap();
        (store, q0, q1, label)
    }

    fn assert_referential_integrity(store: &EntityStore) {
        let tables = store.committed();
        for edge in tables.edges.values() {
            assert!(tables.states.contains_key(&edge.start));
            assert!(tables.states.contains_key(&edge.end));
            let cps = tables
                .control_points
                .values()
                .filter(|cp| cp.edge == edge.id)
                .count();
            assert_eq!(cps, 1, "edge {} has {} control points", edge.id, cps);
        }
        for label in tables.labels.values() {
            assert!(tables.edges.contains_key(&label.edge));
        }
        for cp in tables.control_points.values() {
            assert!(tables.edges.contains_key(&cp.edge));
        }
        if let Some(start) = &tables.start_state {
            assert!(tables.states.contains_key(start));
        }
    }

    #[test]
    fn test_add_transition_reuses_edge() {
        let (mut store, q0, q1, _) = two_state_store();
        store
            .add_transition(&q0, &q1, fields('C', 'D', Direction::Left))
            .unwrap();

        assert_eq!(store.edges().count(), 1);
        assert_eq!(store.control_points().count(), 1);
        assert_eq!(store.labels().count(), 2);

        store
            .add_transition(&q1, &q0, fields('C', 'D', Direction::Left))
            .unwrap();
        assert_eq!(store.edges().count(), 2);
    }

    #[test]
    fn test_initial_control_point_positions() {
        let mut store = EntityStore::new();
        let a = store.add_state(Vector::new(0.0, 0.0));
        let b = store.add_state(Vector::new(200.0, 0.0));

        let edge = store.ensure_edge(&a, &b).unwrap();
        let cp = store.control_point_for_edge(&edge).unwrap().position;
        assert!(cp.approx_eq(Vector::new(100.0, 1.0), 1e-9));

        let loop_edge = store.ensure_edge(&a, &a).unwrap();
        let cp = store.control_point_for_edge(&loop_edge).unwrap().position;
        assert_eq!(cp, Vector::new(0.0, -SELF_LOOP_OFFSET));
    }

    #[test]
    fn test_coincident_states_get_default_direction() {
        let pos = initial_control_position(Vector::new(5.0, 5.0), Vector::new(5.0, 5.0), false);
        assert_eq!(pos, Vector::new(5.0, 4.0));
    }

    #[test]
    fn test_delete_start_state_cascades() {
        let (mut store, q0, q1, label) = two_state_store();
        store.delete_states(std::slice::from_ref(&q0)).unwrap();

        assert_eq!(store.edges().count(), 0);
        assert_eq!(store.control_points().count(), 0);
        assert!(store.label(&label).is_err());
        assert_eq!(store.start_state(), None);
        assert!(store.state(&q1).is_ok());
    }

    #[test]
    fn test_delete_unknown_state_is_rejected_atomically() {
        let (mut store, q0, _, _) = two_state_store();
        let result = store.delete_states(&[q0.clone(), StateId::from("nope")]);
        assert_eq!(result, Err(EngineError::UnknownState(StateId::from("nope"))));
        assert!(store.state(&q0).is_ok());
    }

    #[test]
    fn test_delete_last_label_removes_edge() {
        let (mut store, q0, q1, label) = two_state_store();
        let second = store
            .add_transition(&q0, &q1, fields('X', 'Y', Direction::Left))
            .unwrap();

        store.delete_label(&label).unwrap();
        assert_eq!(store.edges().count(), 1);

        store.delete_label(&second).unwrap();
        assert_eq!(store.edges().count(), 0);
        assert_eq!(store.control_points().count(), 0);
    }

    #[test]
    fn test_toggle_final_selection() {
        let mut store = EntityStore::new();
        let a = store.add_state(Vector::ZERO);
        let b = store.add_state(Vector::ZERO);
        let both = [a.clone(), b.clone()];

        store.toggle_final(&both).unwrap();
        assert!(store.is_final(&a).unwrap() && store.is_final(&b).unwrap());

        store.toggle_final(std::slice::from_ref(&a)).unwrap();
        assert!(!store.is_final(&a).unwrap());

        // b is still final, so the whole group becomes non-final
        store.toggle_final(&both).unwrap();
        assert!(!store.is_final(&a).unwrap() && !store.is_final(&b).unwrap());
    }

    #[test]
    fn test_rename_state() {
        let mut store = EntityStore::new();
        let a = store.add_state(Vector::ZERO);

        assert_eq!(store.rename_state(&a, "halt"), Ok(true));
        assert_eq!(store.rename_state(&a, "halt"), Ok(false));
        assert!(matches!(
            store.rename_state(&a, "accept"),
            Err(EngineError::InvalidMnemonic(_))
        ));
        assert_eq!(store.state(&a).unwrap().mnemonic, "halt");
    }

    #[test]
    fn test_resolve() {
        let (store, q0, q1, label) = two_state_store();

        let resolved = store.resolve(&q0, 'A').unwrap().unwrap();
        assert_eq!(resolved.label, label);
        assert_eq!(resolved.target, q1);
        assert_eq!(resolved.write, 'B');
        assert_eq!(resolved.direction, Direction::Right);

        assert_eq!(store.resolve(&q0, 'C').unwrap(), None);
        assert_eq!(store.resolve(&q1, 'A').unwrap(), None);
    }

    #[test]
    fn test_resolve_reports_inconsistency() {
        let (mut store, q0, _, _) = two_state_store();
        let edge = store.edges().next().unwrap().id.clone();
        store
            .entities
            .committed_mut()
            .control_points
            .retain(|_, cp| cp.edge != edge);

        assert!(matches!(
            store.resolve(&q0, 'A'),
            Err(EngineError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_ids_are_not_reissued() {
        let mut store = EntityStore::new();
        let a = store.add_state(Vector::ZERO);
        store.delete_states(std::slice::from_ref(&a)).unwrap();
        let b = store.add_state(Vector::ZERO);
        assert_ne!(a, b);
    }

    #[test]
    fn test_issued_ids_skip_existing() {
        let mut snapshot = Snapshot::default();
        snapshot.states.insert(
            StateId::from("s1"),
            State {
                id: StateId::from("s1"),
                mnemonic: String::new(),
                position: Vector::ZERO,
                is_final: false,
            },
        );
        let mut store = EntityStore::from_snapshot(snapshot);
        assert_eq!(store.add_state(Vector::ZERO), StateId::from("s2"));
    }

    #[test]
    fn test_commands_drop_overlay() {
        let (mut store, q0, _, _) = two_state_store();
        store.begin_overlay().states.get_mut(&q0).unwrap().position = Vector::new(9.0, 9.0);
        assert!(store.has_overlay());

        store.set_name("busy beaver");
        assert!(!store.has_overlay());
        assert_eq!(store.state(&q0).unwrap().position, Vector::new(100.0, 100.0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddState,
        DeleteState(usize),
        AddTransition(usize, usize, char),
        DeleteLabel(usize),
        SetStart(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::AddState),
            (0..8usize).prop_map(Op::DeleteState),
            (0..8usize, 0..8usize, prop::sample::select(vec!['0', '1', 'A']))
                .prop_map(|(a, b, c)| Op::AddTransition(a, b, c)),
            (0..8usize).prop_map(Op::DeleteLabel),
            (0..8usize).prop_map(Op::SetStart),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn referential_integrity_holds(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut store = EntityStore::new();
            for op in ops {
                let states: Vec<StateId> = store.states().map(|s| s.id.clone()).collect();
                let labels: Vec<LabelId> = store.labels().map(|l| l.id.clone()).collect();
                match op {
                    Op::AddState => {
                        store.add_state(Vector::new(states.len() as f64 * 50.0, 0.0));
                    }
                    Op::DeleteState(i) if !states.is_empty() => {
                        let id = states[i % states.len()].clone();
                        store.delete_states(&[id]).unwrap();
                    }
                    Op::AddTransition(a, b, read) if !states.is_empty() => {
                        let start = &states[a % states.len()];
                        let end = &states[b % states.len()];
                        store.add_transition(start, end, fields(read, read, Direction::Left)).unwrap();
                    }
                    Op::DeleteLabel(i) if !labels.is_empty() => {
                        store.delete_label(&labels[i % labels.len()]).unwrap();
                    }
                    Op::SetStart(i) if !states.is_empty() => {
                        store.set_start_state(Some(&states[i % states.len()])).unwrap();
                    }
                    _ => {}
                }
                assert_referential_integrity(&store);
            }
        }

        #[test]
        fn resolve_is_unique_without_duplicates(
            reads in prop::collection::vec(prop::sample::select(vec!['0', '1', 'A', 'B']), 1..8),
            symbol in prop::sample::select(vec!['0', '1', 'A', 'B', ' ']),
        ) {
            let mut store = EntityStore::new();
            let source = store.add_state(Vector::ZERO);
            let targets: Vec<StateId> = (0..3).map(|i| store.add_state(Vector::new(i as f64, 1.0))).collect();
            for (i, read) in reads.iter().enumerate() {
                store
                    .add_transition(&source, &targets[i % targets.len()], fields(*read, *read, Direction::Right))
                    .unwrap();
            }

            let matching = store
                .labels()
                .filter(|l| l.read == symbol && store.edge(&l.edge).unwrap().start == source)
                .count();
            if find_duplicates(store.committed()).is_empty() {
                prop_assert!(matching <= 1);
                if matching == 1 {
                    prop_assert!(store.resolve(&source, symbol).unwrap().is_some());
                }
            }
        }
    }
}
