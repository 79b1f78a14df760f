//! This module defines the `Machine` struct, the single entry point a view
//! layer talks to. It owns the entity store, the selection, the gesture in
//! progress, the undo log and the simulator, and records every editing command
//! in the undo log.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::{debug, info};

use crate::analyzer::{find_duplicates, unreachable_states};
use crate::config::{EngineConfig, SimConfig};
use crate::drag::{DragEngine, Release};
use crate::history::History;
use crate::simulator::{HaltReport, Highlights, RunMode, RunOutcome, SimCursor, SimEvent, Simulator};
use crate::snapshot::Snapshot;
use crate::store::EntityStore;
use crate::tape::TapeCell;
use crate::types::{
    ControlPointId, Edge, EdgeId, EngineError, Label, LabelFields, LabelId, Mode, State, StateId,
};
use crate::vector::Vector;

/// An editable, simulatable Turing machine.
#[derive(Debug, Clone)]
pub struct Machine {
    store: EntityStore,
    /// Selected states in selection order.
    selection: Vec<StateId>,
    drag: DragEngine,
    history: History,
    simulator: Simulator,
    duplicates: BTreeSet<LabelId>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Machine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: EntityStore::new(),
            selection: Vec::new(),
            drag: DragEngine::new(),
            history: History::new(config.history_limit),
            simulator: Simulator::new(config.sim),
            duplicates: BTreeSet::new(),
        }
    }

    /// Creates a machine from a snapshot that is known to be well formed.
    pub fn from_snapshot(snapshot: Snapshot, config: EngineConfig) -> Self {
        let mut machine = Self::new(config);
        machine.store = EntityStore::from_snapshot(snapshot);
        machine.refresh();
        machine
    }

    fn ensure_editable(&self) -> Result<(), EngineError> {
        match self.store.mode() {
            Mode::Editing => Ok(()),
            Mode::Simulating => Err(EngineError::NotEditable),
        }
    }

    /// Runs an editing command against the committed tables and records the
    /// tables as they were before it in the undo log.
    fn record<T>(
        &mut self,
        description: &str,
        command: impl FnOnce(&mut EntityStore) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.ensure_editable()?;
        self.drag.abandon(&mut self.store);

        let before = self.store.snapshot();
        let value = command(&mut self.store)?;
        self.history.push(before, description);
        debug!(description, "command recorded");

        self.refresh();
        Ok(value)
    }

    fn refresh(&mut self) {
        let tables = self.store.committed();
        self.selection.retain(|id| tables.states.contains_key(id));
        self.duplicates = find_duplicates(tables);
    }

    // ---------------------------------------------------------------------
    // States

    pub fn add_state(&mut self, position: Vector) -> Result<StateId, EngineError> {
        self.record("add state", |store| Ok(store.add_state(position)))
    }

    pub fn delete_states(&mut self, ids: &[StateId]) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.record("delete states", |store| store.delete_states(ids))
    }

    pub fn delete_selected(&mut self) -> Result<(), EngineError> {
        let selection = self.selection.clone();
        self.delete_states(&selection)
    }

    /// Renames a state. Renaming to the current mnemonic is not recorded.
    pub fn rename_state(&mut self, id: &StateId, mnemonic: &str) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.drag.abandon(&mut self.store);

        let before = self.store.snapshot();
        if self.store.rename_state(id, mnemonic)? {
            self.history.push(before, "rename state");
        }
        Ok(())
    }

    pub fn set_start_state(&mut self, id: &StateId) -> Result<(), EngineError> {
        self.record("set start state", |store| store.set_start_state(Some(id)))
    }

    pub fn clear_start_state(&mut self) -> Result<(), EngineError> {
        self.record("clear start state", |store| store.set_start_state(None))
    }

    /// Makes the first selected state the start state.
    pub fn set_start_selected(&mut self) -> Result<(), EngineError> {
        match self.selection.first().cloned() {
            Some(id) => self.set_start_state(&id),
            None => Ok(()),
        }
    }

    pub fn toggle_final(&mut self, ids: &[StateId]) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.record("toggle final", |store| store.toggle_final(ids))
    }

    pub fn toggle_final_selected(&mut self) -> Result<(), EngineError> {
        let selection = self.selection.clone();
        self.toggle_final(&selection)
    }

    // ---------------------------------------------------------------------
    // Transitions

    pub fn add_transition(
        &mut self,
        start: &StateId,
        end: &StateId,
        fields: LabelFields,
    ) -> Result<LabelId, EngineError> {
        self.record("add transition", |store| {
            store.add_transition(start, end, fields)
        })
    }

    /// Adds a transition from the first selected state to the second, or a
    /// self-loop when exactly one state is selected. Returns `None` when the
    /// selection is empty or holds more than two states.
    pub fn add_transition_between_selected(
        &mut self,
        fields: LabelFields,
    ) -> Result<Option<LabelId>, EngineError> {
        let (start, end) = match self.selection.as_slice() {
            [only] => (only.clone(), only.clone()),
            [first, second] => (first.clone(), second.clone()),
            _ => return Ok(None),
        };
        self.add_transition(&start, &end, fields).map(Some)
    }

    pub fn add_label(&mut self, edge: &EdgeId, fields: LabelFields) -> Result<LabelId, EngineError> {
        self.record("add label", |store| store.add_label(edge, fields))
    }

    pub fn update_label(&mut self, id: &LabelId, fields: LabelFields) -> Result<(), EngineError> {
        self.record("update label", |store| store.update_label(id, fields))
    }

    pub fn delete_label(&mut self, id: &LabelId) -> Result<(), EngineError> {
        self.record("delete label", |store| store.delete_label(id))
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> Result<(), EngineError> {
        self.record("delete edge", |store| store.delete_edge(id))
    }

    // ---------------------------------------------------------------------
    // Tape and metadata

    /// Writes (or with `None`, clears) one cell of the input tape.
    pub fn edit_tape_cell(&mut self, index: i64, symbol: Option<char>) -> Result<(), EngineError> {
        self.record("edit tape", |store| {
            store.write_cell(index, symbol);
            Ok(())
        })
    }

    /// Moves the head. The head is part of the simulation cursor, so this is
    /// not recorded.
    pub fn set_head(&mut self, index: i64) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.simulator.set_head(index);
        Ok(())
    }

    pub fn set_machine_name(&mut self, name: &str) -> Result<(), EngineError> {
        self.ensure_editable()?;
        if self.store.name() == name {
            return Ok(());
        }
        self.record("rename machine", |store| {
            store.set_name(name);
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Pointer gestures

    /// Presses on a state. With `multiselect` the state's membership in the
    /// selection is toggled; otherwise an unselected state replaces the
    /// selection. Dragging then moves every selected state.
    pub fn press_state(
        &mut self,
        id: &StateId,
        pointer: Vector,
        multiselect: bool,
    ) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.store.state(id)?;

        if multiselect {
            if let Some(index) = self.selection.iter().position(|s| s == id) {
                self.selection.remove(index);
                self.drag.abandon(&mut self.store);
                return Ok(());
            }
            self.selection.push(id.clone());
        } else if !self.selection.contains(id) {
            self.selection = vec![id.clone()];
        }

        let moving = self.selection.clone();
        self.drag.press_states(&mut self.store, &moving, pointer)
    }

    pub fn press_control_point(
        &mut self,
        id: &ControlPointId,
        pointer: Vector,
    ) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.drag.press_control_point(&mut self.store, id, pointer)
    }

    /// Presses on empty canvas: clears the selection.
    pub fn press_canvas(&mut self) {
        self.drag.abandon(&mut self.store);
        self.selection.clear();
    }

    /// Returns whether a gesture is in progress and was updated.
    pub fn pointer_move(&mut self, pointer: Vector) -> bool {
        self.drag.drag_to(&mut self.store, pointer)
    }

    /// Ends the gesture. Returns whether anything moved (and was recorded).
    pub fn release(&mut self) -> bool {
        let before = self.store.snapshot();
        match self.drag.release(&mut self.store) {
            Release::Moved(description) => {
                self.history.push(before, description);
                true
            }
            Release::Unmoved | Release::Idle => false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    /// Moves states by `delta` as one complete gesture.
    pub fn move_states(&mut self, ids: &[StateId], delta: Vector) -> Result<bool, EngineError> {
        self.ensure_editable()?;
        if ids.is_empty() {
            return Ok(false);
        }
        self.drag.press_states(&mut self.store, ids, Vector::ZERO)?;
        self.drag.drag_to(&mut self.store, delta);
        Ok(self.release())
    }

    /// Moves a control point by `delta` as one complete gesture.
    pub fn move_control_point(
        &mut self,
        id: &ControlPointId,
        delta: Vector,
    ) -> Result<bool, EngineError> {
        self.ensure_editable()?;
        self.drag
            .press_control_point(&mut self.store, id, Vector::ZERO)?;
        self.drag.drag_to(&mut self.store, delta);
        Ok(self.release())
    }

    // ---------------------------------------------------------------------
    // History

    /// Restores the tables before the most recent command. Returns the
    /// command's description, or `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<String>, EngineError> {
        self.ensure_editable()?;
        self.drag.abandon(&mut self.store);
        let Some(record) = self.history.undo(self.store.snapshot()) else {
            return Ok(None);
        };
        info!(description = %record.description, "undo");
        self.store.install(record.snapshot);
        self.refresh();
        Ok(Some(record.description))
    }

    pub fn redo(&mut self) -> Result<Option<String>, EngineError> {
        self.ensure_editable()?;
        self.drag.abandon(&mut self.store);
        let Some(record) = self.history.redo(self.store.snapshot()) else {
            return Ok(None);
        };
        info!(description = %record.description, "redo");
        self.store.install(record.snapshot);
        self.refresh();
        Ok(Some(record.description))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    // ---------------------------------------------------------------------
    // Simulation

    /// Fires a single transition (or halts).
    pub fn step(&mut self) -> Result<Vec<SimEvent>, EngineError> {
        self.drag.abandon(&mut self.store);
        self.simulator.start(&mut self.store, RunMode::SingleStep)
    }

    /// Runs until the machine halts or is paused.
    pub fn play(&mut self) -> Result<Vec<SimEvent>, EngineError> {
        self.drag.abandon(&mut self.store);
        self.simulator.start(&mut self.store, RunMode::Continuous)
    }

    pub fn pause(&mut self) -> Vec<SimEvent> {
        self.simulator.pause(&mut self.store)
    }

    pub fn reset(&mut self) -> Vec<SimEvent> {
        self.simulator.reset(&mut self.store)
    }

    /// Advances a running simulation by `elapsed` of host time.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<SimEvent> {
        self.simulator.advance(&mut self.store, elapsed)
    }

    /// Runs to completion without animation timing.
    pub fn run_to_halt(&mut self, max_steps: usize) -> Result<RunOutcome, EngineError> {
        self.drag.abandon(&mut self.store);
        self.simulator.run_to_halt(&mut self.store, max_steps)
    }

    pub fn set_sim_config(&mut self, config: SimConfig) {
        self.simulator.set_config(config);
    }

    pub fn interval(&self) -> Duration {
        self.simulator.interval()
    }

    // ---------------------------------------------------------------------
    // Persistence

    /// The committed tables, never including a gesture in progress.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Replaces every table. Any gesture and simulation are discarded; the
    /// undo log is kept.
    pub fn install_snapshot(&mut self, snapshot: Snapshot) {
        self.drag.forget();
        self.simulator.forget(&mut self.store);
        self.store.install(snapshot);
        self.refresh();
        info!(name = %self.store.name(), "snapshot installed");
    }

    // ---------------------------------------------------------------------
    // Queries

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// States as the view should draw them, including a drag in progress.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.store.states()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.store.edges()
    }

    pub fn labels_by_edge(&self) -> BTreeMap<EdgeId, Vec<&Label>> {
        self.store.labels_by_edge()
    }

    /// Labels that make the machine nondeterministic.
    pub fn duplicate_labels(&self) -> &BTreeSet<LabelId> {
        &self.duplicates
    }

    pub fn unreachable_states(&self) -> Vec<StateId> {
        unreachable_states(self.store.committed())
    }

    pub fn selection(&self) -> &[StateId] {
        &self.selection
    }

    pub fn mode(&self) -> Mode {
        self.store.mode()
    }

    pub fn has_start_state(&self) -> bool {
        self.store.has_start_state()
    }

    pub fn cursor(&self) -> &SimCursor {
        self.simulator.cursor()
    }

    pub fn highlights(&self) -> &Highlights {
        self.simulator.highlights()
    }

    pub fn last_halt(&self) -> Option<&HaltReport> {
        self.simulator.last_halt()
    }

    /// The cells within `radius` of the head.
    pub fn tape_window(&self, radius: usize) -> Vec<TapeCell> {
        self.store.tape().window(self.cursor().head, radius)
    }
}
