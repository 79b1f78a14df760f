//! Interactive movement of states and control points.
//!
//! When a group of states is dragged, every control point on an edge touching
//! the group has to follow in a way that keeps the curve's shape:
//!
//! * if both endpoints of the edge move, the control point is simply
//!   translated with the pointer ("fully affected");
//! * if only one endpoint moves, the control point is pinned to the chord
//!   between the endpoints: it keeps the fraction along the chord at which it
//!   projects and its signed distance from the chord ("half affected").
//!
//! All positions computed during a gesture go to the store's work-in-progress
//! overlay. Releasing promotes that overlay; abandoning drops it.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::store::EntityStore;
use crate::types::{ControlPointId, EngineError, StateId};
use crate::vector::Vector;

/// The shape-preserving description of a half-affected control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedOffset {
    /// Position of the endpoint that does not move.
    pub fixed_pos: Vector,
    /// The moving endpoint's offset from the pointer.
    pub moving_offset: Vector,
    /// Where the control point projects onto the chord, as a fraction of the
    /// chord from the moving endpoint (0) to the fixed one (1). Unclamped.
    pub fraction_along: f64,
    /// Signed distance of the control point from the chord, measured along
    /// the chord's unit normal.
    pub perp_length: f64,
}

impl FixedOffset {
    pub fn capture(fixed_pos: Vector, moving_pos: Vector, control: Vector, pointer: Vector) -> Self {
        let chord = fixed_pos - moving_pos;
        let to_control = control - moving_pos;
        let chord_len_sq = chord.dot(chord);
        let fraction_along = if chord_len_sq == 0.0 {
            0.0
        } else {
            to_control.dot(chord) / chord_len_sq
        };
        Self {
            fixed_pos,
            moving_offset: moving_pos - pointer,
            fraction_along,
            perp_length: to_control.dot(chord.unit_normal()),
        }
    }

    /// The control point position for the given pointer position.
    pub fn place(&self, pointer: Vector) -> Vector {
        let moving_pos = pointer + self.moving_offset;
        let chord = self.fixed_pos - moving_pos;
        moving_pos + chord.scale(self.fraction_along) + chord.unit_normal().scale(self.perp_length)
    }
}

#[derive(Debug, Clone)]
enum Target {
    States {
        offsets: BTreeMap<StateId, Vector>,
        full: BTreeMap<ControlPointId, Vector>,
        half: BTreeMap<ControlPointId, FixedOffset>,
    },
    ControlPoint {
        id: ControlPointId,
        offset: Vector,
    },
}

impl Target {
    /// Whether the gesture holds nothing that could move.
    fn is_empty(&self) -> bool {
        match self {
            Target::States { offsets, full, half } => {
                offsets.is_empty() && full.is_empty() && half.is_empty()
            }
            Target::ControlPoint { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Gesture {
    target: Target,
    origin: Vector,
    pointer: Vector,
}

/// What releasing the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The overlay was promoted. Carries a description for the history log.
    Moved(&'static str),
    /// The pointer ended where it started; nothing changed.
    Unmoved,
    /// No gesture was in progress.
    Idle,
}

/// Offset bookkeeping for the gesture currently in progress (if any).
#[derive(Debug, Clone, Default)]
pub struct DragEngine {
    gesture: Option<Gesture>,
}

impl DragEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Starts moving `moving` with the pointer at `pointer`. Any previous,
    /// unreleased gesture is discarded.
    pub fn press_states(
        &mut self,
        store: &mut EntityStore,
        moving: &[StateId],
        pointer: Vector,
    ) -> Result<(), EngineError> {
        self.abandon(store);

        let mut offsets = BTreeMap::new();
        for id in moving {
            offsets.insert(id.clone(), store.state(id)?.position - pointer);
        }
        let moving: BTreeSet<&StateId> = offsets.keys().collect();

        let mut full = BTreeMap::new();
        let mut half = BTreeMap::new();
        for cp in store.control_points() {
            let edge = store.edge(&cp.edge).map_err(|_| {
                EngineError::Inconsistency(format!(
                    "control point \"{}\" references nonexistent edge \"{}\"",
                    cp.id, cp.edge
                ))
            })?;
            let start_moves = moving.contains(&edge.start);
            let end_moves = moving.contains(&edge.end);

            match (start_moves, end_moves) {
                (true, true) => {
                    full.insert(cp.id.clone(), cp.position - pointer);
                }
                (true, false) | (false, true) => {
                    let (moving_id, fixed_id) = if start_moves {
                        (&edge.start, &edge.end)
                    } else {
                        (&edge.end, &edge.start)
                    };
                    let offset = FixedOffset::capture(
                        store.state(fixed_id)?.position,
                        store.state(moving_id)?.position,
                        cp.position,
                        pointer,
                    );
                    half.insert(cp.id.clone(), offset);
                }
                (false, false) => {}
            }
        }

        debug!(
            states = offsets.len(),
            full = full.len(),
            half = half.len(),
            "press on states"
        );
        store.begin_overlay();
        self.gesture = Some(Gesture {
            target: Target::States { offsets, full, half },
            origin: pointer,
            pointer,
        });
        Ok(())
    }

    /// Starts moving a single control point directly.
    pub fn press_control_point(
        &mut self,
        store: &mut EntityStore,
        id: &ControlPointId,
        pointer: Vector,
    ) -> Result<(), EngineError> {
        self.abandon(store);
        let offset = store.control_point(id)?.position - pointer;
        store.begin_overlay();
        self.gesture = Some(Gesture {
            target: Target::ControlPoint {
                id: id.clone(),
                offset,
            },
            origin: pointer,
            pointer,
        });
        Ok(())
    }

    /// Moves everything the current gesture holds so that it follows `pointer`.
    /// Returns `false` if no gesture is in progress.
    pub fn drag_to(&mut self, store: &mut EntityStore, pointer: Vector) -> bool {
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        let Some(wip) = store.overlay_mut() else {
            // Some command replaced the tables mid-gesture; the gesture is void.
            self.gesture = None;
            return false;
        };

        gesture.pointer = pointer;
        match &gesture.target {
            Target::States { offsets, full, half } => {
                for (id, offset) in offsets {
                    if let Some(state) = wip.states.get_mut(id) {
                        state.position = pointer + *offset;
                    }
                }
                for (id, offset) in full {
                    if let Some(cp) = wip.control_points.get_mut(id) {
                        cp.position = pointer + *offset;
                    }
                }
                for (id, fixed) in half {
                    if let Some(cp) = wip.control_points.get_mut(id) {
                        cp.position = fixed.place(pointer);
                    }
                }
            }
            Target::ControlPoint { id, offset } => {
                if let Some(cp) = wip.control_points.get_mut(id) {
                    cp.position = pointer + *offset;
                }
            }
        }
        true
    }

    /// Ends the gesture. If the pointer moved something, the overlay becomes
    /// the new committed state; a press-and-release in place or a gesture
    /// holding nothing changes nothing.
    pub fn release(&mut self, store: &mut EntityStore) -> Release {
        let Some(gesture) = self.gesture.take() else {
            return Release::Idle;
        };
        if gesture.pointer == gesture.origin || gesture.target.is_empty() || !store.has_overlay() {
            store.discard_overlay();
            return Release::Unmoved;
        }

        store.commit_overlay();
        let description = match gesture.target {
            Target::States { .. } => "move state",
            Target::ControlPoint { .. } => "move control point",
        };
        debug!(description, "gesture committed");
        Release::Moved(description)
    }

    /// Drops the gesture and its overlay without applying anything.
    pub fn abandon(&mut self, store: &mut EntityStore) {
        if self.gesture.take().is_some() {
            store.discard_overlay();
        }
    }

    pub(crate) fn forget(&mut self) {
        self.gesture = None;
    }

    /// Half-affected records of the current gesture.
    pub fn half_offsets(&self) -> Option<&BTreeMap<ControlPointId, FixedOffset>> {
        match &self.gesture.as_ref()?.target {
            Target::States { half, .. } => Some(half),
            Target::ControlPoint { .. } => None,
        }
    }

    /// Fully-affected records of the current gesture.
    pub fn full_offsets(&self) -> Option<&BTreeMap<ControlPointId, Vector>> {
        match &self.gesture.as_ref()?.target {
            Target::States { full, .. } => Some(full),
            Target::ControlPoint { .. } => None,
        }
    }
}
