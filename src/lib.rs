//! This crate provides the machine-state engine of a visual Turing machine
//! editor and simulator. It includes modules for storing and editing states,
//! edges and transition labels, dragging them on a canvas with undo, analyzing
//! machines for determinism, and animating their execution step by step.

pub mod analyzer;
pub mod config;
pub mod drag;
pub mod history;
pub mod loader;
pub mod machine;
pub mod overlay;
pub mod samples;
pub mod simulator;
pub mod snapshot;
pub mod store;
pub mod tape;
pub mod types;
pub mod vector;

/// Re-exports the analysis functions and `AnalysisError` enum from the analyzer module.
pub use analyzer::{analyze, check_references, find_duplicates, unreachable_states, AnalysisError};
pub use config::{EngineConfig, SimConfig};
pub use drag::{DragEngine, FixedOffset, Release};
pub use history::{History, Record};
/// Re-exports the `SnapshotLoader` struct from the loader module.
pub use loader::SnapshotLoader;
/// Re-exports the `Machine` struct from the machine module.
pub use machine::Machine;
pub use overlay::Overlay;
/// Re-exports `SampleInfo`, `SampleManager`, and `SAMPLES` from the samples module.
pub use samples::{SampleInfo, SampleManager, SAMPLES};
pub use simulator::{
    HaltReport, Highlights, Outcome, RunMode, RunOutcome, SimCursor, SimEvent, Simulator,
};
pub use snapshot::Snapshot;
pub use store::{EntityStore, Resolved};
pub use tape::{Tape, TapeCell};
/// Re-exports the entity types, ids and error type from the types module.
pub use types::{
    ControlPoint, ControlPointId, Direction, Edge, EdgeId, EngineError, Label, LabelFields,
    LabelId, Metadata, Mode, State, StateId, BLANK_SYMBOL, MAX_EXECUTION_STEPS, MAX_MNEMONIC_LEN,
};
pub use vector::Vector;
