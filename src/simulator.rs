//! The simulation stepper.
//!
//! Firing one transition is animated by four phases that run side by side
//! over one step interval `I`:
//!
//! | phase | cues |
//! |-------|------|
//! | state | glow current, fade it out, **set current**, fade the target in, glow it |
//! | tape  | flag the head cell as being written, **write**, clear the flag, **move the head** |
//! | edge  | glow the edge and its control point |
//! | label | glow the label |
//!
//! Each cue fires at a fixed fraction of `I`. Cues marked in bold change the
//! logical machine; the rest only affect [`Highlights`]. The stepper never
//! sleeps: the host advances it with elapsed time, and a paused or reset run
//! settles its in-flight step synchronously by applying every pending logical
//! cue, so the logical state always matches what the animation would have
//! shown had it completed.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::analyzer::analyze;
use crate::config::SimConfig;
use crate::store::{EntityStore, Resolved};
use crate::tape::Tape;
use crate::types::{
    ControlPointId, Direction, EdgeId, EngineError, LabelId, Mode, StateId, MAX_EXECUTION_STEPS,
};

/// How a run proceeds after its first transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Fire exactly one transition, then stop.
    SingleStep,
    /// Keep firing transitions until the machine halts or the run is cancelled.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
}

/// What the machine looked like when it halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaltReport {
    pub outcome: Outcome,
    /// The state the machine halted in.
    pub state: StateId,
    /// Transitions fired since the run first started.
    pub steps: usize,
    /// Tape symbols when the run first started.
    pub initial_tape: String,
    /// Tape symbols at the moment of halting.
    pub final_tape: String,
}

/// Transient simulation position. Never part of a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimCursor {
    pub current_state: Option<StateId>,
    pub head: i64,
    pub has_started: bool,
    pub initial_tape: Option<Tape>,
    pub initial_head: i64,
    pub steps: usize,
}

/// Purely visual simulation state for the view layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlights {
    pub glowing_state: Option<StateId>,
    pub fading_out_state: Option<StateId>,
    pub fading_in_state: Option<StateId>,
    pub glowing_edge: Option<EdgeId>,
    pub glowing_control_point: Option<ControlPointId>,
    pub glowing_label: Option<LabelId>,
    /// The head cell is being rewritten.
    pub tape_writing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Started(RunMode),
    /// A transition has been fully applied.
    Stepped {
        from: StateId,
        to: StateId,
        label: LabelId,
    },
    Halted(HaltReport),
    Paused,
    Reset,
    /// The run stopped on an engine error. Always the last event of a batch.
    Aborted(EngineError),
}

/// How a headless run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Halted(HaltReport),
    /// The step budget ran out first. The run is stopped, not reset.
    StepLimit { steps: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    GlowState(Option<StateId>),
    FadeOut(Option<StateId>),
    FadeIn(Option<StateId>),
    GlowEdge(Option<EdgeId>),
    GlowControlPoint(Option<ControlPointId>),
    GlowLabel(Option<LabelId>),
    TapeWriting(bool),
    SetCurrent(StateId),
    Write(char),
    MoveHead(Direction),
}

impl Effect {
    fn is_logical(&self) -> bool {
        matches!(
            self,
            Effect::SetCurrent(_) | Effect::Write(_) | Effect::MoveHead(_)
        )
    }

    fn apply(self, store: &mut EntityStore, cursor: &mut SimCursor, highlights: &mut Highlights) {
        match self {
            Effect::GlowState(id) => highlights.glowing_state = id,
            Effect::FadeOut(id) => highlights.fading_out_state = id,
            Effect::FadeIn(id) => highlights.fading_in_state = id,
            Effect::GlowEdge(id) => highlights.glowing_edge = id,
            Effect::GlowControlPoint(id) => highlights.glowing_control_point = id,
            Effect::GlowLabel(id) => highlights.glowing_label = id,
            Effect::TapeWriting(on) => highlights.tape_writing = on,
            Effect::SetCurrent(id) => {
                debug!(state = %id, "current state");
                cursor.current_state = Some(id);
            }
            Effect::Write(symbol) => {
                debug!(head = cursor.head, ?symbol, "write");
                store.write_cell(cursor.head, Some(symbol));
            }
            Effect::MoveHead(direction) => {
                cursor.head += direction.head_delta();
                debug!(head = cursor.head, ?direction, "move head");
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Cue {
    at: Duration,
    effect: Effect,
}

/// One of the four concurrently running tracks of a step. Its cues are kept
/// in firing order and always apply in that order.
#[derive(Debug, Clone)]
struct Phase {
    cues: VecDeque<Cue>,
}

impl Phase {
    fn new(cues: Vec<(Duration, Effect)>) -> Self {
        Self {
            cues: cues
                .into_iter()
                .map(|(at, effect)| Cue { at, effect })
                .collect(),
        }
    }

    fn next_due(&self, now: Duration) -> Option<Duration> {
        self.cues.front().map(|c| c.at).filter(|at| *at <= now)
    }

    /// Runs when the step is interrupted: logical cues still apply, in
    /// order; cosmetic ones are dropped.
    fn cleanup(&mut self, store: &mut EntityStore, cursor: &mut SimCursor, highlights: &mut Highlights) {
        for cue in self.cues.drain(..) {
            if cue.effect.is_logical() {
                cue.effect.apply(store, cursor, highlights);
            }
        }
    }
}

/// The transition currently being animated.
#[derive(Debug, Clone)]
struct ActiveStep {
    from: StateId,
    resolved: Resolved,
    interval: Duration,
    elapsed: Duration,
    /// State, tape, edge and label phases, in that order.
    phases: [Phase; 4],
}

impl ActiveStep {
    fn new(interval: Duration, from: StateId, resolved: Resolved) -> Self {
        let at = |num: u32, den: u32| interval * num / den;
        let target = resolved.target.clone();

        let state = Phase::new(vec![
            (at(0, 1), Effect::GlowState(Some(from.clone()))),
            (at(1, 8), Effect::FadeOut(Some(from.clone()))),
            (at(1, 8), Effect::GlowState(None)),
            (at(3, 8), Effect::FadeOut(None)),
            (at(5, 8), Effect::SetCurrent(target.clone())),
            (at(5, 8), Effect::FadeIn(Some(target.clone()))),
            (at(7, 8), Effect::FadeIn(None)),
            (at(7, 8), Effect::GlowState(Some(target))),
        ]);
        let tape = Phase::new(vec![
            (at(1, 4), Effect::TapeWriting(true)),
            (at(1, 2), Effect::Write(resolved.write)),
            (at(3, 4), Effect::TapeWriting(false)),
            (at(3, 4), Effect::MoveHead(resolved.direction)),
        ]);
        let edge = Phase::new(vec![
            (at(1, 8), Effect::GlowEdge(Some(resolved.edge.clone()))),
            (
                at(1, 4),
                Effect::GlowControlPoint(Some(resolved.control_point.clone())),
            ),
            (at(3, 4), Effect::GlowControlPoint(None)),
            (at(7, 8), Effect::GlowEdge(None)),
        ]);
        let label = Phase::new(vec![
            (at(1, 4), Effect::GlowLabel(Some(resolved.label.clone()))),
            (at(3, 4), Effect::GlowLabel(None)),
        ]);

        Self {
            from,
            resolved,
            interval,
            elapsed: Duration::ZERO,
            phases: [state, tape, edge, label],
        }
    }

    fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.elapsed)
    }

    /// Fires every cue due by `now`, earliest first; ties go to the earlier phase.
    fn advance_to(
        &mut self,
        now: Duration,
        store: &mut EntityStore,
        cursor: &mut SimCursor,
        highlights: &mut Highlights,
    ) {
        self.elapsed = now.min(self.interval);
        loop {
            let due = self
                .phases
                .iter()
                .enumerate()
                .filter_map(|(i, phase)| phase.next_due(self.elapsed).map(|at| (at, i)))
                .min();
            let Some((_, index)) = due else {
                break;
            };
            if let Some(cue) = self.phases[index].cues.pop_front() {
                cue.effect.apply(store, cursor, highlights);
            }
        }
    }

    fn settle(
        &mut self,
        store: &mut EntityStore,
        cursor: &mut SimCursor,
        highlights: &mut Highlights,
    ) {
        for phase in &mut self.phases {
            phase.cleanup(store, cursor, highlights);
        }
        *highlights = Highlights::default();
        self.elapsed = self.interval;
    }

    fn into_event(self) -> SimEvent {
        SimEvent::Stepped {
            from: self.from,
            to: self.resolved.target,
            label: self.resolved.label,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimConfig,
    cursor: SimCursor,
    highlights: Highlights,
    run: Option<RunMode>,
    step: Option<ActiveStep>,
    last_halt: Option<HaltReport>,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Changes the timing. Takes effect from the next step.
    pub fn set_config(&mut self, config: SimConfig) {
        self.config = config;
    }

    pub fn interval(&self) -> Duration {
        self.config.interval()
    }

    pub fn cursor(&self) -> &SimCursor {
        &self.cursor
    }

    pub fn highlights(&self) -> &Highlights {
        &self.highlights
    }

    pub fn last_halt(&self) -> Option<&HaltReport> {
        self.last_halt.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn run_mode(&self) -> Option<RunMode> {
        self.run
    }

    /// Moves the head while no run is in progress (the user scrolling the tape).
    pub fn set_head(&mut self, index: i64) {
        if self.run.is_none() {
            self.cursor.head = index;
        }
    }

    /// Starts a run. Refuses with a validation error if the machine has no
    /// start state or has nondeterministic transitions.
    ///
    /// Starting while a run is in progress only changes how that run
    /// continues after its current step.
    pub fn start(
        &mut self,
        store: &mut EntityStore,
        mode: RunMode,
    ) -> Result<Vec<SimEvent>, EngineError> {
        if self.run.is_some() {
            self.run = Some(mode);
            return Ok(Vec::new());
        }

        if let Err(e) = analyze(store.committed()) {
            warn!(error = %e, "refusing to start simulation");
            return Err(e.into());
        }

        let current_exists = self
            .cursor
            .current_state
            .as_ref()
            .is_some_and(|id| store.state(id).is_ok());
        if !self.cursor.has_started || !current_exists {
            self.cursor = SimCursor {
                current_state: store.start_state().cloned(),
                head: self.cursor.head,
                has_started: true,
                initial_tape: Some(store.tape().clone()),
                initial_head: self.cursor.head,
                steps: 0,
            };
            self.last_halt = None;
        }

        info!(?mode, head = self.cursor.head, "simulation started");
        store.set_mode(Mode::Simulating);
        self.run = Some(mode);

        let mut events = vec![SimEvent::Started(mode)];
        self.begin_step(store, &mut events)?;
        Ok(events)
    }

    /// Resolves the next transition and starts animating it, or halts.
    /// Ends the run if this fails.
    fn begin_step(
        &mut self,
        store: &mut EntityStore,
        events: &mut Vec<SimEvent>,
    ) -> Result<(), EngineError> {
        let result = self.try_begin_step(store, events);
        if result.is_err() {
            self.end_run(store);
        }
        result
    }

    fn try_begin_step(
        &mut self,
        store: &mut EntityStore,
        events: &mut Vec<SimEvent>,
    ) -> Result<(), EngineError> {
        let current = self.cursor.current_state.clone().ok_or_else(|| {
            EngineError::Inconsistency("simulation running without a current state".to_string())
        })?;
        let symbol = store.tape().read(self.cursor.head);

        match store.resolve(&current, symbol)? {
            Some(resolved) => {
                debug!(from = %current, to = %resolved.target, ?symbol, "step");
                let mut step = ActiveStep::new(self.interval(), current, resolved);
                step.advance_to(
                    Duration::ZERO,
                    store,
                    &mut self.cursor,
                    &mut self.highlights,
                );
                self.step = Some(step);
                Ok(())
            }
            None => self.halt(store, current, events),
        }
    }

    fn halt(
        &mut self,
        store: &mut EntityStore,
        state: StateId,
        events: &mut Vec<SimEvent>,
    ) -> Result<(), EngineError> {
        let is_final = store.is_final(&state).map_err(|_| {
            EngineError::Inconsistency(format!("current state \"{state}\" does not exist"))
        })?;

        let report = HaltReport {
            outcome: if is_final {
                Outcome::Accept
            } else {
                Outcome::Reject
            },
            state,
            steps: self.cursor.steps,
            initial_tape: self
                .cursor
                .initial_tape
                .as_ref()
                .map(Tape::symbols)
                .unwrap_or_default(),
            final_tape: store.tape().symbols(),
        };
        info!(outcome = ?report.outcome, state = %report.state, steps = report.steps, "machine halted");

        self.last_halt = Some(report.clone());
        events.push(SimEvent::Halted(report));
        self.end_run(store);
        Ok(())
    }

    fn end_run(&mut self, store: &mut EntityStore) {
        self.run = None;
        self.step = None;
        self.highlights = Highlights::default();
        store.set_mode(Mode::Editing);
    }

    /// Advances the run by `elapsed`, firing every cue that falls due. Time
    /// left over after a step completes carries into the next one.
    ///
    /// An error while starting the next step ends the run; it is reported as
    /// a final [`SimEvent::Aborted`] after the steps that did complete.
    pub fn advance(&mut self, store: &mut EntityStore, elapsed: Duration) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let mut remaining = elapsed;

        while let Some(step) = self.step.as_mut() {
            let to_end = step.remaining();
            if remaining < to_end {
                let now = step.elapsed + remaining;
                step.advance_to(now, store, &mut self.cursor, &mut self.highlights);
                break;
            }

            remaining -= to_end;
            step.advance_to(step.interval, store, &mut self.cursor, &mut self.highlights);
            if let Some(done) = self.step.take() {
                self.cursor.steps += 1;
                events.push(done.into_event());
            }

            match self.run {
                Some(RunMode::Continuous) => {
                    if let Err(e) = self.begin_step(store, &mut events) {
                        warn!(error = %e, "simulation aborted");
                        events.push(SimEvent::Aborted(e));
                        break;
                    }
                }
                _ => {
                    self.end_run(store);
                    break;
                }
            }
        }

        events
    }

    /// Interrupts the step in flight, settling its logical effects, and
    /// returns to editing.
    fn cancel(&mut self, store: &mut EntityStore, events: &mut Vec<SimEvent>) {
        if let Some(mut step) = self.step.take() {
            step.settle(store, &mut self.cursor, &mut self.highlights);
            self.cursor.steps += 1;
            events.push(step.into_event());
        }
        self.end_run(store);
    }

    pub fn pause(&mut self, store: &mut EntityStore) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if self.run.is_none() {
            return events;
        }
        self.cancel(store, &mut events);
        info!(steps = self.cursor.steps, "simulation paused");
        events.push(SimEvent::Paused);
        events
    }

    /// Cancels any run, then restores the tape and head to how they were when
    /// the run first started and forgets the current state. Before any run
    /// has started the head stays where it is.
    pub fn reset(&mut self, store: &mut EntityStore) -> Vec<SimEvent> {
        let mut events = Vec::new();
        self.cancel(store, &mut events);

        if let Some(tape) = self.cursor.initial_tape.take() {
            store.replace_tape(tape);
        }
        let head = if self.cursor.has_started {
            self.cursor.initial_head
        } else {
            self.cursor.head
        };
        self.cursor = SimCursor {
            head,
            ..SimCursor::default()
        };
        self.last_halt = None;
        info!(head, "simulation reset");
        events.push(SimEvent::Reset);
        events
    }

    /// Forgets the cursor without touching the store. Used when the tables
    /// are replaced wholesale.
    pub(crate) fn forget(&mut self, store: &mut EntityStore) {
        let mut events = Vec::new();
        self.cancel(store, &mut events);
        self.cursor = SimCursor {
            head: self.cursor.head,
            ..SimCursor::default()
        };
        self.last_halt = None;
    }

    /// Runs the machine to completion without animation timing. At most
    /// `max_steps` transitions fire, and never more than [`MAX_EXECUTION_STEPS`].
    pub fn run_to_halt(
        &mut self,
        store: &mut EntityStore,
        max_steps: usize,
    ) -> Result<RunOutcome, EngineError> {
        let max_steps = max_steps.min(MAX_EXECUTION_STEPS);
        let mut events = if self.run.is_none() {
            self.start(store, RunMode::Continuous)?
        } else {
            self.run = Some(RunMode::Continuous);
            Vec::new()
        };
        let first = self.cursor.steps;

        loop {
            for event in &events {
                match event {
                    SimEvent::Halted(report) => return Ok(RunOutcome::Halted(report.clone())),
                    SimEvent::Aborted(e) => return Err(e.clone()),
                    _ => {}
                }
            }
            let steps = self.cursor.steps - first;
            if !self.is_running() {
                return Ok(RunOutcome::StepLimit { steps });
            }
            if steps >= max_steps {
                // The step in flight has only fired cosmetic cues.
                warn!(steps, "step limit reached");
                self.end_run(store);
                return Ok(RunOutcome::StepLimit { steps });
            }
            let interval = self.interval();
            events = self.advance(store, interval);
        }
    }
}
