use crate::loader::SnapshotLoader;
use crate::snapshot::Snapshot;
use crate::types::EngineError;

use std::sync::{RwLock, RwLockReadGuard};
use tracing::warn;

// Default embedded machines
const SAMPLE_TEXTS: [&str; 3] = [
    include_str!("../samples/replace-a.json"),
    include_str!("../samples/binary-increment.json"),
    include_str!("../samples/even-ones.json"),
];

lazy_static::lazy_static! {
    pub static ref SAMPLES: RwLock<Vec<Snapshot>> = RwLock::new(parse_embedded());
}

/// Parses every embedded machine, skipping (and logging) any that fail.
fn parse_embedded() -> Vec<Snapshot> {
    SAMPLE_TEXTS
        .iter()
        .filter_map(|text| match SnapshotLoader::load_snapshot_from_string(text) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "failed to load embedded sample");
                None
            }
        })
        .collect()
}

fn read_guard(
    registry: &RwLock<Vec<Snapshot>>,
) -> Result<RwLockReadGuard<'_, Vec<Snapshot>>, EngineError> {
    registry
        .read()
        .map_err(|e| EngineError::SampleRegistry(e.to_string()))
}

/// Runs `f` against the registry under a read guard.
fn with_samples<R>(f: impl FnOnce(&[Snapshot]) -> R) -> Result<R, EngineError> {
    let samples = read_guard(&SAMPLES)?;
    Ok(f(&samples))
}

pub struct SampleManager;

impl SampleManager {
    /// Re-parses the embedded machines into [`SAMPLES`].
    pub fn load() -> Result<(), EngineError> {
        let samples = parse_embedded();
        let mut write_guard = SAMPLES
            .write()
            .map_err(|e| EngineError::SampleRegistry(e.to_string()))?;
        *write_guard = samples;
        Ok(())
    }

    pub fn get_sample_count() -> usize {
        with_samples(|samples| samples.len()).unwrap_or_default()
    }

    pub fn get_sample_by_index(index: usize) -> Result<Snapshot, EngineError> {
        with_samples(|samples| samples.get(index).cloned())?
            .ok_or_else(|| EngineError::UnknownSample(format!("index {}", index)))
    }

    /// Get a sample by its machine name, ignoring case
    pub fn get_sample_by_name(name: &str) -> Result<Snapshot, EngineError> {
        with_samples(|samples| {
            samples
                .iter()
                .find(|sample| sample.metadata.name.eq_ignore_ascii_case(name))
                .cloned()
        })?
        .ok_or_else(|| EngineError::UnknownSample(name.to_string()))
    }

    pub fn list_sample_names() -> Vec<String> {
        with_samples(|samples| {
            samples
                .iter()
                .map(|sample| sample.metadata.name.clone())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Search for samples by name
    pub fn search_samples(query: &str) -> Vec<usize> {
        let query = query.to_lowercase();
        with_samples(|samples| {
            samples
                .iter()
                .enumerate()
                .filter(|(_, sample)| sample.metadata.name.to_lowercase().contains(&query))
                .map(|(index, _)| index)
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn get_sample_info(index: usize) -> Result<SampleInfo, EngineError> {
        let sample = Self::get_sample_by_index(index)?;

        Ok(SampleInfo {
            index,
            name: sample.metadata.name.clone(),
            initial_tape: sample.tape.symbols(),
            state_count: sample.states.len(),
            transition_count: sample.labels.len(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SampleInfo {
    pub index: usize,
    pub name: String,
    pub initial_tape: String,
    pub state_count: usize,
    pub transition_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::config::EngineConfig;
    use crate::machine::Machine;
    use crate::simulator::{Outcome, RunOutcome};

    #[test]
    fn test_sample_manager_initialization() {
        assert!(SampleManager::load().is_ok());
        assert_eq!(SampleManager::get_sample_count(), SAMPLE_TEXTS.len());
    }

    #[test]
    fn test_all_samples_are_valid() {
        for i in 0..SampleManager::get_sample_count() {
            let sample = SampleManager::get_sample_by_index(i).unwrap();
            assert!(
                analyze(&sample).is_ok(),
                "Sample '{}' is invalid",
                sample.metadata.name
            );
        }
    }

    #[test]
    fn test_sample_names() {
        let names = SampleManager::list_sample_names();
        assert!(names.contains(&"Replace A".to_string()));
        assert!(names.contains(&"Binary Increment".to_string()));
        assert!(names.contains(&"Even Ones".to_string()));
    }

    #[test]
    fn test_search_and_lookup() {
        assert_eq!(SampleManager::search_samples("binary"), vec![1]);
        assert!(SampleManager::get_sample_by_name("even ones").is_ok());
        assert_eq!(
            SampleManager::get_sample_by_name("missing"),
            Err(EngineError::UnknownSample("missing".to_string()))
        );
        assert!(matches!(
            SampleManager::get_sample_by_index(99),
            Err(EngineError::UnknownSample(_))
        ));

        let info = SampleManager::get_sample_info(1).unwrap();
        assert_eq!(info.initial_tape, "1011");
        assert_eq!(info.state_count, 3);
        assert_eq!(info.transition_count, 6);
    }

    #[test]
    fn test_poisoned_registry_is_reported() {
        let poisoned: RwLock<Vec<Snapshot>> = RwLock::new(Vec::new());
        let _ = std::panic::catch_unwind(|| {
            let _guard = poisoned.write().unwrap();
            panic!("writer panicked");
        });

        let error = read_guard(&poisoned).map(|_| ()).unwrap_err();
        assert!(matches!(error, EngineError::SampleRegistry(_)));
        assert!(error.to_string().starts_with("Sample registry unavailable"));
    }

    #[test]
    fn test_samples_can_be_executed() {
        let expected = [("Replace A", "B"), ("Binary Increment", "1100"), ("Even Ones", "1001")];

        for (name, final_tape) in expected {
            let sample = SampleManager::get_sample_by_name(name).unwrap();
            let mut machine = Machine::from_snapshot(sample, EngineConfig::default());

            let RunOutcome::Halted(report) = machine.run_to_halt(1000).unwrap() else {
                panic!("Sample '{}' did not halt", name);
            };
            assert_eq!(report.outcome, Outcome::Accept, "Sample '{}'", name);
            assert_eq!(report.final_tape, final_tape, "Sample '{}'", name);
        }
    }
}
