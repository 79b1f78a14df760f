//! This module provides the `SnapshotLoader` struct, responsible for reading
//! machine snapshots from files and strings and checking them before they are
//! handed to [`Machine::install_snapshot`](crate::machine::Machine::install_snapshot).

use crate::analyzer::check_references;
use crate::snapshot::Snapshot;
use crate::types::EngineError;
use std::fs;
use std::path::{Path, PathBuf};

/// `SnapshotLoader` loads snapshots from individual files, from string
/// content, and from every `.json` file in a directory. Every loaded snapshot
/// has passed [`check_references`].
pub struct SnapshotLoader;

impl SnapshotLoader {
    /// Loads a single snapshot from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(Snapshot)` if the file is read, parsed and referentially sound.
    /// * `Err(EngineError::FileError)` if the file cannot be read.
    /// * `Err(EngineError::SnapshotFormat)` if the content is not a snapshot.
    /// * `Err(EngineError::Validation)` if a cross reference does not resolve.
    pub fn load_snapshot(path: &Path) -> Result<Snapshot, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Self::load_snapshot_from_string(&content)
    }

    /// Loads a single snapshot from JSON text, e.g. pasted by the user.
    pub fn load_snapshot_from_string(content: &str) -> Result<Snapshot, EngineError> {
        let snapshot = Snapshot::from_json(content)?;
        check_references(&snapshot)?;
        Ok(snapshot)
    }

    /// Loads every snapshot file (`.json` extension) in `directory`.
    /// Directories and other files are skipped.
    pub fn load_snapshots(directory: &Path) -> Vec<Result<(PathBuf, Snapshot), EngineError>> {
        if !directory.exists() {
            return vec![Err(EngineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(EngineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(EngineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();
                if path.is_dir() || path.extension().is_none_or(|ext| ext != "json") {
                    return None;
                }

                match Self::load_snapshot(&path) {
                    Ok(snapshot) => Some(Ok((path, snapshot))),
                    Err(e) => Some(Err(EngineError::FileError(format!(
                        "Failed to load snapshot from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect();

        // read_dir order is platform dependent
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => std::cmp::Ordering::Equal,
        });
        results
    }

    /// Writes `snapshot` to `path` as pretty-printed JSON.
    pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), EngineError> {
        let content = snapshot.to_json()?;
        fs::write(path, content).map_err(|e| {
            EngineError::FileError(format!("Failed to write file {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisError;
    use crate::store::EntityStore;
    use crate::types::{Direction, LabelFields};
    use crate::vector::Vector;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const VALID: &str = r#"{
        "states": {
            "s1": { "id": "s1", "mnemonic": "q0", "position": { "x": 0, "y": 0 }, "isFinal": false },
            "s2": { "id": "s2", "mnemonic": "q1", "position": { "x": 200, "y": 0 }, "isFinal": true }
        },
        "startState": "s1",
        "edges": { "e1": { "id": "e1", "start": "s1", "end": "s2" } },
        "labels": { "l1": { "id": "l1", "edge": "e1", "read": "A", "write": "B", "move": "R" } },
        "controlPoints": { "c1": { "id": "c1", "edge": "e1", "position": { "x": 100, "y": 1 } } },
        "tape": { "0": "A" },
        "metadata": { "name": "Test Machine" }
    }"#;

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_valid_snapshot() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.json");
        write_file(&file_path, VALID);

        let snapshot = SnapshotLoader::load_snapshot(&file_path).unwrap();
        assert_eq!(snapshot.metadata.name, "Test Machine");
        assert_eq!(snapshot.states.len(), 2);
        assert_eq!(snapshot.tape.symbols(), "A");
    }

    #[test]
    fn test_load_invalid_json() {
        assert!(matches!(
            SnapshotLoader::load_snapshot_from_string("This is not a valid snapshot"),
            Err(EngineError::SnapshotFormat(_))
        ));
    }

    #[test]
    fn test_load_dangling_reference() {
        let broken = VALID.replace(r#""end": "s2""#, r#""end": "s9""#);
        assert!(matches!(
            SnapshotLoader::load_snapshot_from_string(&broken),
            Err(EngineError::Validation(AnalysisError::DanglingReference(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            SnapshotLoader::load_snapshot(&dir.path().join("missing.json")),
            Err(EngineError::FileError(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let mut store = EntityStore::new();
        let a = store.add_state(Vector::new(10.0, 20.0));
        store
            .add_transition(&a, &a, LabelFields::new('1', '0', Direction::Left))
            .unwrap();
        store.set_start_state(Some(&a)).unwrap();
        store.write_cell(-2, Some('1'));

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("saved.json");
        SnapshotLoader::save_snapshot(&file_path, store.committed()).unwrap();

        let loaded = SnapshotLoader::load_snapshot(&file_path).unwrap();
        assert_eq!(&loaded, store.committed());
    }

    #[test]
    fn test_load_snapshots_from_directory() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("valid.json"), VALID);
        write_file(&dir.path().join("invalid.json"), "{ \"states\": 3 }");
        write_file(&dir.path().join("ignored.txt"), "This file should be ignored");

        let results = SnapshotLoader::load_snapshots(dir.path());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_load_snapshots_missing_directory() {
        let dir = tempdir().unwrap();
        let results = SnapshotLoader::load_snapshots(&dir.path().join("nowhere"));
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
