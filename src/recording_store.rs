use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::errors::{ControllerError, Result};
use crate::recording::Recording;

/// File stem a recording name is stored under.
pub fn sanitize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// A stem that stays a single file inside the recordings directory.
fn is_plain_file_stem(stem: &str) -> bool {
    !stem.starts_with('.') && !stem.contains("..") && !stem.contains(['/', '\\'])
}

/// Recordings indexed by name, backed by one JSON file per recording.
///
/// The index is only refreshed by [`RecordingStore::reload`]; files changed on
/// disk in the meantime are not noticed.
#[derive(Debug)]
pub struct RecordingStore {
    dir: PathBuf,
    recordings: Vec<Recording>,
}

impl RecordingStore {
    /// Opens the store, creating the directory when it does not exist yet.
    pub fn open(dir: impl Into<PathBuf>) -> Result<RecordingStore> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ControllerError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let mut store = RecordingStore {
            dir,
            recordings: Vec::new(),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn reload(&mut self) -> Result<()> {
        self.recordings = load_all(&self.dir)?;
        info!(
            "Loaded {} recordings from {}",
            self.recordings.len(),
            self.dir.display()
        );
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.recordings
            .iter()
            .map(|recording| recording.name().to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Recording> {
        self.recordings.iter().find(|recording| recording.name() == name)
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(name)))
    }

    /// Writes the recording to disk, then indexes it.
    ///
    /// Re-saving a name overwrites it. A different name that sanitizes to the
    /// same file is refused.
    pub fn save(&mut self, recording: Recording) -> Result<()> {
        let name = recording.name().to_string();
        let stem = sanitize_name(&name);
        if stem.is_empty() {
            return Err(ControllerError::Validation(
                "the recording name is empty".to_string(),
            ));
        }
        if !is_plain_file_stem(&stem) {
            return Err(ControllerError::Validation(format!(
                "the recording name '{}' must not contain path separators, '..' or start with '.'",
                name
            )));
        }
        if let Some(existing) = self
            .recordings
            .iter()
            .find(|other| other.name() != name && sanitize_name(other.name()) == stem)
        {
            return Err(ControllerError::NameCollision {
                name,
                existing: existing.name().to_string(),
                file: format!("{}.json", stem),
            });
        }

        let path = self.path_for(&name);
        let data = serde_json::to_string_pretty(&recording)?;
        debug!("Writing to {}", path.display());
        fs::write(&path, data).map_err(|source| ControllerError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match self.recordings.iter().position(|other| other.name() == name) {
            Some(index) => self.recordings[index] = recording,
            None => self.recordings.push(recording),
        }
        info!("Saved recording '{}' to {}", name, path.display());
        Ok(())
    }
}

/// Reads every `*.json` file of `dir`, in file name order.
///
/// Files that do not parse are skipped with a warning.
pub fn load_all(dir: &Path) -> Result<Vec<Recording>> {
    let entries = fs::read_dir(dir).map_err(|source| ControllerError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();

    let mut recordings: Vec<Recording> = Vec::new();
    for path in paths {
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<Recording>(&data).map_err(|e| e.to_string()));
        match parsed {
            Ok(recording) => {
                match recordings
                    .iter()
                    .position(|other| other.name() == recording.name())
                {
                    Some(index) => recordings[index] = recording,
                    None => recordings.push(recording),
                }
            }
            Err(reason) => warn!("Skipping {}: {}", path.display(), reason),
        }
    }
    Ok(recordings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{HttpMethod, SequenceRecording, SimpleRecording, Step};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;
    use test_case::test_case;

    fn simple(name: &str) -> Recording {
        Recording::Simple(SimpleRecording {
            name: name.to_string(),
            url: "https://example.test/items".to_string(),
            http_method: Some(HttpMethod::Post),
            headers: [("Authorization".to_string(), "Bearer abc".to_string())].into(),
            query_params: [("page".to_string(), "2".to_string())].into(),
            body: Some(json!({"title": "x", "tags": ["a", "b"], "n": 1.5})),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        })
    }

    fn sequence(name: &str) -> Recording {
        let mut arguments = serde_json::Map::new();
        arguments.insert("prompt".to_string(), json!("a cat"));
        arguments.insert("steps".to_string(), json!(20));
        arguments.insert("seed".to_string(), json!(null));
        Recording::Sequence(SequenceRecording {
            name: name.to_string(),
            target_url: "http://127.0.0.1:7860".to_string(),
            steps: vec![Step::new("/generate", arguments), Step::new("/reset", Default::default())],
            created_at: Utc::now(),
        })
    }

    #[test_case("My Call", "my_call")]
    #[test_case("ping", "ping")]
    #[test_case("Two  Spaces", "two__spaces")]
    fn sanitizes_names(name: &str, expected: &str) {
        assert_eq!(sanitize_name(name), expected);
    }

    #[test]
    fn round_trips_both_shapes() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        store.save(simple("Create Item")).unwrap();
        store.save(sequence("flow")).unwrap();
        assert!(dir.path().join("create_item.json").is_file());

        let reopened = RecordingStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("Create Item"), Some(&simple("Create Item")));
        assert_eq!(reopened.get("flow"), store.get("flow"));
    }

    #[test]
    fn resaving_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        store.save(simple("a")).unwrap();
        store.save(simple("b")).unwrap();
        store.save(sequence("a")).unwrap();
        assert_eq!(store.names(), vec!["a", "b"]);
        assert!(matches!(store.get("a"), Some(Recording::Sequence(_))));
    }

    #[test]
    fn refuses_names_sharing_a_file() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        store.save(simple("My Call")).unwrap();
        let err = store.save(simple("my call")).unwrap_err();
        assert!(matches!(err, ControllerError::NameCollision { .. }));
        assert_eq!(store.names(), vec!["My Call"]);
    }

    #[test_case("../escaped"; "parent directory")]
    #[test_case("nested/name"; "slash")]
    #[test_case("back\\slash"; "backslash")]
    #[test_case(".hidden"; "leading dot")]
    fn refuses_names_leaving_the_directory(name: &str) {
        let root = tempdir().unwrap();
        let dir = root.path().join("recordings");
        let mut store = RecordingStore::open(&dir).unwrap();
        assert!(matches!(
            store.save(simple(name)),
            Err(ControllerError::Validation(_))
        ));
        assert!(store.names().is_empty());
        assert!(!root.path().join("escaped.json").exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn keeps_dots_inside_names() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        store.save(simple("v1.2 release")).unwrap();
        assert!(dir.path().join("v1.2_release.json").is_file());
    }

    #[test]
    fn refuses_empty_names() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.save(simple("  ")),
            Err(ControllerError::Validation(_))
        ));
    }

    #[test]
    fn skips_unparsable_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        store.save(simple("ok")).unwrap();

        store.reload().unwrap();
        assert_eq!(store.names(), vec!["ok"]);
    }

    #[test]
    fn index_only_changes_on_reload() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::open(dir.path()).unwrap();
        let mut other = RecordingStore::open(dir.path()).unwrap();
        other.save(simple("late")).unwrap();

        assert!(store.get("late").is_none());
        store.reload().unwrap();
        assert!(store.get("late").is_some());
    }
}
