//! Servo positions and their YAML documents.
//!
//! Two documents exist on disk: the most-recent one, written when a session
//! ends and read when the next one starts, and the named one, written only
//! when the operator asks to save. Neither ever touches the other.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::api::{Actuator, Position};
use crate::{Error, Result};

/// A persisted mapping. May name fewer than six servos.
pub type Document = BTreeMap<Actuator, Position>;

/// One position for every servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot([Position; 6]);

impl Snapshot {
    pub fn uniform(position: Position) -> Self {
        Snapshot([position; 6])
    }

    pub fn get(&self, actuator: Actuator) -> Position {
        self.0[actuator.index()]
    }

    pub fn set(&mut self, actuator: Actuator, position: Position) {
        self.0[actuator.index()] = position;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Actuator, Position)> + '_ {
        Actuator::ALL.into_iter().map(move |a| (a, self.get(a)))
    }

    /// Entries present in `document` win, the rest come from `self`.
    pub fn merge(mut self, document: &Document) -> Self {
        for (&actuator, &position) in document {
            self.set(actuator, position);
        }
        self
    }

    pub fn to_document(&self) -> Document {
        self.iter().collect()
    }
}

/// Where the two documents live.
#[derive(Debug, Clone)]
pub struct Documents {
    pub recent: PathBuf,
    pub named: PathBuf,
}

/// Reads the document at `path` over `defaults`.
///
/// A missing, empty or unreadable document yields `defaults` unchanged;
/// this never fails.
pub fn load(path: &Path, defaults: &Snapshot) -> Snapshot {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no saved positions, using defaults");
            return *defaults;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read saved positions, using defaults");
            return *defaults;
        }
    };

    match parse(&contents) {
        Ok(Some(document)) => {
            if document.len() < Actuator::ALL.len() {
                info!(
                    path = %path.display(),
                    found = document.len(),
                    "saved positions are partial, filling the rest with defaults"
                );
            }
            defaults.merge(&document)
        }
        Ok(None) => {
            info!(path = %path.display(), "saved positions are empty, using defaults");
            *defaults
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "saved positions are invalid, using defaults");
            *defaults
        }
    }
}

fn parse(contents: &str) -> Result<Option<Document>> {
    if contents.trim().is_empty() {
        return Ok(None);
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Overwrites `path` with `document`. Not atomic.
pub fn save(document: &Document, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(document)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, yaml).map_err(|source| Error::WriteError {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), entries = document.len(), "saved positions");
    Ok(())
}

/// The commanded position of every servo for this process.
#[derive(Debug, Clone)]
pub struct PositionStore {
    snapshot: Snapshot,
}

impl PositionStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn load(path: &Path, defaults: &Snapshot) -> Self {
        Self::new(load(path, defaults))
    }

    pub fn get(&self, actuator: Actuator) -> Position {
        self.snapshot.get(actuator)
    }

    /// Records `position` for `actuator`. Out of range values are rejected
    /// and the stored position is left as it was.
    pub fn set(&mut self, actuator: Actuator, position: Position) -> Result<()> {
        self.snapshot.set(actuator, position.validate()?);
        Ok(())
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn save_all(&self, path: &Path) -> Result<()> {
        save(&self.snapshot.to_document(), path)
    }

    pub fn save_one(&self, actuator: Actuator, path: &Path) -> Result<()> {
        let document = Document::from([(actuator, self.get(actuator))]);
        save(&document, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_document(path: &Path) -> Document {
        serde_yaml::from_str(&fs::read_to_string(path).expect("read")).expect("parse")
    }

    #[test]
    fn load_missing_returns_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        for defaults in [Snapshot::uniform(Position::Off), Snapshot::uniform(Position::MID)] {
            let loaded = load(&temp.path().join("recent.yaml"), &defaults);
            assert_eq!(loaded, defaults);
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("recent.yaml");

        let mut snapshot = Snapshot::uniform(Position::MID);
        snapshot.set(Actuator::Claw, Position::At(0));
        snapshot.set(Actuator::Wrist, Position::At(100));
        snapshot.set(Actuator::Base, Position::Off);
        save(&snapshot.to_document(), &path).expect("save");

        let loaded = load(&path, &Snapshot::uniform(Position::Off));
        assert_eq!(loaded, snapshot);
        assert_eq!(read_document(&path).len(), 6);
    }

    #[test]
    fn document_format_is_plain_names_and_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.yaml");
        let mut snapshot = Snapshot::uniform(Position::Off);
        snapshot.set(Actuator::LowerArm, Position::At(30));
        save(&snapshot.to_document(), &path).expect("save");

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.contains("lower_arm: 30"), "{}", text);
        assert!(text.lines().any(|l| l.starts_with("claw:") && l.contains("off")), "{}", text);
    }

    #[test]
    fn reads_hand_written_documents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("recent.yaml");
        fs::write(
            &path,
            "base: 10\nclaw: 90\nlower_arm: off\nshoulder: 50\nupper_arm: 0\nwrist: 100\n",
        )
        .expect("write");

        let loaded = load(&path, &Snapshot::uniform(Position::Off));
        assert_eq!(loaded.get(Actuator::Base), Position::At(10));
        assert_eq!(loaded.get(Actuator::Claw), Position::At(90));
        assert_eq!(loaded.get(Actuator::LowerArm), Position::Off);
        assert_eq!(loaded.get(Actuator::Wrist), Position::At(100));
    }

    #[test]
    fn partial_document_is_merged_with_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("recent.yaml");
        fs::write(&path, "claw: 75\n").expect("write");

        let loaded = load(&path, &Snapshot::uniform(Position::MID));
        assert_eq!(loaded.get(Actuator::Claw), Position::At(75));
        for actuator in &Actuator::ALL[1..] {
            assert_eq!(loaded.get(*actuator), Position::MID);
        }
    }

    #[test]
    fn unusable_documents_fall_back_to_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("recent.yaml");
        let defaults = Snapshot::uniform(Position::Off);

        for contents in [
            "",
            "   \n",
            "~\n",
            "just a string\n",
            "- 1\n- 2\n",
            "claw: 150\n",
            "claw: -3\n",
            "elbow: 20\n",
            "claw: [1, 2]\n",
        ] {
            fs::write(&path, contents).expect("write");
            assert_eq!(load(&path, &defaults), defaults, "contents {:?}", contents);
        }
    }

    #[test]
    fn save_overwrites_previous_document() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("servo_states.yaml");

        save(&Snapshot::uniform(Position::MID).to_document(), &path).expect("save");
        let document = Document::from([(Actuator::Shoulder, Position::At(12))]);
        save(&document, &path).expect("save");

        assert_eq!(read_document(&path), document);
    }

    #[test]
    fn save_creates_parent_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state").join("arm").join("recent.yaml");
        save(&Snapshot::uniform(Position::Off).to_document(), &path).expect("save");
        assert!(path.exists());
    }

    #[test]
    fn store_save_one_writes_a_single_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("servo_states.yaml");

        let mut store = PositionStore::new(Snapshot::uniform(Position::Off));
        store.set(Actuator::Claw, Position::At(75)).expect("set");
        store.save_one(Actuator::Claw, &path).expect("save");

        assert_eq!(
            read_document(&path),
            Document::from([(Actuator::Claw, Position::At(75))])
        );
    }

    #[test]
    fn store_set_rejects_out_of_range() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("recent.yaml");

        let mut store = PositionStore::new(Snapshot::uniform(Position::MID));
        store.set(Actuator::Wrist, Position::At(30)).expect("set");
        assert!(matches!(
            store.set(Actuator::Wrist, Position::At(150)),
            Err(Error::PositionOutOfRange(150))
        ));
        assert_eq!(store.get(Actuator::Wrist), Position::At(30));

        store.save_all(&path).expect("save");
        let reloaded = load(&path, &Snapshot::uniform(Position::Off));
        assert_eq!(reloaded, *store.snapshot());
    }

    #[test]
    fn store_set_is_idempotent() {
        let mut store = PositionStore::new(Snapshot::uniform(Position::Off));
        store.set(Actuator::Wrist, Position::At(20)).expect("set");
        let once = *store.snapshot();
        store.set(Actuator::Wrist, Position::At(20)).expect("set");
        assert_eq!(*store.snapshot(), once);
    }
}
