use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::answers::{AnswerSet, AnswerValue, Answers, Meta};
use crate::error::{FormError, Result};

/// Best-effort local persistence of in-progress answers, keyed by form id.
pub trait RecoveryStore {
    fn load(&self, form_id: &str) -> Result<Option<AnswerSet>>;
    fn save(&mut self, snapshot: &AnswerSet) -> Result<()>;
    fn clear(&mut self, form_id: &str) -> Result<()>;
}

/// In-memory recovery log. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecovery {
    entries: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, form_id: &str) -> bool {
        self.entries.borrow().contains_key(form_id)
    }
}

impl RecoveryStore for MemoryRecovery {
    fn load(&self, form_id: &str) -> Result<Option<AnswerSet>> {
        match self.entries.borrow().get(form_id) {
            Some(bytes) => Ok(Some(AnswerSet::from_cbor(bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, snapshot: &AnswerSet) -> Result<()> {
        let bytes = snapshot.to_cbor()?;
        self.entries
            .borrow_mut()
            .insert(snapshot.form_id.clone(), bytes);
        Ok(())
    }

    fn clear(&mut self, form_id: &str) -> Result<()> {
        self.entries.borrow_mut().remove(form_id);
        Ok(())
    }
}

/// One CBOR file per form inside a directory.
#[derive(Debug, Clone)]
pub struct DirectoryRecovery {
    root: PathBuf,
}

impl DirectoryRecovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, form_id: &str) -> PathBuf {
        let safe: String = form_id
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.cbor", safe))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> FormError {
    FormError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl RecoveryStore for DirectoryRecovery {
    fn load(&self, form_id: &str) -> Result<Option<AnswerSet>> {
        let path = self.path_for(form_id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(AnswerSet::from_cbor(&bytes)?)),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        }
    }

    fn save(&mut self, snapshot: &AnswerSet) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|err| io_error(&self.root, err))?;
        let path = self.path_for(&snapshot.form_id);
        let bytes = snapshot.to_cbor()?;
        fs::write(&path, bytes).map_err(|err| io_error(&path, err))
    }

    fn clear(&mut self, form_id: &str) -> Result<()> {
        let path = self.path_for(form_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        }
    }
}

/// The respondent's answers for one session.
///
/// Every mutation is mirrored to the recovery store when one is attached;
/// persistence failures are logged and never surface to the caller.
pub struct AnswerStore {
    form_id: String,
    spec_version: String,
    values: Answers,
    recovery: Option<Box<dyn RecoveryStore>>,
}

impl std::fmt::Debug for AnswerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStore")
            .field("form_id", &self.form_id)
            .field("values", &self.values)
            .field("recovery", &self.recovery.is_some())
            .finish()
    }
}

impl AnswerStore {
    pub fn new(form_id: impl Into<String>, spec_version: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            spec_version: spec_version.into(),
            values: Answers::new(),
            recovery: None,
        }
    }

    pub fn with_recovery(mut self, recovery: Box<dyn RecoveryStore>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// Reads the recovery log once; returns the recovered answers, if any.
    pub fn recover(&self) -> Option<Answers> {
        let recovery = self.recovery.as_ref()?;
        match recovery.load(&self.form_id) {
            Ok(Some(snapshot)) if snapshot.form_id == self.form_id => {
                if snapshot.spec_version != self.spec_version {
                    log::debug!(
                        "recovering answers saved for version {} of form {}",
                        snapshot.spec_version,
                        self.form_id
                    );
                }
                Some(snapshot.answers)
            }
            Ok(_) => None,
            Err(err) => {
                log::warn!("could not read recovery log for {}: {}", self.form_id, err);
                None
            }
        }
    }

    /// Replaces the contents without persisting (session bootstrap).
    pub fn replace(&mut self, values: Answers) {
        self.values = values;
    }

    pub fn get(&self, block_id: &str) -> Option<&AnswerValue> {
        self.values.get(block_id)
    }

    pub fn answers(&self) -> &Answers {
        &self.values
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn set(&mut self, block_id: &str, value: AnswerValue, now_ms: u64) {
        self.values.insert(block_id.to_string(), value);
        self.persist(now_ms);
    }

    pub fn remove(&mut self, block_id: &str, now_ms: u64) {
        if self.values.remove(block_id).is_some() {
            self.persist(now_ms);
        }
    }

    /// Drops every answer and the recovery entry.
    pub fn clear(&mut self) {
        self.values.clear();
        if let Some(recovery) = self.recovery.as_mut()
            && let Err(err) = recovery.clear(&self.form_id)
        {
            log::warn!("could not clear recovery log for {}: {}", self.form_id, err);
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> AnswerSet {
        AnswerSet {
            form_id: self.form_id.clone(),
            spec_version: self.spec_version.clone(),
            answers: self.values.clone(),
            meta: Some(Meta {
                saved_at_ms: Some(now_ms),
            }),
        }
    }

    fn persist(&mut self, now_ms: u64) {
        let snapshot = self.snapshot(now_ms);
        if let Some(recovery) = self.recovery.as_mut()
            && let Err(err) = recovery.save(&snapshot)
        {
            log::warn!("could not persist answers for {}: {}", self.form_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_recovery_sanitizes_form_ids() {
        let recovery = DirectoryRecovery::new("/tmp/forms");
        assert_eq!(
            recovery.path_for("../evil/form"),
            PathBuf::from("/tmp/forms/___evil_form.cbor")
        );
    }

    #[test]
    fn store_mirrors_mutations_to_recovery() {
        let recovery = MemoryRecovery::new();
        let mut store =
            AnswerStore::new("contact", "1").with_recovery(Box::new(recovery.clone()));
        store.set("name", AnswerValue::Text("Ada".into()), 10);
        let saved = recovery.load("contact").expect("load").expect("snapshot");
        assert_eq!(saved.answers.get("name"), Some(&AnswerValue::Text("Ada".into())));

        store.clear();
        assert!(!recovery.contains("contact"));
        assert!(store.answers().is_empty());
    }

    #[test]
    fn recover_ignores_other_forms() {
        let mut recovery = MemoryRecovery::new();
        let mut snapshot = AnswerSet::new("other", "1");
        snapshot
            .answers
            .insert("x".into(), AnswerValue::Bool(true));
        recovery.save(&snapshot).expect("save");
        let store = AnswerStore::new("contact", "1").with_recovery(Box::new(recovery));
        assert!(store.recover().is_none());
    }
}
