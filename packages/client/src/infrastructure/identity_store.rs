//! File-backed identity store.
//!
//! A profile directory plays the role of one browser tab's local storage: a
//! flat JSON string map in `<profile>/identity.json`, rewritten on every set.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{domain::identity::KeyValueStore, error::IdentityError};

const FILE_NAME: &str = "identity.json";

#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileIdentityStore {
    /// Open the store of a profile directory, creating the directory if needed
    pub fn open(profile: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let dir = profile.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(FILE_NAME);
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Identity store opened at {}", path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), IdentityError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl KeyValueStore for FileIdentityStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError> {
        if self.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
