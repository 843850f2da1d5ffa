//! Runtime capture toggles, persisted as JSON so front ends can flip them.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Which identifier classes an extraction writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub handles: bool,
    pub ids: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            handles: true,
            ids: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureToggle {
    Handles,
    Ids,
}

/// JSON-file backed [`CaptureSettings`].
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: CaptureSettings,
}

impl SettingsStore {
    /// Load from `path`, falling back to `defaults` when the file does not exist yet.
    pub fn load(path: impl Into<PathBuf>, defaults: CaptureSettings) -> Result<Self> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(txt) => serde_json::from_str(&txt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => defaults,
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, current })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> CaptureSettings {
        self.current
    }

    /// Flip one toggle and persist. Returns the new value of that toggle.
    pub fn toggle(&mut self, which: CaptureToggle) -> Result<bool> {
        let mut next = self.current;
        let value = match which {
            CaptureToggle::Handles => {
                next.handles = !next.handles;
                next.handles
            }
            CaptureToggle::Ids => {
                next.ids = !next.ids;
                next.ids
            }
        };
        self.save(next)?;
        Ok(value)
    }

    fn save(&mut self, next: CaptureSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&next)?)?;
        self.current = next;
        tracing::info!(handles = next.handles, ids = next.ids, "capture settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = CaptureSettings {
            handles: false,
            ids: true,
        };
        let s = SettingsStore::load(dir.path().join("settings.json"), defaults).unwrap();
        assert_eq!(s.current(), defaults);
    }

    #[test]
    fn toggles_persist_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = SettingsStore::load(&path, CaptureSettings::default()).unwrap();
        assert!(!s.toggle(CaptureToggle::Ids).unwrap());
        assert!(!s.toggle(CaptureToggle::Handles).unwrap());
        assert!(s.toggle(CaptureToggle::Handles).unwrap());

        let reloaded = SettingsStore::load(&path, CaptureSettings::default()).unwrap();
        assert_eq!(
            reloaded.current(),
            CaptureSettings {
                handles: true,
                ids: false
            }
        );
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SettingsStore::load(&path, CaptureSettings::default()).is_err());
    }
}
