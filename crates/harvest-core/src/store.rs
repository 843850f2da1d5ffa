//! Flat-file identity store.
//!
//! Two append-only files, one line per entry:
//! - handles as `@name`
//! - numeric ids as decimal strings
//!
//! Entries are never removed except by [`IdentityStore::clear`].

use std::{
    collections::HashSet,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::{domain::UserId, errors::Error, Result};

#[derive(Debug, Default)]
struct Index {
    /// Lowercased handles (usernames are case-insensitive on the platform).
    handles: HashSet<String>,
    ids: HashSet<i64>,
}

#[derive(Debug)]
pub struct IdentityStore {
    handles_path: PathBuf,
    ids_path: PathBuf,
    index: Mutex<Index>,
}

impl IdentityStore {
    /// Open (creating if absent) both backing files and load their contents.
    pub fn open(handles_path: impl Into<PathBuf>, ids_path: impl Into<PathBuf>) -> Result<Self> {
        let handles_path = handles_path.into();
        let ids_path = ids_path.into();
        touch(&handles_path)?;
        touch(&ids_path)?;

        let mut index = Index::default();
        for h in read_lines(&handles_path)? {
            if let Some(h) = strip_handle_line(&h) {
                index.handles.insert(h.to_lowercase());
            }
        }
        for line in read_lines(&ids_path)? {
            match line.trim().parse::<i64>() {
                Ok(id) => {
                    index.ids.insert(id);
                }
                Err(_) if line.trim().is_empty() => {}
                Err(_) => {
                    tracing::warn!(path = %ids_path.display(), line = %line, "skipping malformed id line");
                }
            }
        }

        tracing::debug!(
            handles = index.handles.len(),
            ids = index.ids.len(),
            "identity store opened"
        );

        Ok(Self {
            handles_path,
            ids_path,
            index: Mutex::new(index),
        })
    }

    /// Open `usernames.txt` / `userids.txt` under `dir`.
    pub fn open_in(dir: &Path) -> Result<Self> {
        Self::open(dir.join("usernames.txt"), dir.join("userids.txt"))
    }

    pub fn handles_path(&self) -> &Path {
        &self.handles_path
    }

    pub fn ids_path(&self) -> &Path {
        &self.ids_path
    }

    pub fn contains_handle(&self, handle: &str) -> bool {
        let Some(h) = strip_handle_line(handle) else {
            return false;
        };
        self.lock().handles.contains(&h.to_lowercase())
    }

    pub fn contains_id(&self, id: UserId) -> bool {
        self.lock().ids.contains(&id.0)
    }

    /// Append `@handle` unless already stored. Returns `true` on an actual write.
    pub fn add_handle(&self, handle: &str) -> Result<bool> {
        let Some(h) = strip_handle_line(handle) else {
            return Err(Error::InvalidArgument("empty handle".to_string()));
        };

        let mut index = self.lock();
        let key = h.to_lowercase();
        if index.handles.contains(&key) {
            return Ok(false);
        }
        append_line(&self.handles_path, &format!("@{h}"))?;
        index.handles.insert(key);
        tracing::debug!(handle = %h, "stored handle");
        Ok(true)
    }

    /// Append the decimal id unless already stored. Returns `true` on an actual write.
    pub fn add_id(&self, id: UserId) -> Result<bool> {
        let mut index = self.lock();
        if index.ids.contains(&id.0) {
            return Ok(false);
        }
        append_line(&self.ids_path, &id.0.to_string())?;
        index.ids.insert(id.0);
        tracing::debug!(id = id.0, "stored id");
        Ok(true)
    }

    /// Truncate both files.
    pub fn clear(&self) -> Result<()> {
        let mut index = self.lock();
        File::create(&self.handles_path)?;
        File::create(&self.ids_path)?;
        index.handles.clear();
        index.ids.clear();
        tracing::info!("identity store cleared");
        Ok(())
    }

    /// All stored handles in file order, without the `@` prefix.
    ///
    /// Reads the file fresh on every call.
    pub fn all_handles(&self) -> Result<Vec<String>> {
        let _guard = self.lock();
        Ok(read_lines(&self.handles_path)?
            .iter()
            .filter_map(|l| strip_handle_line(l).map(str::to_string))
            .collect())
    }

    /// `(handles, ids)` currently stored.
    pub fn counts(&self) -> (usize, usize) {
        let index = self.lock();
        (index.handles.len(), index.ids.len())
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        // A poisoned index is still consistent: every mutation happens after its write.
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn strip_handle_line(line: &str) -> Option<&str> {
    let h = line.trim().trim_start_matches('@').trim();
    if h.is_empty() {
        None
    } else {
        Some(h)
    }
}

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents.lines().map(str::to_string).collect())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(format!("{line}\n").as_bytes())?;
    f.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_tmp() -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::open_in(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn creates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let store = IdentityStore::open_in(&nested).unwrap();
        assert!(store.handles_path().exists());
        assert!(store.ids_path().exists());
        assert_eq!(store.counts(), (0, 0));
    }

    #[test]
    fn handle_written_once_regardless_of_repeats() {
        let (_dir, store) = open_tmp();
        assert!(store.add_handle("alice").unwrap());
        assert!(!store.add_handle("@alice").unwrap());
        assert!(!store.add_handle("Alice").unwrap());
        assert!(store.add_handle("bob").unwrap());

        assert_eq!(store.all_handles().unwrap(), vec!["alice", "bob"]);
        let raw = std::fs::read_to_string(store.handles_path()).unwrap();
        assert_eq!(raw, "@alice\n@bob\n");
        assert!(store.contains_handle("@ALICE"));
    }

    #[test]
    fn ids_are_deduplicated() {
        let (_dir, store) = open_tmp();
        assert!(store.add_id(UserId(42)).unwrap());
        assert!(!store.add_id(UserId(42)).unwrap());
        assert!(store.contains_id(UserId(42)));
        let raw = std::fs::read_to_string(store.ids_path()).unwrap();
        assert_eq!(raw, "42\n");
    }

    #[test]
    fn reopen_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = IdentityStore::open_in(dir.path()).unwrap();
            store.add_handle("carol").unwrap();
            store.add_id(UserId(7)).unwrap();
        }
        let store = IdentityStore::open_in(dir.path()).unwrap();
        assert!(store.contains_handle("carol"));
        assert!(store.contains_id(UserId(7)));
        assert!(!store.add_handle("carol").unwrap());
    }

    #[test]
    fn clear_truncates_both_files() {
        let (_dir, store) = open_tmp();
        store.add_handle("dave").unwrap();
        store.add_id(UserId(9)).unwrap();
        store.clear().unwrap();

        assert_eq!(std::fs::read_to_string(store.handles_path()).unwrap(), "");
        assert_eq!(std::fs::read_to_string(store.ids_path()).unwrap(), "");
        assert!(!store.contains_handle("dave"));
        assert!(store.add_handle("dave").unwrap());
    }

    #[test]
    fn empty_handle_is_rejected() {
        let (_dir, store) = open_tmp();
        assert!(matches!(store.add_handle("@ "), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn all_handles_skips_blank_lines() {
        let (_dir, store) = open_tmp();
        std::fs::write(store.handles_path(), "@a\n\n@b\n").unwrap();
        assert_eq!(store.all_handles().unwrap(), vec!["a", "b"]);
    }
}
