use std::{fs, path::PathBuf};

use crate::Result;

/// A stored account session (`<name>.session`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionFile {
    pub name: String,
    pub path: PathBuf,
}

/// Lists session files in a directory. Operators pick accounts by index into
/// [`SessionCatalog::list`], so the order is sorted by file name.
#[derive(Clone, Debug)]
pub struct SessionCatalog {
    dir: PathBuf,
}

impl SessionCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn list(&self) -> Result<Vec<SessionFile>> {
        let rd = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for ent in rd.flatten() {
            let path = ent.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(".session") else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            out.push(SessionFile {
                name: name.to_string(),
                path,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    pub fn get(&self, index: usize) -> Result<Option<SessionFile>> {
        Ok(self.list()?.into_iter().nth(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sorted_session_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["zeta.session", "alpha.session", "notes.txt", ".session"] {
            std::fs::write(dir.path().join(f), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("dir.session")).unwrap();

        let catalog = SessionCatalog::new(dir.path());
        let names: Vec<String> = catalog.list().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(catalog.get(1).unwrap().map(|s| s.name), Some("zeta".to_string()));
        assert_eq!(catalog.get(2).unwrap(), None);
    }

    #[test]
    fn missing_dir_is_empty() {
        let catalog = SessionCatalog::new("/definitely/not/here");
        assert!(catalog.list().unwrap().is_empty());
    }
}
