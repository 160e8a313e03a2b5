//! Prompt Loader - role template overrides from a directory

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, TriloopError};
use crate::loops::Role;

/// Reads `<role>.md` overrides from `dir`
pub struct PromptLoader {
    dir: PathBuf,
}

impl PromptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, role: Role) -> PathBuf {
        self.dir.join(format!("{}.md", role.name()))
    }

    /// The override for `role`, or `None` when the directory has none
    pub fn load(&self, role: Role) -> Result<Option<String>> {
        let path = self.path_for(role);
        match fs::read_to_string(&path) {
            Ok(template) => Ok(Some(template)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TriloopError::Prompt(format!("read {}: {}", path.display(), e))),
        }
    }
}
