/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source and output locations of one document in the set.
 */

use std::path::{Path, PathBuf};

use crate::job::JobContext;

/// One document of the set, with where it is read from and written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentSource {
    /// Path relative to the source root, as authored.
    pub relative_path: PathBuf,
    /// Absolute path of the source document.
    pub source_path: PathBuf,
    /// Absolute path of the rewritten document under the temp directory.
    pub output_path: PathBuf,
}

impl DocumentSource {
    pub fn new(job: &JobContext, relative_path: impl Into<PathBuf>) -> Self {
        let relative_path = relative_path.into();
        Self {
            source_path: job.source_root().join(&relative_path),
            output_path: job.temp_dir().join(&relative_path),
            relative_path,
        }
    }

    /// Build from an absolute source path inside the source root.
    pub fn from_source_path(job: &JobContext, source_path: &Path) -> Option<Self> {
        let relative = source_path.strip_prefix(job.source_root()).ok()?;
        Some(Self::new(job, relative))
    }

    /// Source path as a display string for diagnostics.
    pub fn display_path(&self) -> String {
        self.source_path.display().to_string()
    }
}
