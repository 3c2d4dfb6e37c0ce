/*
 * project_path.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Computes the path from a rewritten document back to the project root.
 */

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, RewriteError};
use crate::job::{GenerateCopyOuter, JobContext};
use crate::paths;

/// Computes the `path2project` value of a document.
#[derive(Debug, Clone, Copy)]
pub struct ProjectPathCalculator<'a> {
    job: &'a JobContext,
}

impl<'a> ProjectPathCalculator<'a> {
    pub fn new(job: &'a JobContext) -> Self {
        Self { job }
    }

    /// Relative path from `topic` up to the project root, or `None` when
    /// the topic sits at the root itself.
    ///
    /// `original_relative` is the topic path as authored relative to the
    /// source root; only the legacy layout looks at it.
    pub fn path_to_project(
        &self,
        original_relative: &Path,
        topic: &Path,
        map: &Path,
    ) -> Result<Option<PathBuf>> {
        if self.job.generate_copy_outer() == GenerateCopyOuter::OldSolution {
            return Ok(uplevels(original_relative));
        }

        if self.is_outer(topic, map)? {
            let from_out = self.relative_dir_from_out(topic, map)?;
            return Ok(Some(from_out).filter(|p| !p.as_os_str().is_empty()));
        }

        let topic_dir = topic.parent().ok_or_else(|| missing(topic, "document has no directory"))?;
        let to_map = paths::relative_path(topic_dir, map)
            .ok_or_else(|| missing(topic, "document and map have different roots"))?;
        Ok(paths::non_empty_parent(&to_map))
    }

    /// Whether `topic` lies outside the directory of `map`.
    pub fn is_outer(&self, topic: &Path, map: &Path) -> Result<bool> {
        let map_dir = map.parent().ok_or_else(|| missing(map, "map has no directory"))?;
        let relative = paths::relative_path(map_dir, topic)
            .ok_or_else(|| missing(topic, "document and map have different roots"))?;
        Ok(paths::escapes_base(&relative))
    }

    /// Directory prefix leading from the output location of `file` back to
    /// the output directory, with a trailing `/`, or `./` when they coincide.
    pub fn relative_path_from_out(&self, file: &Path) -> Result<String> {
        let dir = self.relative_dir_from_out(file, self.job.input_map())?;
        if dir.as_os_str().is_empty() {
            Ok("./".to_string())
        } else {
            Ok(format!("{}/", paths::to_slash_path(&dir)))
        }
    }

    fn relative_dir_from_out(&self, file: &Path, map: &Path) -> Result<PathBuf> {
        let output_dir = self.job.output_dir();
        let map_dir = map.parent().ok_or_else(|| missing(map, "map has no directory"))?;
        let relative = paths::relative_path(map_dir, file)
            .ok_or_else(|| missing(file, "document and map have different roots"))?;

        let final_out = paths::normalize(&output_dir.join(relative))
            .ok_or_else(|| missing(file, "output location climbs above the file-system root"))?;
        let final_dir = final_out
            .parent()
            .ok_or_else(|| missing(file, "output location has no directory"))?;

        let to_index = paths::relative_path(final_dir, &output_dir.join("index.html"))
            .ok_or_else(|| missing(file, "output location and output directory have different roots"))?;
        Ok(to_index.parent().map(Path::to_path_buf).unwrap_or_default())
    }
}

/// One `..` per directory level of an authored relative path.
fn uplevels(relative: &Path) -> Option<PathBuf> {
    let levels = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
        .count()
        .saturating_sub(1);
    (levels > 0).then(|| (0..levels).map(|_| "..").collect())
}

fn missing(document: &Path, reason: &str) -> RewriteError {
    RewriteError::MissingDirective {
        directive: "path2project",
        document: document.to_path_buf(),
        reason: reason.to_string(),
    }
}
