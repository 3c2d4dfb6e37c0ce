/*
 * job.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Read-only configuration for one rewriting run.
 */

//! Job configuration.
//!
//! A [`JobContext`] is built once, validated, and then shared read-only by
//! every document rewrite in the run. It can be built in code through
//! [`JobContextBuilder`] or loaded from YAML with [`JobContext::from_yaml_str`]:
//!
//! ```yaml
//! input-map: src/main.ditamap
//! output-dir: out
//! temp-dir: temp
//! generate-copy-outer: not-generate-outer
//! outer-control: warn
//! only-topic-in-map: false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RewriteError};
use crate::paths;

/// Policy for documents located outside the input map's directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerateCopyOuter {
    /// Outer documents stay where they are; output mirrors them under a
    /// segment named after the output directory.
    #[default]
    NotGenerateOuter,
    /// Outer documents are copied into the output tree.
    GenerateOuter,
    /// Legacy layout: one `..` per directory level of the authored path.
    OldSolution,
}

/// What to do when a reference crosses the map directory boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OuterControl {
    Fail,
    #[default]
    Warn,
    Quiet,
}

/// Serialized form of a job, with optional fields and possibly relative paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JobConfig {
    pub input_map: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub source_root: Option<PathBuf>,
    #[serde(default)]
    pub generate_copy_outer: GenerateCopyOuter,
    #[serde(default)]
    pub outer_control: OuterControl,
    #[serde(default)]
    pub only_topic_in_map: bool,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

/// Validated, immutable configuration for one run.
///
/// All paths are absolute and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    input_map: PathBuf,
    output_dir: PathBuf,
    temp_dir: PathBuf,
    source_root: PathBuf,
    generate_copy_outer: GenerateCopyOuter,
    outer_control: OuterControl,
    only_topic_in_map: bool,
    extensions: Vec<String>,
}

/// Extensions of markup documents whose references are rewritten.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".dita", ".ditamap"];

impl JobContext {
    pub fn builder(input_map: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> JobContextBuilder {
        JobContextBuilder {
            config: JobConfig {
                input_map: input_map.into(),
                output_dir: output_dir.into(),
                ..JobConfig::default()
            },
        }
    }

    /// Load a job from YAML. Relative paths are resolved against `base_dir`.
    pub fn from_yaml_str(yaml: &str, base_dir: &Path) -> Result<Self> {
        let config: JobConfig =
            serde_yaml::from_str(yaml).map_err(|e| RewriteError::Config(e.to_string()))?;
        Self::from_config(config, base_dir)
    }

    /// Resolve defaults and validate a deserialized job.
    pub fn from_config(config: JobConfig, base_dir: &Path) -> Result<Self> {
        let absolute = |name: &str, path: &Path| -> Result<PathBuf> {
            let joined = if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            };
            if !joined.is_absolute() {
                return Err(RewriteError::Config(format!(
                    "{} must be absolute or relative to an absolute base: {}",
                    name,
                    path.display()
                )));
            }
            paths::normalize(&joined).ok_or_else(|| {
                RewriteError::Config(format!("{} climbs above the root: {}", name, path.display()))
            })
        };

        if config.input_map.as_os_str().is_empty() {
            return Err(RewriteError::Config("input-map is required".to_string()));
        }
        if config.output_dir.as_os_str().is_empty() {
            return Err(RewriteError::Config("output-dir is required".to_string()));
        }

        let input_map = absolute("input-map", &config.input_map)?;
        let output_dir = absolute("output-dir", &config.output_dir)?;
        let temp_dir = match &config.temp_dir {
            Some(dir) => absolute("temp-dir", dir)?,
            None => output_dir.clone(),
        };
        let source_root = match &config.source_root {
            Some(dir) => absolute("source-root", dir)?,
            None => input_map
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| RewriteError::Config("input-map has no directory".to_string()))?,
        };
        let extensions = config
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect());

        let job = JobContext {
            input_map,
            output_dir,
            temp_dir,
            source_root,
            generate_copy_outer: config.generate_copy_outer,
            outer_control: config.outer_control,
            only_topic_in_map: config.only_topic_in_map,
            extensions,
        };
        job.validate()?;
        Ok(job)
    }

    /// Check cross-field consistency. Called by every constructor.
    pub fn validate(&self) -> Result<()> {
        if !self.input_map.starts_with(&self.source_root) {
            return Err(RewriteError::Config(format!(
                "input map {} is not inside the source root {}",
                self.input_map.display(),
                self.source_root.display()
            )));
        }
        if self.output_dir.parent().is_none() {
            return Err(RewriteError::Config(
                "output-dir must not be the file-system root".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(RewriteError::Config(
                "at least one markup extension is required".to_string(),
            ));
        }
        if let Some(bad) = self.extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(RewriteError::Config(format!(
                "extension `{}` must start with a dot",
                bad
            )));
        }
        Ok(())
    }

    pub fn input_map(&self) -> &Path {
        &self.input_map
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory rewritten documents are written to.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn generate_copy_outer(&self) -> GenerateCopyOuter {
        self.generate_copy_outer
    }

    pub fn outer_control(&self) -> OuterControl {
        self.outer_control
    }

    pub fn only_topic_in_map(&self) -> bool {
        self.only_topic_in_map
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a path names a map document.
    pub fn is_map(&self, path: &Path) -> bool {
        has_extension(&path.to_string_lossy(), &[".ditamap".to_string()])
    }
}

pub(crate) fn has_extension(path: &str, extensions: &[String]) -> bool {
    let lower = path.to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
}

/// Builder for [`JobContext`].
#[derive(Debug, Clone)]
pub struct JobContextBuilder {
    config: JobConfig,
}

impl JobContextBuilder {
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn source_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_root = Some(dir.into());
        self
    }

    pub fn generate_copy_outer(mut self, policy: GenerateCopyOuter) -> Self {
        self.config.generate_copy_outer = policy;
        self
    }

    pub fn outer_control(mut self, control: OuterControl) -> Self {
        self.config.outer_control = control;
        self
    }

    pub fn only_topic_in_map(mut self, only: bool) -> Self {
        self.config.only_topic_in_map = only;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Validate and build. Paths must be absolute.
    pub fn build(self) -> Result<JobContext> {
        JobContext::from_config(self.config, Path::new(""))
    }
}
