/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Normalization of reference values into relative, escaped URIs.
 */

//! Reference resolution.
//!
//! Every local reference to a markup document goes through the same steps:
//! resolve it to an absolute path, normalize that path, express it relative
//! to the directory of the file being rewritten, and escape each segment.
//! A relative reference and a `file:` URI naming the same document therefore
//! produce the same output.

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::MalformedReference;
use crate::job::{JobContext, has_extension};
use crate::paths;

/// A URI scheme of at least two characters. Single letters are drive names.
static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:").expect("valid scheme regex"));

/// Syntactic class of a reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `#topic/elem`
    FragmentOnly,
    /// `a.dita`, `a.dita#x`
    SameDirectory,
    /// `sub/a.dita`, `../a.dita`
    Relative,
    /// `/abs/a.dita` or `file:/abs/a.dita`
    AbsoluteFile,
    /// `https://example.com/a.dita`, `mailto:...`
    AbsoluteUri,
}

/// The outcome of resolving one reference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Value to write back into the attribute.
    pub uri: String,
    pub kind: ReferenceKind,
    pub fragment: Option<String>,
    /// Absolute normalized path of the referenced document, when the value
    /// was rewritten.
    pub target: Option<PathBuf>,
    /// Whether `target` lies inside the source root.
    pub in_source_tree: bool,
}

impl ResolvedReference {
    /// A value passed through as written.
    pub fn unchanged(raw: &str) -> Self {
        Self::unchanged_as(raw, PathResolver::classify(raw), split_fragment(raw).1)
    }

    fn unchanged_as(raw: &str, kind: ReferenceKind, fragment: Option<&str>) -> Self {
        Self {
            uri: raw.to_string(),
            kind,
            fragment: fragment.map(str::to_string),
            target: None,
            in_source_tree: false,
        }
    }

    /// Whether the value was rewritten rather than passed through.
    pub fn is_rewritten(&self) -> bool {
        self.target.is_some()
    }
}

impl fmt::Display for ResolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Resolves reference attribute values against the file being rewritten.
#[derive(Debug, Clone)]
pub struct PathResolver {
    extensions: Vec<String>,
}

impl PathResolver {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    pub fn for_job(job: &JobContext) -> Self {
        Self::new(job.extensions().to_vec())
    }

    pub fn classify(raw: &str) -> ReferenceKind {
        let path = split_fragment(raw).0;
        if path.is_empty() {
            ReferenceKind::FragmentOnly
        } else if let Some(scheme) = SCHEME.find(path) {
            if scheme.as_str().eq_ignore_ascii_case("file:") {
                ReferenceKind::AbsoluteFile
            } else {
                ReferenceKind::AbsoluteUri
            }
        } else if Path::new(path).is_absolute() || path.starts_with('/') {
            ReferenceKind::AbsoluteFile
        } else if path.contains('/') || path.contains('\\') {
            ReferenceKind::Relative
        } else {
            ReferenceKind::SameDirectory
        }
    }

    /// Resolve `raw` as written in `current_file`.
    ///
    /// Fragment-only values, non-file URIs and references to files without a
    /// markup extension come back unchanged.
    pub fn resolve(
        &self,
        raw: &str,
        current_file: &Path,
        source_root: &Path,
    ) -> Result<ResolvedReference, MalformedReference> {
        let current_dir = current_file
            .parent()
            .ok_or_else(|| MalformedReference::new(raw, "the current file has no directory"))?;
        self.resolve_with_base(raw, current_dir, current_dir, source_root)
    }

    /// Resolve `raw` relative to `base_dir` and express it relative to `current_dir`.
    ///
    /// Used for key targets, which are written relative to the map that
    /// defines the key rather than to the file using it.
    pub fn resolve_with_base(
        &self,
        raw: &str,
        base_dir: &Path,
        current_dir: &Path,
        source_root: &Path,
    ) -> Result<ResolvedReference, MalformedReference> {
        let is_markup = |path: &str| has_extension(path, &self.extensions);

        if raw.contains('\0') {
            return Err(MalformedReference::new(raw, "contains a NUL character"));
        }

        let (path, fragment) = split_fragment(raw);
        let kind = Self::classify(raw);

        let absolute = match kind {
            ReferenceKind::FragmentOnly | ReferenceKind::AbsoluteUri => {
                return Ok(ResolvedReference::unchanged_as(raw, kind, fragment));
            }
            ReferenceKind::AbsoluteFile if SCHEME.is_match(path) => {
                let url = Url::parse(path)
                    .map_err(|e| MalformedReference::new(raw, format!("invalid file URI: {}", e)))?;
                if !is_markup(url.path()) {
                    return Ok(ResolvedReference::unchanged_as(raw, kind, fragment));
                }
                match url.host_str() {
                    None | Some("") | Some("localhost") => {}
                    Some(host) => {
                        return Err(MalformedReference::new(
                            raw,
                            format!("file URI names the remote host `{}`", host),
                        ));
                    }
                }
                url.to_file_path()
                    .map_err(|_| MalformedReference::new(raw, "file URI has no local path"))?
            }
            ReferenceKind::AbsoluteFile => {
                if !is_markup(path) {
                    return Ok(ResolvedReference::unchanged_as(raw, kind, fragment));
                }
                PathBuf::from(path)
            }
            ReferenceKind::SameDirectory | ReferenceKind::Relative => {
                if !is_markup(path) {
                    return Ok(ResolvedReference::unchanged_as(raw, kind, fragment));
                }
                let decoded = paths::decode_lenient(path);
                base_dir.join(decoded.replace('\\', "/"))
            }
        };

        let target = paths::normalize(&absolute)
            .ok_or_else(|| MalformedReference::new(raw, "path climbs above the file-system root"))?;
        let relative = paths::relative_path(current_dir, &target).ok_or_else(|| {
            MalformedReference::new(raw, "target and current file have different roots")
        })?;

        let mut uri = paths::to_uri_path(&relative);
        if let Some(fragment) = fragment {
            uri.push('#');
            uri.push_str(fragment);
        }

        Ok(ResolvedReference {
            uri,
            kind,
            fragment: fragment.map(str::to_string),
            in_source_tree: target.starts_with(source_root),
            target: Some(target),
        })
    }
}

/// Split at the first `#` into path and fragment.
pub(crate) fn split_fragment(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (raw, None),
    }
}
