/*
 * conref.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Bookkeeping for content references whose target is not rewritten yet.
 */

//! Deferred content references.
//!
//! A document may pull content from a document that hasn't been rewritten
//! yet. The rewriter stages such references per document; they only become
//! visible once the document completes ([`ConrefRegistry::flush`]) and are
//! dropped if it fails ([`ConrefRegistry::discard`]).

use std::path::{Path, PathBuf};

use dashmap::{DashMap, DashSet};
use docset_diagnostics::SourceLocation;

/// A content reference waiting for its target document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConref {
    /// Absolute path of the document containing the reference.
    pub document: PathBuf,
    /// Absolute path of the referenced document.
    pub target: PathBuf,
    /// Rewritten attribute value.
    pub reference: String,
    pub element: String,
    pub location: SourceLocation,
}

/// Shared registry of deferred content references.
pub trait ConrefRegistry: Send + Sync {
    /// Stage a reference found while rewriting `document`.
    fn register_pending(&self, conref: PendingConref, document: &Path);

    /// Publish everything staged for `document`.
    fn flush(&self, document: &Path);

    /// Drop everything staged for `document`.
    fn discard(&self, document: &Path);

    /// Whether `target` has already been rewritten.
    fn is_available(&self, target: &Path) -> bool;
}

/// Thread-safe [`ConrefRegistry`] keyed by absolute document path.
#[derive(Debug, Default)]
pub struct DelayedConrefs {
    staged: DashMap<PathBuf, Vec<PendingConref>>,
    waiting: DashMap<PathBuf, Vec<PendingConref>>,
    available: DashSet<PathBuf>,
}

impl DelayedConrefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `document` has been rewritten, returning the references
    /// that were waiting for it.
    pub fn mark_available(&self, document: &Path) -> Vec<PendingConref> {
        self.available.insert(document.to_path_buf());
        self.waiting
            .remove(document)
            .map(|(_, conrefs)| conrefs)
            .unwrap_or_default()
    }

    /// References still waiting for their target, ordered by document and position.
    pub fn unresolved(&self) -> Vec<PendingConref> {
        let mut all: Vec<PendingConref> = self
            .waiting
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| {
            (&a.document, a.location.line, a.location.column)
                .cmp(&(&b.document, b.location.line, b.location.column))
        });
        all
    }

    /// Number of references staged for a document that hasn't completed.
    pub fn staged_count(&self, document: &Path) -> usize {
        self.staged.get(document).map_or(0, |v| v.len())
    }
}

impl ConrefRegistry for DelayedConrefs {
    fn register_pending(&self, conref: PendingConref, document: &Path) {
        self.staged
            .entry(document.to_path_buf())
            .or_default()
            .push(conref);
    }

    fn flush(&self, document: &Path) {
        let Some((_, conrefs)) = self.staged.remove(document) else {
            return;
        };
        for conref in conrefs {
            // Hold the shard lock while checking availability so a
            // concurrent mark_available either sees this entry or we see it.
            let mut waiting = self.waiting.entry(conref.target.clone()).or_default();
            if self.available.contains(&conref.target) {
                continue;
            }
            waiting.push(conref);
        }
        self.waiting.retain(|_, v| !v.is_empty());
    }

    fn discard(&self, document: &Path) {
        self.staged.remove(document);
    }

    fn is_available(&self, target: &Path) -> bool {
        self.available.contains(target)
    }
}
