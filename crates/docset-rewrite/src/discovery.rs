/*
 * discovery.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Collects the documents reachable from the input map.
 */

use std::collections::{HashSet, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use docset_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use docset_xml::{EventReader, XmlEvent};

use crate::conref::DelayedConrefs;
use crate::document::DocumentSource;
use crate::error::{Result, RewriteError};
use crate::job::JobContext;
use crate::keys::KeyLookup;
use crate::reference::{CONREF, CONREFEND, HREF, KEYREF, KeyrefResolution, ReferenceRewriter};

/// The documents of one run, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    documents: Vec<DocumentSource>,
    diagnostics: Vec<DiagnosticMessage>,
}

impl DocumentSet {
    /// A set of explicitly listed documents, relative to the source root.
    pub fn from_relative_paths<I, P>(job: &JobContext, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            documents: paths
                .into_iter()
                .map(|p| DocumentSource::new(job, p))
                .collect(),
            diagnostics: Vec::new(),
        }
    }

    /// Walk references breadth-first from the input map.
    ///
    /// `href` and `keyref` targets are followed from maps, and from topics
    /// too unless the job restricts discovery to topics named in maps.
    /// Content references are always followed. Targets that are missing or
    /// lie outside the source root are reported as warnings and skipped.
    pub fn discover(job: &JobContext, keys: &dyn KeyLookup) -> Result<Self> {
        let scratch = DelayedConrefs::new();
        let rewriter = ReferenceRewriter::new(job, keys, &scratch);

        let root = job.input_map().to_path_buf();
        let mut queue: VecDeque<(PathBuf, Option<SourceLocation>)> = VecDeque::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        queue.push_back((root.clone(), None));
        seen.insert(root.clone());

        let mut set = DocumentSet::default();

        while let Some((path, referenced_at)) = queue.pop_front() {
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) if path == root => return Err(RewriteError::io(&path, &err)),
                Err(err) => {
                    set.diagnostics.push(unreadable(&path, &err, referenced_at));
                    continue;
                }
            };
            let Some(document) = DocumentSource::from_source_path(job, &path) else {
                continue;
            };

            let follow_links = !job.only_topic_in_map() || job.is_map(&path);
            for (target, location) in set.collect_targets(&rewriter, &source, &path, follow_links) {
                if !target.starts_with(job.source_root()) {
                    set.diagnostics.push(
                        DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "D-2-6")
                            .problem(format!(
                                "{} is outside the source root {}",
                                target.display(),
                                job.source_root().display()
                            ))
                            .add_note("The document is not rewritten")
                            .with_location(location)
                            .build(),
                    );
                    continue;
                }
                if seen.insert(target.clone()) {
                    queue.push_back((target, Some(location)));
                }
            }

            tracing::trace!(document = %path.display(), "discovered document");
            set.documents.push(document);
        }

        tracing::debug!(
            documents = set.documents.len(),
            warnings = set.diagnostics.len(),
            "discovery finished"
        );
        Ok(set)
    }

    /// Local markup documents referenced from one source document.
    fn collect_targets(
        &mut self,
        rewriter: &ReferenceRewriter<'_>,
        source: &str,
        path: &Path,
        follow_links: bool,
    ) -> Vec<(PathBuf, SourceLocation)> {
        let file = path.display().to_string();
        let mut targets = Vec::new();

        for event in EventReader::new(source) {
            let tag = match event {
                Ok(XmlEvent::Start(tag)) => tag,
                Ok(_) => continue,
                Err(err) => {
                    // Rewriting reports the same error as fatal; keep what was found.
                    let mut diagnostic = err.in_file(&file).to_diagnostic();
                    diagnostic.kind = DiagnosticKind::Warning;
                    self.diagnostics.push(diagnostic);
                    break;
                }
            };
            let location = tag.location.clone().in_file(file.clone());

            if follow_links {
                let keyed = tag
                    .get_attribute(KEYREF)
                    .map(|keyref| rewriter.resolve_keyref(keyref, path));
                match keyed {
                    Some(KeyrefResolution::Href {
                        target: Some(target),
                        ..
                    }) => targets.push((target, location.clone())),
                    Some(KeyrefResolution::Href { .. }) => {}
                    _ => {
                        if let Some(href) = tag.get_attribute(HREF)
                            && let Ok(resolved) = rewriter.replace_href(href, &tag, path)
                            && let Some(target) = resolved.target
                        {
                            targets.push((target, location.clone()));
                        }
                    }
                }
            }

            for attribute in [CONREF, CONREFEND] {
                if let Some(value) = tag.get_attribute(attribute)
                    && let Ok(resolved) = rewriter.replace_conref(value, path)
                    && let Some(target) = resolved.target
                {
                    targets.push((target, location.clone()));
                }
            }
        }

        targets
    }

    pub fn documents(&self) -> &[DocumentSource] {
        &self.documents
    }

    /// Warnings raised while discovering documents.
    pub fn diagnostics(&self) -> &[DiagnosticMessage] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn unreadable(path: &Path, err: &std::io::Error, referenced_at: Option<SourceLocation>) -> DiagnosticMessage {
    let code = if err.kind() == ErrorKind::NotFound {
        "D-2-6"
    } else {
        "D-2-5"
    };
    DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, code)
        .problem(format!("Cannot read {}", path.display()))
        .add_detail(err.to_string())
        .with_optional_location(referenced_at)
        .build()
}
