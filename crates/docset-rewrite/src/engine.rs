/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Streams one document through reference rewriting, filtering and
 * traceability stamping.
 */

use std::path::Path;

use docset_diagnostics::DiagnosticMessage;
use docset_xml::{EventReader, EventWriter, XmlEvent};

use crate::conref::ConrefRegistry;
use crate::document::DocumentSource;
use crate::error::{Result, RewriteError};
use crate::filter::FilterGate;
use crate::job::JobContext;
use crate::keys::KeyLookup;
use crate::paths;
use crate::project_path::ProjectPathCalculator;
use crate::reference::ReferenceRewriter;
use crate::trace::TraceabilityAnnotator;

pub const PATH2PROJECT: &str = "path2project";
pub const WORKDIR: &str = "workdir";

/// Shared, read-only collaborators of a rewrite run.
#[derive(Clone, Copy)]
pub struct RewriteContext<'a> {
    pub job: &'a JobContext,
    pub keys: &'a dyn KeyLookup,
    pub filter: &'a dyn FilterGate,
    pub conrefs: &'a dyn ConrefRegistry,
}

/// A rewritten document, not yet written to disk.
#[derive(Debug)]
pub struct DocumentReport {
    pub document: DocumentSource,
    pub output: Vec<u8>,
    /// Attribute values changed across the document.
    pub rewritten_references: usize,
    /// Elements dropped by the filter, counting subtree roots only.
    pub filtered_elements: usize,
    pub unresolved_keys: Vec<String>,
    pub warnings: Vec<DiagnosticMessage>,
}

/// Rewrites a single document.
///
/// The document is either fully rewritten or not at all: any fatal error
/// discards both the output buffer and the content references staged for
/// the document. On success the staged references stay staged until the
/// caller has stored the output and calls [`ConrefRegistry::flush`].
pub struct DocumentRewriteEngine<'a> {
    ctx: RewriteContext<'a>,
    document: &'a DocumentSource,
}

impl<'a> DocumentRewriteEngine<'a> {
    pub fn new(ctx: RewriteContext<'a>, document: &'a DocumentSource) -> Self {
        Self { ctx, document }
    }

    pub fn rewrite(&self, source: &str) -> Result<DocumentReport> {
        self.rewrite_events(source).inspect_err(|_| {
            self.ctx.conrefs.discard(&self.document.source_path);
        })
    }

    /// The `path2project` and `workdir` instructions for this document.
    pub fn directives(&self) -> Result<[XmlEvent; 2]> {
        let job = self.ctx.job;
        let calculator = ProjectPathCalculator::new(job);
        let project = calculator.path_to_project(
            &self.document.relative_path,
            &self.document.source_path,
            job.input_map(),
        )?;
        let path2project = project
            .map(|p| format!("{}/", paths::to_slash_path(&p)))
            .unwrap_or_default();

        let workdir = self
            .document
            .output_path
            .parent()
            .map(|dir| dir.display().to_string())
            .ok_or_else(|| RewriteError::MissingDirective {
                directive: WORKDIR,
                document: self.document.source_path.clone(),
                reason: "output location has no directory".to_string(),
            })?;

        Ok([
            XmlEvent::processing_instruction(PATH2PROJECT, path2project),
            XmlEvent::processing_instruction(WORKDIR, workdir),
        ])
    }

    fn rewrite_events(&self, source: &str) -> Result<DocumentReport> {
        let file = self.document.display_path();
        let rewriter = ReferenceRewriter::new(self.ctx.job, self.ctx.keys, self.ctx.conrefs);
        let mut annotator = TraceabilityAnnotator::new(&self.document.source_path);
        let mut writer = EventWriter::new(Vec::new());
        let mut directives = Some(self.directives()?);

        let mut rewritten_references = 0;
        let mut filtered_elements = 0;
        let mut unresolved_keys = Vec::new();
        let mut warnings = Vec::new();
        // Depth inside a filtered subtree; 0 when not skipping.
        let mut skip_depth = 0usize;

        for event in EventReader::new(source) {
            let mut event = event.map_err(|e| RewriteError::Xml(e.in_file(&file)))?;

            if skip_depth > 0 {
                match &event {
                    XmlEvent::Start(tag) if !tag.self_closing => skip_depth += 1,
                    XmlEvent::End { .. } => skip_depth -= 1,
                    _ => {}
                }
                continue;
            }

            if let XmlEvent::Declaration(_) = event {
                writer.write(&event)?;
                continue;
            }
            if let XmlEvent::ProcessingInstruction { target, .. } = &event
                && (target == PATH2PROJECT || target == WORKDIR)
            {
                continue;
            }
            if let XmlEvent::Start(tag) = &mut event {
                if !self.ctx.filter.should_keep(&tag.attributes) {
                    tracing::trace!(element = %tag.name, file = %file, "filtered element");
                    filtered_elements += 1;
                    if !tag.self_closing {
                        skip_depth = 1;
                    }
                    continue;
                }

                let outcome = rewriter.rewrite_element(tag, self.document)?;
                rewritten_references += outcome.rewritten;
                unresolved_keys.extend(outcome.unresolved_keys);
                warnings.extend(outcome.warnings);

                annotator.stamp(tag.local_name(), &tag.location).apply(tag);
            }

            if let Some(directives) = directives.take() {
                for directive in &directives {
                    writer.write(directive)?;
                }
            }
            writer.write(&event)?;
        }

        if let Some(directives) = directives.take() {
            for directive in &directives {
                writer.write(directive)?;
            }
        }

        tracing::debug!(
            file = %file,
            rewritten = rewritten_references,
            filtered = filtered_elements,
            "rewrote document"
        );

        Ok(DocumentReport {
            document: self.document.clone(),
            output: writer.into_inner(),
            rewritten_references,
            filtered_elements,
            unresolved_keys,
            warnings,
        })
    }
}

impl DocumentReport {
    pub fn output_path(&self) -> &Path {
        &self.document.output_path
    }
}
