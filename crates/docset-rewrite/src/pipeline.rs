/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Parallel rewrite of a whole document set.
 */

//! Rewrite pipeline.
//!
//! Documents are independent units of work and are rewritten in parallel
//! on the rayon thread pool. Each document is read, rewritten into a buffer
//! and only then written, so a failing document never leaves partial output.
//! The only shared mutable state is the [`DelayedConrefs`] registry.

use std::io::Write;
use std::path::Path;

use docset_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder};
use rayon::prelude::*;

use crate::cancellation::Cancellation;
use crate::conref::{ConrefRegistry, DelayedConrefs, PendingConref};
use crate::discovery::DocumentSet;
use crate::document::DocumentSource;
use crate::engine::{DocumentReport, DocumentRewriteEngine, RewriteContext};
use crate::error::{Result, RewriteError};
use crate::filter::FilterGate;
use crate::job::JobContext;
use crate::keys::KeyLookup;

/// A document that was rewritten and stored.
#[derive(Debug, Clone)]
pub struct CompletedDocument {
    pub document: DocumentSource,
    pub rewritten_references: usize,
    pub filtered_elements: usize,
    pub unresolved_keys: Vec<String>,
    /// Content references from other documents that were waiting for this one.
    pub released_conrefs: usize,
}

/// A document that was abandoned.
#[derive(Debug, Clone)]
pub struct FailedDocument {
    pub document: DocumentSource,
    pub error: RewriteError,
}

/// Outcome of a whole run, in document set order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub completed: Vec<CompletedDocument>,
    pub failed: Vec<FailedDocument>,
    /// Documents not started because the run was cancelled.
    pub skipped: Vec<DocumentSource>,
    pub warnings: Vec<DiagnosticMessage>,
    /// Content references whose target never completed.
    pub unresolved_conrefs: Vec<PendingConref>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Every diagnostic of the run: warnings, then one error per failed
    /// document, then one warning per unresolved content reference.
    pub fn diagnostics(&self) -> Vec<DiagnosticMessage> {
        let mut all = self.warnings.clone();
        all.extend(self.failed.iter().map(|f| f.error.to_diagnostic()));
        all.extend(self.unresolved_conrefs.iter().map(|conref| {
            DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "D-2-6")
                .problem(format!(
                    "Content reference `{}` on <{}> points to {}, which was not rewritten",
                    conref.reference,
                    conref.element,
                    conref.target.display()
                ))
                .with_location(conref.location.clone())
                .build()
        }));
        all
    }
}

enum Outcome {
    Completed(CompletedDocument, Vec<DiagnosticMessage>),
    Failed(FailedDocument),
    Skipped(DocumentSource),
}

/// Rewrites every document of a set into the job's temp directory.
pub struct RewritePipeline<'a> {
    job: &'a JobContext,
    keys: &'a dyn KeyLookup,
    filter: &'a dyn FilterGate,
    conrefs: DelayedConrefs,
}

impl<'a> RewritePipeline<'a> {
    pub fn new(job: &'a JobContext, keys: &'a dyn KeyLookup, filter: &'a dyn FilterGate) -> Self {
        Self {
            job,
            keys,
            filter,
            conrefs: DelayedConrefs::new(),
        }
    }

    fn context(&self) -> RewriteContext<'_> {
        RewriteContext {
            job: self.job,
            keys: self.keys,
            filter: self.filter,
            conrefs: &self.conrefs,
        }
    }

    /// Rewrite all documents of `set`.
    ///
    /// Failures are per document and never stop the run. Cancellation is
    /// checked before each document starts.
    pub fn run(&self, set: &DocumentSet, cancellation: &Cancellation) -> RunReport {
        tracing::info!(documents = set.len(), temp_dir = %self.job.temp_dir().display(), "starting rewrite");

        let outcomes: Vec<Outcome> = set
            .documents()
            .par_iter()
            .map(|document| {
                if cancellation.is_cancelled() {
                    return Outcome::Skipped(document.clone());
                }
                match self.rewrite_document(document) {
                    Ok(report) => match self.commit(report) {
                        Ok(done) => done,
                        Err(error) => self.fail(document, error),
                    },
                    Err(error) => self.fail(document, error),
                }
            })
            .collect();

        let mut report = RunReport {
            warnings: set.diagnostics().to_vec(),
            ..RunReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Completed(done, warnings) => {
                    report.warnings.extend(warnings);
                    report.completed.push(done);
                }
                Outcome::Failed(failed) => report.failed.push(failed),
                Outcome::Skipped(document) => report.skipped.push(document),
            }
        }
        report.unresolved_conrefs = self.conrefs.unresolved();

        tracing::info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "rewrite finished"
        );
        report
    }

    /// Read and rewrite one document without storing it.
    pub fn rewrite_document(&self, document: &DocumentSource) -> Result<DocumentReport> {
        let source = std::fs::read_to_string(&document.source_path)
            .map_err(|e| RewriteError::io(&document.source_path, &e))?;
        DocumentRewriteEngine::new(self.context(), document).rewrite(&source)
    }

    /// Store a rewritten document and publish its content references.
    fn commit(&self, report: DocumentReport) -> Result<Outcome> {
        let source_path = report.document.source_path.clone();
        if let Err(err) = write_output(report.output_path(), &report.output) {
            self.conrefs.discard(&source_path);
            return Err(err);
        }
        self.conrefs.flush(&source_path);
        let released = self.conrefs.mark_available(&source_path);

        Ok(Outcome::Completed(
            CompletedDocument {
                document: report.document,
                rewritten_references: report.rewritten_references,
                filtered_elements: report.filtered_elements,
                unresolved_keys: report.unresolved_keys,
                released_conrefs: released.len(),
            },
            report.warnings,
        ))
    }

    fn fail(&self, document: &DocumentSource, error: RewriteError) -> Outcome {
        tracing::warn!(document = %document.source_path.display(), error = %error, "document failed");
        Outcome::Failed(FailedDocument {
            document: document.clone(),
            error,
        })
    }

    /// The conref registry shared by this pipeline's documents.
    pub fn conrefs(&self) -> &DelayedConrefs {
        &self.conrefs
    }
}

/// Write through a temporary file in the target directory, then rename.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| RewriteError::Io {
            path: path.to_path_buf(),
            message: "output path has no directory".to_string(),
        })?;
    std::fs::create_dir_all(dir).map_err(|e| RewriteError::io(dir, &e))?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| RewriteError::io(dir, &e))?;
    file.write_all(content)
        .map_err(|e| RewriteError::io(path, &e))?;
    file.persist(path)
        .map_err(|e| RewriteError::io(path, &e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::KeepAll;
    use crate::keys::KeyTable;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_write_output_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c.dita");
        write_output(&target, b"<topic/>").unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), "<topic/>");
    }

    #[test]
    fn test_failed_document_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.ditamap", "<map><topicref href=\"bad.dita\"/></map>");
        write(dir.path(), "src/bad.dita", "<topic><p conref=\"main.ditamap#x\"/><body></topic>");
        let job = JobContext::builder(dir.path().join("src/main.ditamap"), dir.path().join("out"))
            .build()
            .unwrap();
        let keys = KeyTable::new();
        let pipeline = RewritePipeline::new(&job, &keys, &KeepAll);
        let set = DocumentSet::from_relative_paths(&job, ["main.ditamap", "bad.dita"]);

        let report = pipeline.run(&set, &Cancellation::new());

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(!dir.path().join("out/bad.dita").exists());
        assert!(dir.path().join("out/main.ditamap").exists());
        assert!(report.unresolved_conrefs.is_empty());
        assert!(!report.is_success());
    }

    #[test]
    fn test_cancelled_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.ditamap", "<map/>");
        let job = JobContext::builder(dir.path().join("src/main.ditamap"), dir.path().join("out"))
            .build()
            .unwrap();
        let keys = KeyTable::new();
        let pipeline = RewritePipeline::new(&job, &keys, &KeepAll);
        let set = DocumentSet::from_relative_paths(&job, ["main.ditamap"]);

        let cancellation = Cancellation::new();
        cancellation.cancel();
        let report = pipeline.run(&set, &cancellation);

        assert!(report.was_cancelled());
        assert!(report.completed.is_empty());
        assert!(!dir.path().join("out/main.ditamap").exists());
    }

    #[test]
    fn test_unreadable_document_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.ditamap", "<map/>");
        let job = JobContext::builder(dir.path().join("src/main.ditamap"), dir.path().join("out"))
            .build()
            .unwrap();
        let keys = KeyTable::new();
        let pipeline = RewritePipeline::new(&job, &keys, &KeepAll);
        let set = DocumentSet::from_relative_paths(&job, ["main.ditamap", "gone.dita"]);

        let report = pipeline.run(&set, &Cancellation::new());

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.failed[0].document.relative_path, Path::new("gone.dita"));
        assert_eq!(
            report.diagnostics().last().and_then(|d| d.code.clone()).as_deref(),
            Some("D-2-5")
        );
    }
}
