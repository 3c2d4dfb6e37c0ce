//! Reference rewriting for map-driven markup document sets.
//!
//! Given an input map and the documents it reaches, this crate writes every
//! document into a temporary directory with its references normalized:
//!
//! - `href`, `conref` and `conrefend` values become escaped URIs relative to
//!   the document, whether they were authored as relative paths or `file:`
//!   URIs
//! - `keyref` values are resolved through a key table into `href`
//! - each element is stamped with its source file and position
//!   (`xtrf`/`xtrc`)
//! - each document gets `path2project` and `workdir` processing instructions
//!
//! # Architecture
//!
//! - [`JobContext`] - Validated, read-only configuration for a run
//! - [`DocumentSet`] - Documents reachable from the input map
//! - [`RewritePipeline`] - Rewrites a set in parallel and reports per document
//! - [`DocumentRewriteEngine`] - Streams one document through the rewriting steps
//! - [`PathResolver`], [`ProjectPathCalculator`], [`ReferenceRewriter`],
//!   [`TraceabilityAnnotator`] - The individual steps
//!
//! Key tables ([`KeyLookup`]), filtering ([`FilterGate`]) and deferred
//! content references ([`ConrefRegistry`]) are traits so callers can supply
//! their own.
//!
//! # Example
//!
//! ```no_run
//! use docset_rewrite::{
//!     Cancellation, DocumentSet, JobContext, KeepAll, KeyTable, RewritePipeline,
//! };
//!
//! let job = JobContext::builder("/work/src/main.ditamap", "/work/out")
//!     .temp_dir("/work/temp")
//!     .build()?;
//! let keys = KeyTable::new();
//!
//! let set = DocumentSet::discover(&job, &keys)?;
//! let report = RewritePipeline::new(&job, &keys, &KeepAll).run(&set, &Cancellation::new());
//!
//! for diagnostic in report.diagnostics() {
//!     eprintln!("{}", diagnostic.to_text());
//! }
//! # Ok::<(), docset_rewrite::RewriteError>(())
//! ```

pub mod cancellation;
pub mod conref;
pub mod discovery;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod job;
pub mod keys;
pub mod paths;
pub mod pipeline;
pub mod project_path;
pub mod reference;
pub mod resolver;
pub mod trace;

// Re-export commonly used types
pub use cancellation::Cancellation;
pub use conref::{ConrefRegistry, DelayedConrefs, PendingConref};
pub use discovery::DocumentSet;
pub use document::DocumentSource;
pub use engine::{DocumentReport, DocumentRewriteEngine, RewriteContext};
pub use error::{MalformedReference, Result, RewriteError};
pub use filter::{FilterGate, KeepAll};
pub use job::{GenerateCopyOuter, JobConfig, JobContext, JobContextBuilder, OuterControl};
pub use keys::{KeyDefinition, KeyLookup, KeyTable, Scope};
pub use pipeline::{CompletedDocument, FailedDocument, RewritePipeline, RunReport};
pub use project_path::ProjectPathCalculator;
pub use reference::{ElementOutcome, KeyrefResolution, ReferenceRewriter};
pub use resolver::{PathResolver, ReferenceKind, ResolvedReference};
pub use trace::{TraceabilityAnnotator, TraceabilityStamp};
