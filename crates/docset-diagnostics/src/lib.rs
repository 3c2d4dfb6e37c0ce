//! Diagnostic messages for the docset rewriting stage.
//!
//! Every recoverable problem the rewriter meets (a malformed reference, an
//! undefined key, a reference that leaves the map directory) is reported as a
//! [`DiagnosticMessage`] rather than aborting the run. Fatal problems are
//! converted into one as well so the orchestrating layer can print them the
//! same way.
//!
//! # Structure
//!
//! - [`DiagnosticMessage`]: kind, optional code, title, problem, details, hints
//!   and an optional [`SourceLocation`]
//! - [`DiagnosticMessageBuilder`]: tidyverse-style builder (`.problem()`,
//!   `.add_detail()`, `.add_hint()`)
//! - [`catalog`]: the embedded error-code catalog (`D-<subsystem>-<number>`)
//!
//! # Example
//!
//! ```
//! use docset_diagnostics::{DiagnosticMessageBuilder, SourceLocation};
//!
//! let warning = DiagnosticMessageBuilder::warning("Unresolved key reference")
//!     .with_code("D-2-2")
//!     .problem("Key `product-name` is not defined in any map")
//!     .with_location(SourceLocation::new("/work/src/topic.dita", 4, 9))
//!     .add_hint("Define the key in the root map?")
//!     .build();
//!
//! assert!(warning.to_text().starts_with("Warning [D-2-2]"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;
pub mod location;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
pub use location::SourceLocation;
