/*
 * trace.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source traceability stamps (xtrf / xtrc).
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use docset_diagnostics::SourceLocation;
use docset_xml::StartTag;

pub const XTRF: &str = "xtrf";
pub const XTRC: &str = "xtrc";

/// Where an element came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceabilityStamp {
    pub source_file: PathBuf,
    pub element_name: String,
    /// 1-based count of this element name within the document so far.
    pub occurrence: usize,
    pub location: SourceLocation,
}

impl TraceabilityStamp {
    /// Value of the `xtrf` attribute: the absolute source file.
    pub fn xtrf(&self) -> String {
        self.source_file.display().to_string()
    }

    /// Value of the `xtrc` attribute: `name:count;line:column`.
    pub fn xtrc(&self) -> String {
        format!(
            "{}:{};{}:{}",
            self.element_name, self.occurrence, self.location.line, self.location.column
        )
    }

    /// Write both attributes, replacing any existing values.
    pub fn apply(&self, tag: &mut StartTag) {
        tag.set_attribute(XTRF, self.xtrf());
        tag.set_attribute(XTRC, self.xtrc());
    }
}

/// Stamps elements of one document with per-name occurrence counters.
#[derive(Debug, Clone)]
pub struct TraceabilityAnnotator {
    source_file: PathBuf,
    counters: HashMap<String, usize>,
}

impl TraceabilityAnnotator {
    pub fn new(source_file: &Path) -> Self {
        Self {
            source_file: source_file.to_path_buf(),
            counters: HashMap::new(),
        }
    }

    /// Next stamp for an element. Counters are keyed by local name.
    pub fn stamp(&mut self, element_name: &str, location: &SourceLocation) -> TraceabilityStamp {
        let counter = self.counters.entry(element_name.to_string()).or_insert(0);
        *counter += 1;
        TraceabilityStamp {
            source_file: self.source_file.clone(),
            element_name: element_name.to_string(),
            occurrence: *counter,
            location: location.clone(),
        }
    }
}
