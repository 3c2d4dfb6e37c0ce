//! Error code catalog and lookup.
//!
//! Maps error codes (like "D-2-1") to their metadata. The catalog is embedded
//! at compile time from `error_catalog.json`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name ("xml", "rewrite", "config")
    pub subsystem: String,

    /// Short title for the error
    pub title: String,

    /// Default one-line description
    pub message_template: String,

    /// When this code was introduced (version)
    pub since_version: String,
}

/// Global error catalog, loaded lazily from the embedded JSON.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid, which can only happen if the
/// catalog file was edited by hand incorrectly.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON")
});

/// Look up error code information.
///
/// # Example
///
/// ```
/// use docset_diagnostics::catalog::get_error_info;
///
/// let info = get_error_info("D-2-2").unwrap();
/// assert_eq!(info.title, "Unresolved Key Reference");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the subsystem name for an error code.
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}
