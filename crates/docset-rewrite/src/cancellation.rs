/*
 * cancellation.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cooperative cancellation of a rewrite run.
 */

//! Cancellation for pipeline execution.
//!
//! Cancellation is checked before each document starts. A document that
//! has started always runs to completion or failure, so no partial output
//! is ever written.

/// A cloneable cancellation token shared between the caller and the pipeline.
#[derive(Clone)]
pub struct Cancellation {
    inner: tokio_util::sync::CancellationToken,
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            inner: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Request cancellation.
    ///
    /// After this is called, `is_cancelled()` will return `true`.
    pub fn cancel(&self) {
        self.inner.cancel()
    }

    /// A token cancelled together with this one, but not the other way round.
    pub fn child(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
