/*
 * filter.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Element filtering seam.
 */

use docset_xml::Attribute;

/// Decides whether an element survives into the output.
///
/// A rejected element is dropped together with its whole subtree.
pub trait FilterGate: Send + Sync {
    fn should_keep(&self, attributes: &[Attribute]) -> bool;
}

/// Keeps every element.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl FilterGate for KeepAll {
    fn should_keep(&self, _attributes: &[Attribute]) -> bool {
        true
    }
}

impl<F> FilterGate for F
where
    F: Fn(&[Attribute]) -> bool + Send + Sync,
{
    fn should_keep(&self, attributes: &[Attribute]) -> bool {
        self(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_all() {
        assert!(KeepAll.should_keep(&[Attribute::new("audience", "internal")]));
    }

    #[test]
    fn test_closure_gate() {
        let gate = |attrs: &[Attribute]| {
            !attrs
                .iter()
                .any(|a| a.name == "audience" && a.value == "internal")
        };
        assert!(!gate.should_keep(&[Attribute::new("audience", "internal")]));
        assert!(gate.should_keep(&[Attribute::new("audience", "novice")]));
    }
}
