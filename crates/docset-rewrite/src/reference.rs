/*
 * reference.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rewrites the reference attributes of one element.
 */

//! Reference attribute rewriting.
//!
//! Handles `href`, `conref`, `conrefend` and `keyref`. A resolved `keyref`
//! writes the key's target into `href`, replacing whatever was authored there.

use std::path::{Path, PathBuf};

use docset_diagnostics::{DiagnosticKind, DiagnosticMessage, SourceLocation};
use docset_xml::StartTag;

use crate::conref::{ConrefRegistry, PendingConref};
use crate::document::DocumentSource;
use crate::error::{MalformedReference, Result, RewriteError};
use crate::job::{GenerateCopyOuter, JobContext, OuterControl};
use crate::keys::{KeyLookup, Scope};
use crate::paths;
use crate::project_path::ProjectPathCalculator;
use crate::resolver::{PathResolver, ResolvedReference};

pub const HREF: &str = "href";
pub const CONREF: &str = "conref";
pub const CONREFEND: &str = "conrefend";
pub const KEYREF: &str = "keyref";
pub const SCOPE: &str = "scope";
pub const FORMAT: &str = "format";

/// What a `keyref` value turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyrefResolution {
    /// No map defines the key.
    Undefined { key: String },
    /// The key exists but has no target; the element is left alone.
    NoTarget,
    /// Value to write into `href`.
    Href {
        href: String,
        /// Scope to add when the element has none.
        scope: Option<Scope>,
        /// Absolute target for local keys.
        target: Option<PathBuf>,
    },
    Malformed(MalformedReference),
}

/// Result of rewriting one element's references.
#[derive(Debug, Default)]
pub struct ElementOutcome {
    /// Number of attribute values that were changed.
    pub rewritten: usize,
    /// Non-fatal problems found on the element.
    pub warnings: Vec<DiagnosticMessage>,
    pub unresolved_keys: Vec<String>,
}

/// Rewrites reference attributes relative to the document being written.
pub struct ReferenceRewriter<'a> {
    job: &'a JobContext,
    keys: &'a dyn KeyLookup,
    conrefs: &'a dyn ConrefRegistry,
    resolver: PathResolver,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(job: &'a JobContext, keys: &'a dyn KeyLookup, conrefs: &'a dyn ConrefRegistry) -> Self {
        Self {
            job,
            keys,
            conrefs,
            resolver: PathResolver::for_job(job),
        }
    }

    /// Rewrite every reference attribute of `tag` in place.
    ///
    /// Only a boundary violation under [`OuterControl::Fail`] is an error;
    /// other problems are collected as warnings and leave the attribute as
    /// written.
    pub fn rewrite_element(&self, tag: &mut StartTag, document: &DocumentSource) -> Result<ElementOutcome> {
        let mut outcome = ElementOutcome::default();
        let current = document.source_path.as_path();
        let location = tag.location.clone().in_file(document.display_path());

        let mut href_from_key = false;
        if let Some(keyref) = tag.get_attribute(KEYREF).map(str::to_string) {
            match self.resolve_keyref(&keyref, current) {
                KeyrefResolution::Undefined { key } => {
                    tracing::debug!(key = %key, file = %current.display(), "undefined key");
                    outcome.warnings.push(
                        RewriteError::UnresolvedKey {
                            key: key.clone(),
                            location: Some(location.clone()),
                        }
                        .to_diagnostic(),
                    );
                    outcome.unresolved_keys.push(key);
                }
                KeyrefResolution::NoTarget => {}
                KeyrefResolution::Href {
                    href,
                    scope,
                    target,
                } => {
                    if let Some(target) = &target {
                        self.check_outer(&keyref, target, &location, &mut outcome)?;
                    }
                    tag.set_attribute(HREF, href);
                    if let Some(scope) = scope
                        && !tag.has_attribute(SCOPE)
                    {
                        tag.set_attribute(SCOPE, scope.as_str());
                    }
                    outcome.rewritten += 1;
                    href_from_key = true;
                }
                KeyrefResolution::Malformed(source) => {
                    outcome
                        .warnings
                        .push(malformed(source, KEYREF, &location).to_diagnostic());
                }
            }
        }

        if !href_from_key && let Some(href) = tag.get_attribute(HREF).map(str::to_string) {
            match self.replace_href(&href, tag, current) {
                Ok(resolved) => {
                    if let Some(target) = &resolved.target {
                        self.check_outer(&href, target, &location, &mut outcome)?;
                        if resolved.uri != href {
                            tag.set_attribute(HREF, resolved.uri);
                            outcome.rewritten += 1;
                        }
                    }
                }
                Err(source) => outcome
                    .warnings
                    .push(malformed(source, HREF, &location).to_diagnostic()),
            }
        }

        for attribute in [CONREF, CONREFEND] {
            let Some(value) = tag.get_attribute(attribute).map(str::to_string) else {
                continue;
            };
            match self.replace_conref(&value, current) {
                Ok(resolved) => {
                    let Some(target) = resolved.target else {
                        continue;
                    };
                    self.check_outer(&value, &target, &location, &mut outcome)?;
                    if target != document.source_path && !self.conrefs.is_available(&target) {
                        self.conrefs.register_pending(
                            PendingConref {
                                document: document.source_path.clone(),
                                target,
                                reference: resolved.uri.clone(),
                                element: tag.local_name().to_string(),
                                location: location.clone(),
                            },
                            current,
                        );
                    }
                    if resolved.uri != value {
                        tag.set_attribute(attribute, resolved.uri);
                        outcome.rewritten += 1;
                    }
                }
                Err(source) => outcome
                    .warnings
                    .push(malformed(source, attribute, &location).to_diagnostic()),
            }
        }

        Ok(outcome)
    }

    /// Rewrite an `href` value found on an element with `tag`'s attributes.
    ///
    /// Non-local scopes and non-markup formats pass through unchanged.
    pub fn replace_href(
        &self,
        value: &str,
        tag: &StartTag,
        current_file: &Path,
    ) -> std::result::Result<ResolvedReference, MalformedReference> {
        if Scope::from_attribute(tag.get_attribute(SCOPE)) != Scope::Local {
            return Ok(ResolvedReference::unchanged(value));
        }
        let is_document = tag.get_attribute(FORMAT).map(str::trim).is_none_or(|format| {
            format.eq_ignore_ascii_case("dita") || format.eq_ignore_ascii_case("ditamap")
        });
        if is_document {
            self.resolver.resolve(value, current_file, self.job.source_root())
        } else {
            Ok(ResolvedReference::unchanged(value))
        }
    }

    /// Rewrite a `conref` or `conrefend` value.
    pub fn replace_conref(
        &self,
        value: &str,
        current_file: &Path,
    ) -> std::result::Result<ResolvedReference, MalformedReference> {
        self.resolver.resolve(value, current_file, self.job.source_root())
    }

    /// Resolve `key` or `key/element` to an `href` value for `current_file`.
    pub fn resolve_keyref(&self, keyref: &str, current_file: &Path) -> KeyrefResolution {
        let (key, element) = match keyref.split_once('/') {
            Some((key, element)) => (key, Some(element)),
            None => (keyref, None),
        };

        let Some(definition) = self.keys.lookup(key) else {
            return KeyrefResolution::Undefined {
                key: key.to_string(),
            };
        };
        let Some(target) = definition.target.as_deref() else {
            return KeyrefResolution::NoTarget;
        };

        if definition.scope != Scope::Local {
            return KeyrefResolution::Href {
                href: with_element_id(target, element),
                scope: Some(definition.scope),
                target: None,
            };
        }

        let resolved = self
            .key_base_dir(&definition.source, target)
            .and_then(|base| {
                let current_dir = current_file
                    .parent()
                    .ok_or_else(|| MalformedReference::new(keyref, "the current file has no directory"))?;
                self.resolver
                    .resolve_with_base(target, &base, current_dir, self.job.source_root())
            });

        match resolved {
            Ok(resolved) => KeyrefResolution::Href {
                href: with_element_id(&resolved.uri, element),
                scope: None,
                target: resolved.target,
            },
            Err(err) => KeyrefResolution::Malformed(err),
        }
    }

    /// Directory of the map that defines a key.
    fn key_base_dir(&self, source: &str, target: &str) -> std::result::Result<PathBuf, MalformedReference> {
        let decoded = paths::decode_lenient(source);
        paths::normalize(&self.job.source_root().join(decoded))
            .and_then(|map| map.parent().map(Path::to_path_buf))
            .ok_or_else(|| MalformedReference::new(target, "key source climbs above the root"))
    }

    fn check_outer(
        &self,
        reference: &str,
        target: &Path,
        location: &SourceLocation,
        outcome: &mut ElementOutcome,
    ) -> Result<()> {
        if self.job.generate_copy_outer() != GenerateCopyOuter::NotGenerateOuter {
            return Ok(());
        }
        let calculator = ProjectPathCalculator::new(self.job);
        if !calculator.is_outer(target, self.job.input_map())? {
            return Ok(());
        }

        let violation = RewriteError::OuterBoundaryViolation {
            reference: reference.to_string(),
            target: target.to_path_buf(),
            location: Some(location.clone()),
        };
        match self.job.outer_control() {
            OuterControl::Fail => Err(violation),
            OuterControl::Warn => {
                outcome
                    .warnings
                    .push(violation.to_diagnostic_as(DiagnosticKind::Warning));
                Ok(())
            }
            OuterControl::Quiet => Ok(()),
        }
    }
}

fn malformed(source: MalformedReference, attribute: &str, location: &SourceLocation) -> RewriteError {
    RewriteError::MalformedReference {
        source,
        attribute: attribute.to_string(),
        location: Some(location.clone()),
    }
}

/// Point a target at an element: `a.dita#topic` + `p1` is `a.dita#topic/p1`.
fn with_element_id(target: &str, element: Option<&str>) -> String {
    let Some(element) = element else {
        return target.to_string();
    };
    match target.split_once('#') {
        Some((path, fragment)) => {
            let topic = fragment.split('/').next().unwrap_or(fragment);
            format!("{}#{}/{}", path, topic, element)
        }
        None => format!("{}#{}", target, element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conref::DelayedConrefs;
    use crate::keys::{KeyDefinition, KeyTable};

    struct Fixture {
        job: JobContext,
        keys: KeyTable,
        conrefs: DelayedConrefs,
    }

    impl Fixture {
        fn new(job: JobContext) -> Self {
            let keys = [
                KeyDefinition::new("keyword", Some("keyword.dita#keyword"), "main.ditamap"),
                KeyDefinition::new("nested", Some("topics/k.dita"), "maps/sub.ditamap"),
                KeyDefinition::new("site", Some("https://example.com/"), "main.ditamap")
                    .with_scope(Scope::External),
                KeyDefinition::new("product", None, "main.ditamap"),
            ]
            .into_iter()
            .collect();
            Self {
                job,
                keys,
                conrefs: DelayedConrefs::new(),
            }
        }

        fn rewriter(&self) -> ReferenceRewriter<'_> {
            ReferenceRewriter::new(&self.job, &self.keys, &self.conrefs)
        }

        fn doc(&self, relative: &str) -> DocumentSource {
            DocumentSource::new(&self.job, relative)
        }
    }

    fn default_job() -> JobContext {
        JobContext::builder("/work/src/main.ditamap", "/work/out")
            .build()
            .unwrap()
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> StartTag {
        let mut tag = StartTag::new(name, SourceLocation::anonymous(4, 3));
        for (k, v) in attrs {
            tag.set_attribute(k, *v);
        }
        tag
    }

    #[test]
    fn test_replace_href_cases() {
        let fx = Fixture::new(default_job());
        let rewriter = fx.rewriter();
        let current = Path::new("/work/src/main.ditamap");
        let tag = element("topicref", &[]);
        let href = |value: &str| rewriter.replace_href(value, &tag, current).unwrap().uri;

        assert_eq!(href("foo +%bar.dita"), "foo%20+%25bar.dita");
        assert_eq!(href("foo +%25bar.dita"), "foo%20+%25bar.dita");
        assert_eq!(href("foo.dita#bar"), "foo.dita#bar");
        assert_eq!(href("file:/work/src/foo.dita"), "foo.dita");
        assert_eq!(href("file:/work/src/foo.dita#bar"), "foo.dita#bar");
        assert_eq!(
            href("file:/work/src/sub/foo%20+%25bar.dita"),
            "sub/foo%20+%25bar.dita"
        );
        assert_eq!(href("foo.bar"), "foo.bar");
    }

    #[test]
    fn test_replace_conref_cases() {
        let fx = Fixture::new(default_job());
        let rewriter = fx.rewriter();
        let current = Path::new("/work/src/main.ditamap");
        let conref = |value: &str| rewriter.replace_conref(value, current).unwrap().uri;

        assert_eq!(conref("foo +%bar.dita"), "foo%20+%25bar.dita");
        assert_eq!(conref("foo +%25bar.dita"), "foo%20+%25bar.dita");
        assert_eq!(conref("foo.dita#bar"), "foo.dita#bar");
        assert_eq!(conref("file:/work/src/foo.dita#bar"), "foo.dita#bar");
        assert_eq!(
            conref("file:/work/src/sub/foo%20+%25bar.dita"),
            "sub/foo%20+%25bar.dita"
        );
        assert_eq!(conref("foo.bar"), "foo.bar");
    }

    #[test]
    fn test_external_scope_and_foreign_format_pass_through() {
        let fx = Fixture::new(default_job());
        let rewriter = fx.rewriter();
        let current = Path::new("/work/src/a.dita");

        let external = element("xref", &[("scope", "external")]);
        assert_eq!(
            rewriter.replace_href("x y.dita", &external, current).unwrap().uri,
            "x y.dita"
        );

        let html = element("xref", &[("format", "html")]);
        assert!(!rewriter.replace_href("a b.dita", &html, current).unwrap().is_rewritten());

        let dita = element("xref", &[("format", "dita"), ("scope", "local")]);
        assert_eq!(
            rewriter.replace_href("t +%25b.dita", &dita, current).unwrap().uri,
            "t%20+%25b.dita"
        );
        assert_eq!(rewriter.replace_href("foo.bar", &dita, current).unwrap().uri, "foo.bar");

        let upper = element("xref", &[("format", "DITA")]);
        assert_eq!(
            rewriter.replace_href("x y.dita", &upper, current).unwrap().uri,
            "x%20y.dita"
        );
        let map = element("topicref", &[("format", " DitaMap ")]);
        assert!(rewriter.replace_href("sub map.ditamap", &map, current).unwrap().is_rewritten());
    }

    #[test]
    fn test_keyref_writes_href() {
        let fx = Fixture::new(default_job());
        let doc = fx.doc("topics/a.dita");
        let mut tag = element("keyword", &[("keyref", "keyword"), ("href", "stale.dita")]);

        let outcome = fx.rewriter().rewrite_element(&mut tag, &doc).unwrap();

        assert_eq!(tag.get_attribute("href"), Some("../keyword.dita#keyword"));
        assert_eq!(outcome.rewritten, 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_keyref_element_id_and_defining_map() {
        let fx = Fixture::new(default_job());
        let rewriter = fx.rewriter();
        let current = Path::new("/work/src/topics/a.dita");

        assert_eq!(
            rewriter.resolve_keyref("keyword/ph1", current),
            KeyrefResolution::Href {
                href: "../keyword.dita#keyword/ph1".to_string(),
                scope: None,
                target: Some(PathBuf::from("/work/src/keyword.dita")),
            }
        );
        match rewriter.resolve_keyref("nested", current) {
            KeyrefResolution::Href { href, .. } => assert_eq!(href, "../maps/topics/k.dita"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_external_key_sets_scope() {
        let fx = Fixture::new(default_job());
        let doc = fx.doc("a.dita");
        let mut tag = element("xref", &[("keyref", "site")]);

        fx.rewriter().rewrite_element(&mut tag, &doc).unwrap();

        assert_eq!(tag.get_attribute("href"), Some("https://example.com/"));
        assert_eq!(tag.get_attribute("scope"), Some("external"));
    }

    #[test]
    fn test_key_without_target_and_undefined_key() {
        let fx = Fixture::new(default_job());
        let doc = fx.doc("a.dita");

        let mut text_only = element("ph", &[("keyref", "product")]);
        let outcome = fx.rewriter().rewrite_element(&mut text_only, &doc).unwrap();
        assert!(!text_only.has_attribute("href"));
        assert!(outcome.warnings.is_empty());

        let mut undefined = element("ph", &[("keyref", "nope/x")]);
        let outcome = fx.rewriter().rewrite_element(&mut undefined, &doc).unwrap();
        assert_eq!(outcome.unresolved_keys, vec!["nope".to_string()]);
        assert_eq!(outcome.warnings[0].code.as_deref(), Some("D-2-2"));
        assert_eq!(
            outcome.warnings[0].location,
            Some(SourceLocation::new("/work/src/a.dita", 4, 3))
        );
    }

    #[test]
    fn test_malformed_href_is_left_alone() {
        let fx = Fixture::new(default_job());
        let doc = fx.doc("a.dita");
        let mut tag = element("xref", &[("href", "file://remote/a.dita")]);

        let outcome = fx.rewriter().rewrite_element(&mut tag, &doc).unwrap();

        assert_eq!(tag.get_attribute("href"), Some("file://remote/a.dita"));
        assert_eq!(outcome.rewritten, 0);
        assert_eq!(outcome.warnings[0].code.as_deref(), Some("D-2-1"));
        assert_eq!(outcome.warnings[0].kind, DiagnosticKind::Warning);
    }

    #[test]
    fn test_conref_registers_pending_target() {
        let fx = Fixture::new(default_job());
        let doc = fx.doc("topics/a.dita");
        let mut tag = element("p", &[("conref", "../shared lib.dita#s/p1")]);

        let outcome = fx.rewriter().rewrite_element(&mut tag, &doc).unwrap();

        assert_eq!(tag.get_attribute("conref"), Some("../shared%20lib.dita#s/p1"));
        assert_eq!(outcome.rewritten, 1);
        assert_eq!(fx.conrefs.staged_count(&doc.source_path), 1);
    }

    #[test]
    fn test_conref_to_completed_or_same_document_is_not_pending() {
        let fx = Fixture::new(default_job());
        let doc = fx.doc("a.dita");
        fx.conrefs.mark_available(Path::new("/work/src/b.dita"));

        let mut to_done = element("p", &[("conref", "b.dita#b/p")]);
        fx.rewriter().rewrite_element(&mut to_done, &doc).unwrap();
        let mut to_self = element("p", &[("conref", "#a/p")]);
        fx.rewriter().rewrite_element(&mut to_self, &doc).unwrap();
        let mut to_self_named = element("p", &[("conref", "a.dita#a/p")]);
        fx.rewriter().rewrite_element(&mut to_self_named, &doc).unwrap();

        assert_eq!(fx.conrefs.staged_count(&doc.source_path), 0);
    }

    fn outer_job(control: OuterControl) -> JobContext {
        JobContext::builder("/work/src/maps/main.ditamap", "/work/out")
            .source_root("/work/src")
            .outer_control(control)
            .build()
            .unwrap()
    }

    #[test]
    fn test_outer_reference_fails_document() {
        let fx = Fixture::new(outer_job(OuterControl::Fail));
        let doc = fx.doc("maps/main.ditamap");
        let mut tag = element("topicref", &[("href", "../topics/a.dita")]);

        let err = fx.rewriter().rewrite_element(&mut tag, &doc).unwrap_err();
        assert!(matches!(err, RewriteError::OuterBoundaryViolation { .. }));
    }

    #[test]
    fn test_outer_reference_warns_or_stays_quiet() {
        let fx = Fixture::new(outer_job(OuterControl::Warn));
        let doc = fx.doc("maps/main.ditamap");
        let mut tag = element("topicref", &[("href", "../topics/a.dita")]);
        let outcome = fx.rewriter().rewrite_element(&mut tag, &doc).unwrap();
        assert_eq!(outcome.warnings[0].code.as_deref(), Some("D-2-3"));
        assert_eq!(tag.get_attribute("href"), Some("../topics/a.dita"));

        let fx = Fixture::new(outer_job(OuterControl::Quiet));
        let mut tag = element("topicref", &[("href", "../topics/a.dita")]);
        let outcome = fx.rewriter().rewrite_element(&mut tag, &doc).unwrap();
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_outer_check_only_when_not_copying() {
        let job = JobContext::builder("/work/src/maps/main.ditamap", "/work/out")
            .source_root("/work/src")
            .outer_control(OuterControl::Fail)
            .generate_copy_outer(GenerateCopyOuter::GenerateOuter)
            .build()
            .unwrap();
        let fx = Fixture::new(job);
        let doc = fx.doc("maps/main.ditamap");
        let mut tag = element("topicref", &[("href", "../topics/a.dita")]);

        assert!(fx.rewriter().rewrite_element(&mut tag, &doc).is_ok());
    }

    #[test]
    fn test_outer_check_reports_path_errors() {
        let fx = Fixture::new(outer_job(OuterControl::Quiet));
        let location = SourceLocation::anonymous(1, 1);
        let mut outcome = ElementOutcome::default();

        let err = fx
            .rewriter()
            .check_outer("a.dita", Path::new("relative/a.dita"), &location, &mut outcome)
            .unwrap_err();

        assert!(matches!(err, RewriteError::MissingDirective { .. }));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_with_element_id() {
        assert_eq!(with_element_id("a.dita", None), "a.dita");
        assert_eq!(with_element_id("a.dita", Some("p")), "a.dita#p");
        assert_eq!(with_element_id("a.dita#t", Some("p")), "a.dita#t/p");
        assert_eq!(with_element_id("a.dita#t/q", Some("p")), "a.dita#t/p");
    }
}
