/*
 * paths.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Lexical path arithmetic and URI path segment encoding.
 */

//! Lexical path helpers.
//!
//! Nothing here touches the file system: documents may be rewritten into
//! directories that don't exist yet, so paths are normalized by component
//! arithmetic only.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped in a relative URI path segment.
///
/// `+`, sub-delimiters, `:` and `@` are legal in a segment and stay as they are.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Remove `.` components and fold `..` into their parent.
///
/// Returns `None` when a `..` would climb above the root of an absolute path.
/// Leading `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    let mut rooted = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                rooted = true;
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if rooted {
                    return None;
                } else {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    Some(out)
}

/// Relative path that leads from directory `from` to `to`.
///
/// Both paths must be normalized. Returns `None` when they have different
/// roots, e.g. different drives.
pub fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let from_rooted = from.first().is_some_and(|c| is_root(*c));
    let to_rooted = to.first().is_some_and(|c| is_root(*c));
    if from_rooted != to_rooted || (from_rooted && common == 0) {
        return None;
    }

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    Some(relative)
}

fn is_root(component: Component<'_>) -> bool {
    matches!(component, Component::Prefix(_) | Component::RootDir)
}

/// Whether a relative path starts by leaving its base directory.
pub fn escapes_base(relative: &Path) -> bool {
    matches!(relative.components().next(), Some(Component::ParentDir))
}

/// Parent of a relative path, or `None` when the path has a single component.
pub fn non_empty_parent(relative: &Path) -> Option<PathBuf> {
    relative
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Join the components of a relative path with `/`, escaping each segment.
pub fn to_uri_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(name) => {
                Some(utf8_percent_encode(&name.to_string_lossy(), SEGMENT).to_string())
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Join the components of a relative path with `/` without escaping.
pub fn to_slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode a reference path.
///
/// A `%` that doesn't start a valid escape is kept literally. When the
/// escapes decode to invalid UTF-8 (`%ba` in `foo +%bar.dita`), the whole
/// value is taken as literal text.
pub fn decode_lenient(value: &str) -> String {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}
