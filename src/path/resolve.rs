//! Pathname normalization and relative resolution.

use serde::{Deserialize, Serialize};

/// How trailing slashes are treated on matched and generated pathnames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// Strip trailing slashes.
    #[default]
    Never,
    /// Always end non-root pathnames with a slash.
    Always,
    /// Keep whatever the input had.
    Preserve,
}

/// Collapse repeated slashes.
pub fn clean_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                out.push(ch);
            }
            prev_slash = true;
        } else {
            out.push(ch);
            prev_slash = false;
        }
    }
    out
}

/// Join path pieces with `/`, collapsing duplicate separators.
pub fn join_paths<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");
    clean_path(&joined)
}

/// Trim leading slashes, preserving a bare `/`.
pub fn trim_path_left(path: &str) -> &str {
    if path == "/" {
        path
    } else {
        path.trim_start_matches('/')
    }
}

/// Trim trailing slashes, preserving a bare `/`.
pub fn trim_path_right(path: &str) -> &str {
    if path == "/" {
        path
    } else {
        path.trim_end_matches('/')
    }
}

pub fn trim_path(path: &str) -> &str {
    trim_path_right(trim_path_left(path))
}

/// Non-empty components of a pathname, still percent-encoded.
pub fn split_pathname(pathname: &str) -> Vec<&str> {
    pathname.split('/').filter(|p| !p.is_empty()).collect()
}

/// Normalize a pathname: single leading slash, no repeated separators, and
/// the trailing slash handled per `policy`.
pub fn normalize_pathname(pathname: &str, policy: TrailingSlash) -> String {
    let cleaned = clean_path(&format!("/{pathname}"));
    if cleaned == "/" {
        return cleaned;
    }
    let had_trailing = cleaned.ends_with('/');
    let trimmed = cleaned.trim_end_matches('/');
    match policy {
        TrailingSlash::Never => trimmed.to_string(),
        TrailingSlash::Always => format!("{trimmed}/"),
        TrailingSlash::Preserve if had_trailing => format!("{trimmed}/"),
        TrailingSlash::Preserve => trimmed.to_string(),
    }
}

/// Resolve `to` against `base`.
///
/// Paths are treated as directories: `/a/b + ./c = /a/b/c`,
/// `/a/b + ../c = /a/c`, bare names resolve like `./`, and an absolute `to`
/// replaces the base entirely. `..` never climbs above the root.
pub fn resolve_path(base: &str, to: &str, policy: TrailingSlash) -> String {
    let mut segments: Vec<&str> = if to.starts_with('/') {
        Vec::new()
    } else {
        split_pathname(base)
    };

    for part in to.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = format!("/{}", segments.join("/"));
    let wants_trailing = to.len() > 1 && to.ends_with('/');
    match policy {
        TrailingSlash::Preserve if wants_trailing && joined != "/" => format!("{joined}/"),
        other => normalize_pathname(&joined, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_and_trim() {
        assert_eq!(clean_path("//a///b/"), "/a/b/");
        assert_eq!(trim_path("/a/b/"), "a/b");
        assert_eq!(trim_path("/"), "/");
        assert_eq!(join_paths(&["/posts", "", "$id"]), "/posts/$id");
    }

    #[test]
    fn test_normalize_policies() {
        assert_eq!(normalize_pathname("/a/b/", TrailingSlash::Never), "/a/b");
        assert_eq!(normalize_pathname("/a/b", TrailingSlash::Always), "/a/b/");
        assert_eq!(normalize_pathname("/a/b/", TrailingSlash::Preserve), "/a/b/");
        assert_eq!(normalize_pathname("/a/b", TrailingSlash::Preserve), "/a/b");
        assert_eq!(normalize_pathname("/", TrailingSlash::Always), "/");
        assert_eq!(normalize_pathname("a//b", TrailingSlash::Never), "/a/b");
    }

    #[test]
    fn test_resolve_relative() {
        let never = TrailingSlash::Never;
        assert_eq!(resolve_path("/a/b/c", "./d", never), "/a/b/c/d");
        assert_eq!(resolve_path("/a/b/c", "../d", never), "/a/b/d");
        assert_eq!(resolve_path("/a/b/c", "./d/", never), "/a/b/c/d");
        assert_eq!(resolve_path("/a/b/c", "./", never), "/a/b/c");
        assert_eq!(resolve_path("/a/b/c", "d/e", never), "/a/b/c/d/e");
        assert_eq!(resolve_path("/a", "../../..", never), "/");
    }

    #[test]
    fn test_resolve_absolute() {
        let never = TrailingSlash::Never;
        assert_eq!(resolve_path("/a/b/c", "/d", never), "/d");
        assert_eq!(resolve_path("/a/b/c", "/d/", never), "/d");
        assert_eq!(resolve_path("/a/b/c", "/", never), "/");
        assert_eq!(resolve_path("/a/b/c", "/d/", TrailingSlash::Preserve), "/d/");
        assert_eq!(resolve_path("/a", "./b", TrailingSlash::Always), "/a/b/");
    }

    #[test]
    fn test_resolve_keeps_param_tokens() {
        assert_eq!(
            resolve_path("/posts/$postId", "./comments/{-$page}", TrailingSlash::Never),
            "/posts/$postId/comments/{-$page}"
        );
    }
}
