//! Route path pattern compilation.
//!
//! # Syntax
//! - `invoices` static literal
//! - `$id` required param, `prefix{$id}suffix` with literals glued on
//! - `{-$id}` optional param, `prefix{-$id}suffix`
//! - `$` or `{$}` splat, `prefix{$}suffix`; always the final segment

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::path::codec::decode_component;
use crate::path::resolve::clean_path;

/// Param name under which a splat capture is stored.
pub const SPLAT_PARAM: &str = "_splat";

/// Kind of a compiled path token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal matched against one path component (stored decoded).
    Static(String),
    /// Required named param.
    Param(String),
    /// Named param that may be absent from a concrete pathname.
    OptionalParam(String),
    /// Catch-all for the remainder of the pathname.
    Splat,
}

/// One compiled path token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub kind: SegmentKind,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl PathSegment {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Static(value.into()),
            prefix: None,
            suffix: None,
        }
    }

    /// Returns true for params and splats.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self.kind, SegmentKind::Static(_))
    }

    /// Name of the param this segment binds, if any.
    pub fn param_name(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Static(_) => None,
            SegmentKind::Param(name) | SegmentKind::OptionalParam(name) => Some(name),
            SegmentKind::Splat => Some(SPLAT_PARAM),
        }
    }

    /// Key used for alphabetical tie-breaks when ranking.
    pub(crate) fn sort_key(&self) -> String {
        match &self.kind {
            SegmentKind::Static(lit) => lit.clone(),
            SegmentKind::Param(name) | SegmentKind::OptionalParam(name) => format!("${name}"),
            SegmentKind::Splat => "$".to_string(),
        }
    }

    pub(crate) fn prefix_len(&self) -> usize {
        self.prefix.as_deref().map_or(0, |p| p.chars().count())
    }

    pub(crate) fn suffix_len(&self) -> usize {
        self.suffix.as_deref().map_or(0, |s| s.chars().count())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let suffix = self.suffix.as_deref().unwrap_or("");
        let braced = !prefix.is_empty() || !suffix.is_empty();
        match &self.kind {
            SegmentKind::Static(lit) => write!(f, "{lit}"),
            SegmentKind::Param(name) if braced => write!(f, "{prefix}{{${name}}}{suffix}"),
            SegmentKind::Param(name) => write!(f, "${name}"),
            SegmentKind::OptionalParam(name) => write!(f, "{prefix}{{-${name}}}{suffix}"),
            SegmentKind::Splat if braced => write!(f, "{prefix}{{$}}{suffix}"),
            SegmentKind::Splat => write!(f, "$"),
        }
    }
}

/// Errors raised while compiling a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("splat must be the final segment in pattern `{pattern}`")]
    SplatNotLast { pattern: String },

    #[error("unbalanced braces in segment `{segment}` of pattern `{pattern}`")]
    UnbalancedBraces { pattern: String, segment: String },

    #[error("invalid parameter name `{name}` in pattern `{pattern}`")]
    InvalidParamName { pattern: String, name: String },

    #[error("duplicate parameter `{name}` in pattern `{pattern}`")]
    DuplicateParam { pattern: String, name: String },
}

/// A pattern compiled into segments, leading and trailing slashes dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    raw: String,
    segments: Vec<PathSegment>,
}

impl CompiledPattern {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<PathSegment> {
        self.segments
    }
}

/// Compile a route path pattern.
pub fn compile(pattern: &str) -> Result<CompiledPattern, PatternError> {
    let cleaned = clean_path(pattern);
    let mut segments = Vec::new();
    for part in cleaned.split('/').filter(|p| !p.is_empty()) {
        segments.push(parse_segment(pattern, part)?);
    }

    if let Some(pos) = segments.iter().position(|s| s.kind == SegmentKind::Splat) {
        if pos + 1 != segments.len() {
            return Err(PatternError::SplatNotLast {
                pattern: pattern.to_string(),
            });
        }
    }

    let mut seen = HashSet::new();
    for name in segments.iter().filter_map(PathSegment::param_name) {
        if !seen.insert(name) {
            return Err(PatternError::DuplicateParam {
                pattern: pattern.to_string(),
                name: name.to_string(),
            });
        }
    }

    Ok(CompiledPattern {
        raw: pattern.to_string(),
        segments,
    })
}

fn parse_segment(pattern: &str, part: &str) -> Result<PathSegment, PatternError> {
    let unbalanced = || PatternError::UnbalancedBraces {
        pattern: pattern.to_string(),
        segment: part.to_string(),
    };

    if let Some(open) = part.find('{') {
        let close = part[open..].find('}').map(|i| open + i).ok_or_else(unbalanced)?;
        let prefix = &part[..open];
        let inner = &part[open + 1..close];
        let suffix = &part[close + 1..];
        if prefix.contains('}') || suffix.contains('{') || suffix.contains('}') || inner.contains('{') {
            return Err(unbalanced());
        }

        let kind = if inner == "$" {
            SegmentKind::Splat
        } else if let Some(name) = inner.strip_prefix("-$") {
            SegmentKind::OptionalParam(validate_name(pattern, name)?)
        } else if let Some(name) = inner.strip_prefix('$') {
            SegmentKind::Param(validate_name(pattern, name)?)
        } else {
            return Err(PatternError::InvalidParamName {
                pattern: pattern.to_string(),
                name: inner.to_string(),
            });
        };

        return Ok(PathSegment {
            kind,
            prefix: non_empty(prefix),
            suffix: non_empty(suffix),
        });
    }

    if part.contains('}') {
        return Err(unbalanced());
    }

    if part == "$" {
        return Ok(PathSegment {
            kind: SegmentKind::Splat,
            prefix: None,
            suffix: None,
        });
    }

    if let Some(name) = part.strip_prefix('$') {
        return Ok(PathSegment {
            kind: SegmentKind::Param(validate_name(pattern, name)?),
            prefix: None,
            suffix: None,
        });
    }

    Ok(PathSegment::literal(decode_component(part)))
}

fn validate_name(pattern: &str, name: &str) -> Result<String, PatternError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        Ok(name.to_string())
    } else {
        Err(PatternError::InvalidParamName {
            pattern: pattern.to_string(),
            name: name.to_string(),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| decode_component(s))
}
