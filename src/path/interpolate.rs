//! Rendering compiled patterns back into concrete pathnames.

use crate::path::codec::{encode_param, encode_splat};
use crate::path::pattern::{PathSegment, SegmentKind, SPLAT_PARAM};
use crate::path::Params;

/// Result of substituting params into a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpolatedPath {
    /// Rendered pathname, always starting with `/`, no trailing slash.
    pub path: String,
    /// Params that were actually consumed.
    pub used_params: Params,
    /// Required params the caller did not supply.
    pub missing_params: Vec<String>,
}

impl InterpolatedPath {
    pub fn is_complete(&self) -> bool {
        self.missing_params.is_empty()
    }
}

/// Substitute `params` into `segments`.
///
/// Missing optional params and empty splats drop their segment entirely,
/// keeping any literal prefix or suffix. Missing required params are reported
/// and rendered as empty so the caller decides whether that is fatal.
pub fn interpolate_path(segments: &[PathSegment], params: &Params, allowed: &[char]) -> InterpolatedPath {
    let mut parts = Vec::with_capacity(segments.len());
    let mut used_params = Params::new();
    let mut missing_params = Vec::new();

    for seg in segments {
        let prefix = seg.prefix.as_deref().map(|p| encode_param(p, allowed)).unwrap_or_default();
        let suffix = seg.suffix.as_deref().map(|s| encode_param(s, allowed)).unwrap_or_default();

        match &seg.kind {
            SegmentKind::Static(lit) => parts.push(encode_param(lit, allowed)),
            SegmentKind::Param(name) => match params.get(name) {
                Some(value) => {
                    used_params.insert(name.clone(), value.clone());
                    parts.push(format!("{prefix}{}{suffix}", encode_param(value, allowed)));
                }
                None => {
                    missing_params.push(name.clone());
                    if !prefix.is_empty() || !suffix.is_empty() {
                        parts.push(format!("{prefix}{suffix}"));
                    }
                }
            },
            SegmentKind::OptionalParam(name) => match params.get(name).filter(|v| !v.is_empty()) {
                Some(value) => {
                    used_params.insert(name.clone(), value.clone());
                    parts.push(format!("{prefix}{}{suffix}", encode_param(value, allowed)));
                }
                None => {
                    if !prefix.is_empty() || !suffix.is_empty() {
                        parts.push(format!("{prefix}{suffix}"));
                    }
                }
            },
            SegmentKind::Splat => match params.get(SPLAT_PARAM).filter(|v| !v.is_empty()) {
                Some(value) => {
                    used_params.insert(SPLAT_PARAM.to_string(), value.clone());
                    parts.push(format!("{prefix}{}{suffix}", encode_splat(value)));
                }
                None => {
                    if !prefix.is_empty() || !suffix.is_empty() {
                        parts.push(format!("{prefix}{suffix}"));
                    }
                }
            },
        }
    }

    let path = format!("/{}", parts.join("/"));
    InterpolatedPath {
        path: crate::path::clean_path(&path),
        used_params,
        missing_params,
    }
}
