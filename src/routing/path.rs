//! Path segmentation helpers.
//!
//! # Responsibilities
//! - Split registration and request paths into ordered segments
//! - Classify segments as static, `:param`, or `*catch-all`
//!
//! # Design Decisions
//! - "/" splits to zero segments; a request for it lands on the tree root
//! - A trailing slash produces a trailing empty segment, so "/foo" and
//!   "/foo/" stay distinct routes unless slash-insensitive mode drops
//!   empty segments
//! - No percent-decoding here; parameters bind the raw segment text

/// What a single path segment means to the route tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Matches its literal text only.
    Static,
    /// `:name` — matches any one segment, binding it to `name`.
    Param,
    /// `*name` — matches the whole remainder, binding it to `name`.
    CatchAll,
}

/// Classify one segment by its first byte.
pub fn classify(segment: &str) -> SegmentKind {
    match segment.as_bytes().first() {
        Some(b':') => SegmentKind::Param,
        Some(b'*') => SegmentKind::CatchAll,
        _ => SegmentKind::Static,
    }
}

/// The bound name of a `:param` or `*catch-all` segment.
///
/// Returns the segment unchanged when it carries no marker.
pub fn param_name(segment: &str) -> &str {
    segment
        .strip_prefix(':')
        .or_else(|| segment.strip_prefix('*'))
        .unwrap_or(segment)
}

/// Split a path into segments.
///
/// The leading slash never produces a segment. With `slash_insensitive`
/// set, empty segments (doubled or trailing slashes) are dropped entirely.
pub fn split(path: &str, slash_insensitive: bool) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    if slash_insensitive {
        trimmed.split('/').filter(|s| !s.is_empty()).collect()
    } else {
        trimmed.split('/').collect()
    }
}
