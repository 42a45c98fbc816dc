//! Route ranking.
//!
//! Every routable node gets one score per path token. Scores are compared
//! segment by segment, so `/posts/new` outranks `/posts/$id`, which
//! outranks `/posts/{-$id}`, which outranks `/posts/$`.
//!
//! Scores are integers scaled by 10 000 so comparisons are exact. When one
//! path's scores are a prefix of another's, the shorter path ranks as if it
//! ended in a token scoring just under a required param: deeper static or
//! required segments win, trailing optionals and splats lose. Ordering is a
//! plain lexicographic comparison, so it is total.

use std::cmp::Ordering;

use crate::path::{PathSegment, SegmentKind};

const SLASH_SCORE: u32 = 7_500;
const STATIC_SEGMENT_SCORE: u32 = 10_000;
const REQUIRED_PARAM_BASE_SCORE: u32 = 5_000;
const OPTIONAL_PARAM_BASE_SCORE: u32 = 4_000;
const WILDCARD_PARAM_BASE_SCORE: u32 = 2_500;
const STATIC_AFTER_DYNAMIC_BONUS_SCORE: u32 = 2_000;
const BOTH_PRESENCE_BASE_SCORE: u32 = 500;
const PREFIX_PRESENCE_BASE_SCORE: u32 = 200;
const SUFFIX_PRESENCE_BASE_SCORE: u32 = 100;
const PREFIX_LENGTH_MULTIPLIER: u32 = 2;
const SUFFIX_LENGTH_MULTIPLIER: u32 = 1;
/// Where the end of a path sorts among token scores, doubled so it never
/// ties with a real score.
const END_OF_PATH_RANK: u64 = 2 * REQUIRED_PARAM_BASE_SCORE as u64 - 1;

/// One token of a ranked path: a compiled segment or the trailing slash
/// that marks an index route.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RankToken<'a> {
    Slash,
    Segment(&'a PathSegment),
}

impl RankToken<'_> {
    fn is_static(&self) -> bool {
        matches!(self, RankToken::Segment(seg) if !seg.is_dynamic())
    }

    fn sort_key(&self) -> String {
        match self {
            RankToken::Slash => "/".to_string(),
            RankToken::Segment(seg) => seg.sort_key(),
        }
    }
}

/// Ranking inputs for one node.
#[derive(Debug, Clone)]
pub(crate) struct RankEntry {
    pub node: usize,
    scores: Vec<u32>,
    keys: Vec<String>,
}

impl RankEntry {
    pub(crate) fn new(node: usize, tokens: &[RankToken<'_>]) -> Self {
        let scores = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let seg = match token {
                    RankToken::Slash => return SLASH_SCORE,
                    RankToken::Segment(seg) => seg,
                };
                let base = match seg.kind {
                    SegmentKind::Static(_) => return STATIC_SEGMENT_SCORE,
                    SegmentKind::Param(_) => REQUIRED_PARAM_BASE_SCORE,
                    SegmentKind::OptionalParam(_) => OPTIONAL_PARAM_BASE_SCORE,
                    SegmentKind::Splat => WILDCARD_PARAM_BASE_SCORE,
                };
                if tokens[i + 1..].iter().any(RankToken::is_static) {
                    param_score(seg, base + STATIC_AFTER_DYNAMIC_BONUS_SCORE)
                } else {
                    param_score(seg, base)
                }
            })
            .collect();

        Self {
            node,
            scores,
            keys: tokens.iter().map(RankToken::sort_key).collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn scores(&self) -> &[u32] {
        &self.scores
    }

    /// Doubled scores followed by the end-of-path marker.
    fn ranks(&self) -> impl Iterator<Item = u64> + '_ {
        self.scores
            .iter()
            .map(|&score| 2 * u64::from(score))
            .chain(std::iter::once(END_OF_PATH_RANK))
    }
}

fn param_score(seg: &PathSegment, base: u32) -> u32 {
    let prefix = seg.prefix_len() as u32;
    let suffix = seg.suffix_len() as u32;
    match (prefix > 0, suffix > 0) {
        (true, true) => {
            base + BOTH_PRESENCE_BASE_SCORE + PREFIX_LENGTH_MULTIPLIER * prefix + SUFFIX_LENGTH_MULTIPLIER * suffix
        }
        (true, false) => base + PREFIX_PRESENCE_BASE_SCORE + PREFIX_LENGTH_MULTIPLIER * prefix,
        (false, true) => base + SUFFIX_PRESENCE_BASE_SCORE + SUFFIX_LENGTH_MULTIPLIER * suffix,
        (false, false) => base,
    }
}

/// Total order over ranked entries; `Less` means "try first".
pub(crate) fn compare(a: &RankEntry, b: &RankEntry) -> Ordering {
    // higher ranks first
    b.ranks()
        .cmp(a.ranks())
        .then_with(|| a.keys.cmp(&b.keys))
        .then_with(|| a.node.cmp(&b.node))
}

/// Sort entries into match order.
pub(crate) fn rank(mut entries: Vec<RankEntry>) -> Vec<usize> {
    entries.sort_by(compare);
    entries.into_iter().map(|e| e.node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::compile;

    fn entry(node: usize, pattern: &str, index: bool) -> RankEntry {
        let segments = compile(pattern).unwrap().into_segments();
        let mut tokens: Vec<RankToken<'_>> = segments.iter().map(RankToken::Segment).collect();
        if index {
            tokens.push(RankToken::Slash);
        }
        RankEntry::new(node, &tokens)
    }

    #[test]
    fn test_segment_scores() {
        assert_eq!(entry(0, "/posts/$id", false).scores(), &[10_000, 5_000]);
        assert_eq!(entry(0, "/posts/$id/edit", false).scores(), &[10_000, 7_000, 10_000]);
        assert_eq!(entry(0, "/files/prefix{$}", false).scores(), &[10_000, 2_500 + 200 + 12]);
        assert_eq!(entry(0, "/", true).scores(), &[7_500]);
    }

    #[test]
    fn test_kind_precedence() {
        let order = rank(vec![
            entry(0, "/posts/$", false),
            entry(1, "/posts/{-$id}", false),
            entry(2, "/posts/$id", false),
            entry(3, "/posts/new", false),
        ]);
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_index_outranks_its_layout() {
        let order = rank(vec![entry(0, "/posts", false), entry(1, "/posts", true)]);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_deeper_wins_on_equal_prefix() {
        let order = rank(vec![entry(0, "/a", false), entry(1, "/a/b", false)]);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_fewer_optionals_first() {
        let order = rank(vec![
            entry(0, "/posts/{-$category}/{-$slug}", false),
            entry(1, "/posts/{-$category}", false),
        ]);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_index_beats_trailing_optional_sibling() {
        let layout = entry(0, "/a", false);
        let index = entry(1, "/a", true);
        let optional = entry(2, "/a/a/{-$o}", false);
        assert_eq!(compare(&optional, &index), Ordering::Less);
        assert_eq!(compare(&index, &layout), Ordering::Less);
        assert_eq!(compare(&optional, &layout), Ordering::Less);
        assert_eq!(rank(vec![layout, optional, index]), vec![2, 1, 0]);
    }

    #[test]
    fn test_compare_is_a_total_order() {
        let mut patterns = Vec::new();
        for first in ["a", "$p", "{-$o}", "$", "x{$p}", "{$p}.json"] {
            patterns.push((format!("/{first}"), false));
            patterns.push((format!("/{first}"), true));
            if first == "$" {
                continue;
            }
            for second in ["a", "b", "$q", "{-$r}", "$"] {
                patterns.push((format!("/{first}/{second}"), false));
                patterns.push((format!("/{first}/{second}"), true));
            }
        }
        let entries: Vec<RankEntry> = patterns
            .iter()
            .enumerate()
            .map(|(i, (p, index))| entry(i, p, *index))
            .collect();

        for a in &entries {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in &entries {
                assert_eq!(compare(a, b), compare(b, a).reverse());
                for c in &entries {
                    if compare(a, b) == Ordering::Less && compare(b, c) == Ordering::Less {
                        assert_eq!(compare(a, c), Ordering::Less, "{} {} {}", a.node, b.node, c.node);
                    }
                }
            }
        }
    }

    #[test]
    fn test_alphabetical_then_index() {
        let order = rank(vec![entry(0, "/b", false), entry(1, "/a", false), entry(2, "/a", false)]);
        assert_eq!(order, vec![1, 2, 0]);
    }
}
