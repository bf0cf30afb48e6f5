//! Picks one element out of a candidate set.
//!
//! Numeric anchors index the set. Textual anchors pick the candidate nearest
//! to an element matching the anchor text, measured as edges through the
//! deepest common ancestor of the two tree paths.
use crate::error::FindError;
use crate::matcher::{Candidate, CandidateSet};
use crate::request::Anchor;
use tracing::trace;

/// Number of edges between two nodes given their child-index paths.
pub fn tree_distance(a: &[u32], b: &[u32]) -> usize {
    let common = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    a.len() + b.len() - 2 * common
}

/// Choose the intended element.
///
/// `anchor_elements` are the elements matching a textual anchor (already
/// visibility-filtered); they are ignored for other anchors.
pub fn resolve(
    candidates: CandidateSet,
    anchor: Option<&Anchor>,
    anchor_elements: &[Candidate],
    strict: bool,
    target: &str,
) -> Result<Candidate, FindError> {
    let count = candidates.len();
    if count == 0 {
        return Err(FindError::NoMatch {
            target: target.to_string(),
        });
    }

    match anchor {
        None => {
            if strict && count > 1 {
                return Err(FindError::AmbiguousMatch {
                    target: target.to_string(),
                    count,
                });
            }
            first(candidates, target)
        }
        Some(Anchor::Index(0)) => Err(FindError::InvalidLocator(
            "anchor index starts at 1".to_string(),
        )),
        Some(Anchor::Index(index)) => candidates
            .into_iter()
            .nth(index - 1)
            .ok_or(FindError::AnchorOutOfRange {
                index: *index,
                count,
            }),
        Some(Anchor::Text(text)) => nearest(candidates, anchor_elements, text),
    }
}

fn first(candidates: CandidateSet, target: &str) -> Result<Candidate, FindError> {
    candidates.into_iter().next().ok_or_else(|| FindError::NoMatch {
        target: target.to_string(),
    })
}

fn nearest(
    candidates: CandidateSet,
    anchor_elements: &[Candidate],
    anchor_text: &str,
) -> Result<Candidate, FindError> {
    if anchor_elements.is_empty() {
        return Err(FindError::NoMatch {
            target: anchor_text.to_string(),
        });
    }
    if candidates.len() == 1 {
        return first(candidates, anchor_text);
    }

    let is_anchor = |c: &Candidate| anchor_elements.iter().any(|a| a.node.handle == c.node.handle);
    let pool: Vec<Candidate> = if candidates.iter().all(is_anchor) {
        candidates
    } else {
        candidates.into_iter().filter(|c| !is_anchor(c)).collect()
    };

    let mut best: Option<(usize, Candidate)> = None;
    for candidate in pool {
        let distance = anchor_elements
            .iter()
            .filter(|a| a.node.frame == candidate.node.frame)
            .map(|a| tree_distance(&candidate.node.path, &a.node.path))
            .min()
            .unwrap_or(usize::MAX);
        // strict less-than keeps the earliest candidate on ties
        if best.as_ref().map_or(true, |(d, _)| distance < *d) {
            best = Some((distance, candidate));
        }
    }
    let (distance, chosen) = best.ok_or(FindError::NoMatch {
        target: anchor_text.to_string(),
    })?;
    trace!(
        target: "finder.anchor",
        anchor = %anchor_text,
        distance,
        chosen = %chosen.node.handle,
        "finder.anchor.nearest"
    );
    Ok(chosen)
}
