//! Covered/uncovered line reconciliation for a single entity.

use std::collections::BTreeSet;

/// Set of line numbers, kept ordered for stable report output.
pub type LineSet = BTreeSet<i32>;

/// Merge a new observation into an entity's existing line sets.
///
/// Covered lines are the union of both observations. Uncovered lines are the
/// union of both observations minus every covered line: a line that any test
/// method covered is covered, no matter how many others missed it.
///
/// The returned sets are always disjoint, even when the inputs are not.
pub fn reconcile(
    existing_covered: &LineSet,
    existing_uncovered: &LineSet,
    new_covered: &LineSet,
    new_uncovered: &LineSet,
) -> (LineSet, LineSet) {
    let covered: LineSet = existing_covered.union(new_covered).copied().collect();
    let uncovered: LineSet = existing_uncovered
        .union(new_uncovered)
        .filter(|line| !covered.contains(line))
        .copied()
        .collect();

    (covered, uncovered)
}
