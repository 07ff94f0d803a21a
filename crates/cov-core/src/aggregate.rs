//! Folding coverage records into per-entity summaries.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::error::Result;
use crate::reconcile::{reconcile, LineSet};
use crate::record::{normalize, EntityKind, RawCoverageRecord};

/// Per-entity summaries keyed by class or trigger name.
pub type EntityMap = BTreeMap<String, CoverageSummary>;

/// Cumulative coverage for one class or trigger.
///
/// Covered and uncovered lines are always disjoint. Percentages are kept in
/// step with the line sets on every merge.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSummary {
    id: String,
    kind: EntityKind,
    covered: LineSet,
    uncovered: LineSet,
    coverage_percentage: f64,
    uncovered_percentage: f64,
}

impl CoverageSummary {
    /// Create a summary from one observation.
    pub fn new(id: impl Into<String>, kind: EntityKind, covered: LineSet, uncovered: LineSet) -> Self {
        let mut summary = Self {
            id: id.into(),
            kind,
            covered: LineSet::new(),
            uncovered: LineSet::new(),
            coverage_percentage: 0.0,
            uncovered_percentage: 100.0,
        };
        summary.merge_lines(&covered, &uncovered);
        summary
    }

    /// Merge another observation's lines into this summary.
    pub fn merge_lines(&mut self, covered: &LineSet, uncovered: &LineSet) {
        let (covered, uncovered) = reconcile(&self.covered, &self.uncovered, covered, uncovered);
        self.covered = covered;
        self.uncovered = uncovered;
        self.coverage_percentage = percentage(self.covered.len(), self.uncovered.len());
        self.uncovered_percentage = 100.0 - self.coverage_percentage;
    }

    /// Keep whichever of the current and the given identity ranks first.
    ///
    /// Identities are ranked by kind, then by id, so the result does not
    /// depend on which observation arrived first. Returns the replaced
    /// identity, if any.
    fn settle_identity(&mut self, id: &str, kind: EntityKind) -> Option<(String, EntityKind)> {
        if (kind, id) < (self.kind, self.id.as_str()) {
            let previous_kind = std::mem::replace(&mut self.kind, kind);
            let previous_id = std::mem::replace(&mut self.id, id.to_string());
            Some((previous_id, previous_kind))
        } else {
            None
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn covered_lines(&self) -> &LineSet {
        &self.covered
    }

    pub fn uncovered_lines(&self) -> &LineSet {
        &self.uncovered
    }

    pub fn covered_count(&self) -> usize {
        self.covered.len()
    }

    pub fn uncovered_count(&self) -> usize {
        self.uncovered.len()
    }

    /// Covered lines as a percentage of all known lines (0.0 when there are none).
    pub fn coverage_percentage(&self) -> f64 {
        self.coverage_percentage
    }

    /// `100 - coverage_percentage`.
    pub fn uncovered_percentage(&self) -> f64 {
        self.uncovered_percentage
    }
}

/// Percentage of covered lines, or 0.0 if there are no lines at all.
pub fn percentage(covered: usize, uncovered: usize) -> f64 {
    let total = covered + uncovered;
    if total == 0 {
        return 0.0;
    }

    (covered as f64 / total as f64) * 100.0
}

/// Fold one raw record into the accumulator.
///
/// Records sharing a name merge their lines. If they disagree on id or kind
/// (a class and a trigger may share a name), the entity keeps the lowest
/// ranked identity: `ApexClass` before `ApexTrigger` before `Unknown`, then
/// the smaller id.
pub fn merge_record(mut entities: EntityMap, record: &RawCoverageRecord) -> Result<EntityMap> {
    let normalized = normalize(record)?;

    match entities.get_mut(&normalized.name) {
        Some(summary) => {
            if let Some((previous_id, previous_kind)) =
                summary.settle_identity(&normalized.id, normalized.kind)
            {
                debug!(
                    entity = %normalized.name,
                    previous_id = %previous_id,
                    previous_kind = %previous_kind,
                    id = %normalized.id,
                    kind = %normalized.kind,
                    "Conflicting identity for entity name"
                );
            }
            summary.merge_lines(&normalized.covered, &normalized.uncovered);
            trace!(
                entity = %normalized.name,
                covered = summary.covered_count(),
                uncovered = summary.uncovered_count(),
                "Merged coverage observation"
            );
        }
        None => {
            debug!(entity = %normalized.name, kind = %normalized.kind, "New coverage entity");
            let summary = CoverageSummary::new(
                normalized.id,
                normalized.kind,
                normalized.covered,
                normalized.uncovered,
            );
            entities.insert(normalized.name, summary);
        }
    }

    Ok(entities)
}

/// Aggregate raw records into one summary per entity name.
///
/// Record order does not affect the result. An empty input yields an empty
/// map. The first malformed record aborts the fold.
pub fn aggregate<'a, I>(records: I) -> Result<EntityMap>
where
    I: IntoIterator<Item = &'a RawCoverageRecord>,
{
    let mut observed = 0usize;
    let entities = records.into_iter().try_fold(EntityMap::new(), |acc, record| {
        observed += 1;
        merge_record(acc, record)
    })?;

    debug!(
        records = observed,
        entities = entities.len(),
        "Aggregated coverage records"
    );
    Ok(entities)
}

// Wire shape of a summary inside the report.

#[derive(Serialize)]
struct SummaryView<'a> {
    #[serde(rename = "Id")]
    id: &'a str,
    #[serde(rename = "type")]
    kind: EntityKind,
    coverage: CoverageView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CoverageView<'a> {
    covered_lines: LinesView<'a>,
    uncovered_lines: LinesView<'a>,
    coverage_percentage: f64,
    uncovered_percentage: f64,
}

#[derive(Serialize)]
struct LinesView<'a> {
    lines: &'a LineSet,
    length: usize,
}

impl Serialize for CoverageSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        SummaryView {
            id: &self.id,
            kind: self.kind,
            coverage: CoverageView {
                covered_lines: LinesView {
                    lines: &self.covered,
                    length: self.covered.len(),
                },
                uncovered_lines: LinesView {
                    lines: &self.uncovered,
                    length: self.uncovered.len(),
                },
                coverage_percentage: self.coverage_percentage,
                uncovered_percentage: self.uncovered_percentage,
            },
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO_ID: &str = "01p000000000001AAA";
    const FOO_URL: &str = "/services/data/v62.0/tooling/sobjects/ApexClass/01p000000000001AAA";
    const BAR_ID: &str = "01q000000000001AAA";
    const BAR_URL: &str = "/services/data/v62.0/tooling/sobjects/ApexTrigger/01q000000000001AAA";

    fn foo(covered: Vec<i32>, uncovered: Vec<i32>) -> RawCoverageRecord {
        RawCoverageRecord::new(FOO_ID, "FooTest", FOO_URL).with_lines(covered, uncovered)
    }

    fn bar(covered: Vec<i32>, uncovered: Vec<i32>) -> RawCoverageRecord {
        RawCoverageRecord::new(BAR_ID, "BarTrigger", BAR_URL).with_lines(covered, uncovered)
    }

    fn lines(set: &LineSet) -> Vec<i32> {
        set.iter().copied().collect()
    }

    #[test]
    fn test_foo_example() {
        let entities = aggregate(&[foo(vec![1, 2, 3], vec![4, 5]), foo(vec![4], vec![6])]).unwrap();

        let summary = &entities["FooTest"];
        assert_eq!(summary.id(), FOO_ID);
        assert_eq!(summary.kind(), EntityKind::Class);
        assert_eq!(lines(summary.covered_lines()), vec![1, 2, 3, 4]);
        assert_eq!(lines(summary.uncovered_lines()), vec![5, 6]);
        assert_eq!(summary.covered_count(), 4);
        assert_eq!(summary.uncovered_count(), 2);
        assert!((summary.coverage_percentage() - 66.666_666).abs() < 0.001);
        assert!((summary.uncovered_percentage() - 33.333_333).abs() < 0.001);
    }

    #[test]
    fn test_bar_trigger_without_lines() {
        let entities = aggregate(&[bar(vec![], vec![])]).unwrap();

        let summary = &entities["BarTrigger"];
        assert_eq!(summary.kind(), EntityKind::Trigger);
        assert_eq!(summary.coverage_percentage(), 0.0);
        assert_eq!(summary.uncovered_percentage(), 100.0);
    }

    #[test]
    fn test_zero_covered_is_distinct_from_no_lines() {
        let entities = aggregate(&[bar(vec![], vec![1, 2])]).unwrap();

        let summary = &entities["BarTrigger"];
        assert_eq!(summary.uncovered_count(), 2);
        assert_eq!(summary.coverage_percentage(), 0.0);
        assert_eq!(summary.uncovered_percentage(), 100.0);
    }

    #[test]
    fn test_percentage_policy() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(0, 5), 0.0);
        assert_eq!(percentage(5, 0), 100.0);
        assert_eq!(percentage(1, 3), 25.0);
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<RawCoverageRecord> = Vec::new();
        assert!(aggregate(&records).unwrap().is_empty());
    }

    #[test]
    fn test_commutativity() {
        let a = foo(vec![1, 2], vec![3, 5]);
        let b = foo(vec![5], vec![2, 6]);
        let c = bar(vec![10], vec![11]);

        let forward = aggregate(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let reverse = aggregate(&[c, b, a]).unwrap();

        assert_eq!(forward, reverse);
        assert_eq!(lines(forward["FooTest"].covered_lines()), vec![1, 2, 5]);
        assert_eq!(lines(forward["FooTest"].uncovered_lines()), vec![3, 6]);
    }

    #[test]
    fn test_union_correctness_line_five() {
        let covered_first = aggregate(&[foo(vec![5], vec![]), foo(vec![], vec![5])]).unwrap();
        let uncovered_first = aggregate(&[foo(vec![], vec![5]), foo(vec![5], vec![])]).unwrap();

        for entities in [covered_first, uncovered_first] {
            let summary = &entities["FooTest"];
            assert!(summary.covered_lines().contains(&5));
            assert!(!summary.uncovered_lines().contains(&5));
        }
    }

    #[test]
    fn test_idempotent_re_merge() {
        let record = foo(vec![1, 2, 3], vec![4, 5]);
        let once = aggregate(std::slice::from_ref(&record)).unwrap();
        let twice = merge_record(once.clone(), &record).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_disjoint_on_first_sighting() {
        let entities = aggregate(&[foo(vec![1, 2], vec![2, 3])]).unwrap();

        let summary = &entities["FooTest"];
        assert!(summary.covered_lines().is_disjoint(summary.uncovered_lines()));
        assert_eq!(lines(summary.uncovered_lines()), vec![3]);
    }

    #[test]
    fn test_disjointness_across_many_records() {
        let records: Vec<RawCoverageRecord> = (0..20)
            .map(|i| foo(vec![i, i + 1], vec![i + 2, i + 3, 40 - i]))
            .collect();

        let entities = aggregate(&records).unwrap();
        for summary in entities.values() {
            assert!(summary.covered_lines().is_disjoint(summary.uncovered_lines()));
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let lower = RawCoverageRecord::new(FOO_ID, "footest", FOO_URL).with_lines(vec![1], vec![]);
        let entities = aggregate(&[foo(vec![2], vec![]), lower]).unwrap();

        assert_eq!(entities.len(), 2);
        assert!(entities.contains_key("FooTest"));
        assert!(entities.contains_key("footest"));
    }

    #[test]
    fn test_conflicting_identity_is_order_independent() {
        let class = RawCoverageRecord::new(FOO_ID, "Shared", FOO_URL).with_lines(vec![1], vec![2]);
        let trigger = RawCoverageRecord::new(BAR_ID, "Shared", BAR_URL).with_lines(vec![2], vec![3]);

        let forward = aggregate(&[class.clone(), trigger.clone()]).unwrap();
        let reverse = aggregate(&[trigger, class]).unwrap();

        assert_eq!(forward, reverse);
        let summary = &forward["Shared"];
        assert_eq!(summary.id(), FOO_ID);
        assert_eq!(summary.kind(), EntityKind::Class);
        assert_eq!(lines(summary.covered_lines()), vec![1, 2]);
        assert_eq!(lines(summary.uncovered_lines()), vec![3]);
    }

    #[test]
    fn test_conflicting_ids_of_same_kind_keep_smaller_id() {
        let newer = RawCoverageRecord::new("01p000000000002AAA", "FooTest", FOO_URL)
            .with_lines(vec![9], vec![]);
        let unknown = RawCoverageRecord::new("01p000000000000AAA", "FooTest", "/sobjects/Other/1")
            .with_lines(vec![], vec![10]);

        for records in [
            [newer.clone(), foo(vec![1], vec![]), unknown.clone()],
            [unknown.clone(), newer.clone(), foo(vec![1], vec![])],
            [foo(vec![1], vec![]), unknown, newer],
        ] {
            let entities = aggregate(&records).unwrap();
            let summary = &entities["FooTest"];
            assert_eq!(summary.id(), FOO_ID);
            assert_eq!(summary.kind(), EntityKind::Class);
            assert_eq!(lines(summary.covered_lines()), vec![1, 9]);
        }
    }

    #[test]
    fn test_kind_precedence() {
        assert!(EntityKind::Class < EntityKind::Trigger);
        assert!(EntityKind::Trigger < EntityKind::Unknown);
    }

    #[test]
    fn test_malformed_record_aborts() {
        let mut broken = foo(vec![1], vec![]);
        broken.covered_lines = None;

        let err = aggregate(&[foo(vec![1], vec![2]), broken]).unwrap_err();
        assert!(err.is_malformed_record());
    }

    #[test]
    fn test_summary_serialization_shape() {
        let entities = aggregate(&[foo(vec![3, 1], vec![2])]).unwrap();
        let json = serde_json::to_value(&entities["FooTest"]).unwrap();

        assert_eq!(json["Id"], FOO_ID);
        assert_eq!(json["type"], "ApexClass");
        assert_eq!(json["coverage"]["coveredLines"]["lines"], serde_json::json!([1, 3]));
        assert_eq!(json["coverage"]["coveredLines"]["length"], 2);
        assert_eq!(json["coverage"]["uncoveredLines"]["lines"], serde_json::json!([2]));
        assert_eq!(json["coverage"]["uncoveredLines"]["length"], 1);
        let pct = json["coverage"]["coveragePercentage"].as_f64().unwrap();
        assert!((pct - 66.666_666).abs() < 0.001);
        assert!(json["coverage"]["uncoveredPercentage"].is_f64());
    }
}
