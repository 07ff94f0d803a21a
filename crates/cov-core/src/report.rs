//! Report finalization and serialization.

use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::aggregate::{percentage, CoverageSummary, EntityMap};

/// Top-level key holding the locally computed total.
pub const TOTAL_COVERAGE_KEY: &str = "TotalCoverage";

/// Top-level key holding the platform's org-wide baseline.
pub const ORG_COVERAGE_KEY: &str = "OrgCoverage";

/// How the report is laid out when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportLayout {
    /// Entities and the two totals share one top-level object.
    ///
    /// An entity literally named `TotalCoverage` or `OrgCoverage` cannot be
    /// represented; serialization fails rather than overwrite it.
    #[default]
    Flat,
    /// Entities under `"entities"`, totals under `"totals"`.
    Enveloped,
}

impl ReportLayout {
    /// Parse a layout name (`flat` or `enveloped`, case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flat" => Some(ReportLayout::Flat),
            "enveloped" | "envelope" => Some(ReportLayout::Enveloped),
            _ => None,
        }
    }
}

/// Final coverage report for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    entities: EntityMap,
    total_covered: usize,
    total_uncovered: usize,
    total_coverage: f64,
    org_coverage: f64,
}

/// Compute org-wide totals and attach the platform baseline.
///
/// `org_baseline` is stored as given. It comes from a separate platform
/// computation and may legitimately differ from the local total.
pub fn finalize(entities: EntityMap, org_baseline: f64) -> AggregateReport {
    let (total_covered, total_uncovered) = entities
        .values()
        .fold((0usize, 0usize), |(covered, uncovered), summary| {
            (
                covered + summary.covered_count(),
                uncovered + summary.uncovered_count(),
            )
        });

    for reserved in [TOTAL_COVERAGE_KEY, ORG_COVERAGE_KEY] {
        if entities.contains_key(reserved) {
            warn!(
                entity = reserved,
                "Entity name collides with a report total; use the enveloped layout"
            );
        }
    }

    let total_coverage = percentage(total_covered, total_uncovered);

    info!(
        entities = entities.len(),
        total_covered,
        total_uncovered,
        total_coverage,
        org_coverage = org_baseline,
        "Finalized coverage report"
    );

    AggregateReport {
        entities,
        total_covered,
        total_uncovered,
        total_coverage,
        org_coverage: org_baseline,
    }
}

impl AggregateReport {
    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    /// Look up one entity's summary.
    pub fn entity(&self, name: &str) -> Option<&CoverageSummary> {
        self.entities.get(name)
    }

    /// Sum of covered lines across all entities.
    pub fn total_covered(&self) -> usize {
        self.total_covered
    }

    /// Sum of uncovered lines across all entities.
    pub fn total_uncovered(&self) -> usize {
        self.total_uncovered
    }

    /// Locally computed org-wide percentage (0.0 when there are no lines).
    pub fn total_coverage(&self) -> f64 {
        self.total_coverage
    }

    /// Baseline percentage reported by the platform.
    pub fn org_coverage(&self) -> f64 {
        self.org_coverage
    }

    /// Borrow this report for serialization in the given layout.
    pub fn with_layout(&self, layout: ReportLayout) -> LayoutView<'_> {
        LayoutView {
            report: self,
            layout,
        }
    }

    /// Serialize to pretty-printed JSON in the given layout.
    pub fn to_json_pretty(&self, layout: ReportLayout) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.with_layout(layout))
    }
}

/// A report paired with the layout to serialize it in.
#[derive(Debug, Clone, Copy)]
pub struct LayoutView<'a> {
    report: &'a AggregateReport,
    layout: ReportLayout,
}

#[derive(Serialize)]
struct Totals {
    #[serde(rename = "TotalCoverage")]
    total_coverage: f64,
    #[serde(rename = "OrgCoverage")]
    org_coverage: f64,
}

#[derive(Serialize)]
struct Envelope<'a> {
    entities: &'a EntityMap,
    totals: Totals,
}

impl Serialize for LayoutView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let report = self.report;
        match self.layout {
            ReportLayout::Flat => {
                let mut map = serializer.serialize_map(Some(report.entities.len() + 2))?;
                for (name, summary) in &report.entities {
                    if name == TOTAL_COVERAGE_KEY || name == ORG_COVERAGE_KEY {
                        return Err(S::Error::custom(format!(
                            "entity '{}' collides with a report total key",
                            name
                        )));
                    }
                    map.serialize_entry(name, summary)?;
                }
                map.serialize_entry(TOTAL_COVERAGE_KEY, &report.total_coverage)?;
                map.serialize_entry(ORG_COVERAGE_KEY, &report.org_coverage)?;
                map.end()
            }
            ReportLayout::Enveloped => Envelope {
                entities: &report.entities,
                totals: Totals {
                    total_coverage: report.total_coverage,
                    org_coverage: report.org_coverage,
                },
            }
            .serialize(serializer),
        }
    }
}

impl Serialize for AggregateReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with_layout(ReportLayout::Flat).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::record::RawCoverageRecord;

    const CLASS_URL: &str = "/services/data/v62.0/tooling/sobjects/ApexClass/01p";
    const TRIGGER_URL: &str = "/services/data/v62.0/tooling/sobjects/ApexTrigger/01q";

    fn record(name: &str, url: &str, covered: Vec<i32>, uncovered: Vec<i32>) -> RawCoverageRecord {
        RawCoverageRecord::new(format!("id-{name}"), name, url).with_lines(covered, uncovered)
    }

    fn sample() -> AggregateReport {
        let entities = aggregate(&[
            record("FooTest", CLASS_URL, vec![1, 2, 3], vec![4, 5]),
            record("FooTest", CLASS_URL, vec![4], vec![6]),
            record("BarTrigger", TRIGGER_URL, vec![], vec![]),
            record("Baz", CLASS_URL, vec![10], vec![11, 12, 13]),
        ])
        .unwrap();
        finalize(entities, 72.0)
    }

    #[test]
    fn test_totals_are_sums() {
        let report = sample();

        let covered: usize = report.entities().values().map(|s| s.covered_count()).sum();
        let uncovered: usize = report.entities().values().map(|s| s.uncovered_count()).sum();
        assert_eq!(report.total_covered(), covered);
        assert_eq!(report.total_uncovered(), uncovered);
        assert_eq!(report.total_covered(), 5);
        assert_eq!(report.total_uncovered(), 5);

        let expected = covered as f64 / (covered + uncovered) as f64 * 100.0;
        assert!((report.total_coverage() - expected).abs() < 1e-9);
        assert!((report.total_coverage() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_attached_verbatim() {
        let report = sample();
        assert_eq!(report.org_coverage(), 72.0);
    }

    #[test]
    fn test_empty_report() {
        let report = finalize(EntityMap::new(), 0.0);
        assert_eq!(report.total_coverage(), 0.0);
        assert_eq!(report.total_covered(), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"TotalCoverage": 0.0, "OrgCoverage": 0.0}));
    }

    #[test]
    fn test_all_entities_empty() {
        let entities = aggregate(&[record("BarTrigger", TRIGGER_URL, vec![], vec![])]).unwrap();
        let report = finalize(entities, 10.0);
        assert_eq!(report.total_coverage(), 0.0);
    }

    #[test]
    fn test_every_entity_disjoint() {
        let report = sample();
        for summary in report.entities().values() {
            assert!(summary.covered_lines().is_disjoint(summary.uncovered_lines()));
        }
    }

    #[test]
    fn test_flat_layout() {
        let report = sample();
        let json = serde_json::to_value(&report).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 5);
        assert_eq!(json["TotalCoverage"], 50.0);
        assert_eq!(json["OrgCoverage"], 72.0);
        assert_eq!(json["BarTrigger"]["type"], "ApexTrigger");
        assert_eq!(json["BarTrigger"]["coverage"]["coveragePercentage"], 0.0);
        assert_eq!(json["BarTrigger"]["coverage"]["uncoveredPercentage"], 100.0);
        assert_eq!(
            json["FooTest"]["coverage"]["coveredLines"]["lines"],
            serde_json::json!([1, 2, 3, 4])
        );
        assert_eq!(
            json["FooTest"]["coverage"]["uncoveredLines"]["lines"],
            serde_json::json!([5, 6])
        );
    }

    #[test]
    fn test_enveloped_layout() {
        let report = sample();
        let json = serde_json::to_value(report.with_layout(ReportLayout::Enveloped)).unwrap();

        assert_eq!(json["totals"]["TotalCoverage"], 50.0);
        assert_eq!(json["totals"]["OrgCoverage"], 72.0);
        assert_eq!(json["entities"].as_object().unwrap().len(), 3);
        assert_eq!(json["entities"]["Baz"]["coverage"]["uncoveredLines"]["length"], 3);
    }

    #[test]
    fn test_reserved_name_rejected_in_flat_layout() {
        let entities = aggregate(&[record("TotalCoverage", CLASS_URL, vec![1], vec![])]).unwrap();
        let report = finalize(entities, 0.0);

        let err = report.to_json_pretty(ReportLayout::Flat).unwrap_err();
        assert!(err.to_string().contains("TotalCoverage"));

        let json = report.to_json_pretty(ReportLayout::Enveloped).unwrap();
        assert!(json.contains("\"entities\""));
    }

    #[test]
    fn test_layout_from_name() {
        assert_eq!(ReportLayout::from_name("flat"), Some(ReportLayout::Flat));
        assert_eq!(ReportLayout::from_name(" Enveloped "), Some(ReportLayout::Enveloped));
        assert_eq!(ReportLayout::from_name("nested"), None);
        assert_eq!(ReportLayout::default(), ReportLayout::Flat);
    }
}
