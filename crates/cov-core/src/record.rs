//! Raw coverage records and their normalization.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::reconcile::LineSet;

/// One coverage observation as returned by the Tooling API.
///
/// Each record ties one test method to the lines it covered and missed in
/// one class or trigger. The same entity appears once per test method that
/// exercised it. Every field is optional so that a record with missing data
/// can be represented and rejected by [`normalize`] instead of failing
/// deserialization somewhere upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCoverageRecord {
    /// Id of the covered class or trigger (`ApexClassOrTriggerId`).
    pub id: Option<String>,
    /// Name of the covered class or trigger.
    pub name: Option<String>,
    /// Resource URL of the covered class or trigger.
    pub url: Option<String>,
    /// Covered line numbers, as reported.
    pub covered_lines: Option<Vec<i32>>,
    /// Uncovered line numbers, as reported.
    pub uncovered_lines: Option<Vec<i32>>,
    /// Id of the test class that produced this observation.
    pub test_class_id: Option<String>,
    /// Name of the test method that produced this observation.
    pub test_method_name: Option<String>,
}

impl RawCoverageRecord {
    /// Create a record for an entity with no line data yet.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the covered and uncovered lines.
    pub fn with_lines(mut self, covered: Vec<i32>, uncovered: Vec<i32>) -> Self {
        self.covered_lines = Some(covered);
        self.uncovered_lines = Some(uncovered);
        self
    }

    /// Record which test method produced this observation.
    pub fn with_test_method(
        mut self,
        test_class_id: impl Into<String>,
        test_method_name: impl Into<String>,
    ) -> Self {
        self.test_class_id = Some(test_class_id.into());
        self.test_method_name = Some(test_method_name.into());
        self
    }

    /// Best available label for error messages.
    fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

/// Kind of entity a coverage record refers to.
///
/// Variants are ordered by precedence: when one name is reported with
/// several kinds, the smallest one names the merged entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "ApexClass")]
    Class,
    #[serde(rename = "ApexTrigger")]
    Trigger,
    Unknown,
}

/// URL markers checked in order; the first one found decides the kind.
const KIND_MARKERS: &[(&str, EntityKind)] = &[
    ("ApexClass", EntityKind::Class),
    ("ApexTrigger", EntityKind::Trigger),
];

impl EntityKind {
    /// Classify an entity from its resource URL.
    ///
    /// The Tooling API returns the polymorphic `ApexClassOrTrigger`
    /// relationship with a generic type, so the URL
    /// (`.../tooling/sobjects/ApexClass/01p...`) is the only reliable marker.
    /// Matching is a case-sensitive substring search.
    pub fn from_url(url: &str) -> Self {
        KIND_MARKERS
            .iter()
            .find(|(marker, _)| url.contains(marker))
            .map(|(_, kind)| *kind)
            .unwrap_or(EntityKind::Unknown)
    }

    /// The serialized name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Class => "ApexClass",
            EntityKind::Trigger => "ApexTrigger",
            EntityKind::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coverage record reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub name: String,
    pub id: String,
    pub kind: EntityKind,
    pub covered: LineSet,
    pub uncovered: LineSet,
}

/// Normalize a raw record.
///
/// Fails with [`ErrorKind::MalformedRecord`](crate::ErrorKind::MalformedRecord)
/// if the name, id, or either line list is absent. A missing URL is not an
/// error; the entity is classified as [`EntityKind::Unknown`].
pub fn normalize(record: &RawCoverageRecord) -> Result<NormalizedRecord> {
    let name = record
        .name
        .clone()
        .ok_or_else(|| Error::malformed("ApexClassOrTrigger.Name", record.label()))?;
    let id = record
        .id
        .clone()
        .ok_or_else(|| Error::malformed("ApexClassOrTriggerId", record.label()))?;
    let covered: LineSet = record
        .covered_lines
        .as_ref()
        .ok_or_else(|| Error::malformed("Coverage.coveredLines", record.label()))?
        .iter()
        .copied()
        .collect();
    let uncovered: LineSet = record
        .uncovered_lines
        .as_ref()
        .ok_or_else(|| Error::malformed("Coverage.uncoveredLines", record.label()))?
        .iter()
        .copied()
        .collect();

    let kind = record
        .url
        .as_deref()
        .map(EntityKind::from_url)
        .unwrap_or(EntityKind::Unknown);

    trace!(
        entity = %name,
        %kind,
        covered = covered.len(),
        uncovered = uncovered.len(),
        "Normalized coverage record"
    );

    Ok(NormalizedRecord {
        name,
        id,
        kind,
        covered,
        uncovered,
    })
}
