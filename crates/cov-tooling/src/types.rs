//! Types for the Tooling API objects the coverage pipeline touches.

use serde::{Deserialize, Serialize};

use apex_coverage_core::RawCoverageRecord;

// ============================================================================
// Common
// ============================================================================

/// The `attributes` block Salesforce attaches to every record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordAttributes {
    pub url: Option<String>,
}

/// A relationship reference that only carries a name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NameRef {
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

// ============================================================================
// Test Discovery
// ============================================================================

/// ApexClass record returned by test discovery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApexClass {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "NamespacePrefix")]
    pub namespace_prefix: Option<String>,
}

// ============================================================================
// Test Execution
// ============================================================================

/// Body of `runTestsAsynchronous`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestsAsyncRequest {
    /// Comma-separated test class ids.
    #[serde(rename = "classids", skip_serializing_if = "Option::is_none")]
    pub class_ids: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_code_coverage: Option<bool>,
}

impl RunTestsAsyncRequest {
    /// Run every test in the given classes, collecting coverage.
    pub fn for_classes<S: AsRef<str>>(class_ids: &[S]) -> Self {
        let ids: Vec<&str> = class_ids.iter().map(AsRef::as_ref).collect();
        Self {
            class_ids: Some(ids.join(",")),
            test_level: Some("RunSpecifiedTests".to_string()),
            skip_code_coverage: Some(false),
            ..Default::default()
        }
    }
}

/// One entry of the `tests` array in `runTestsSynchronous`.
///
/// Without `testMethods` every test method of the class runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestItem {
    pub class_id: String,
}

/// Body of `runTestsSynchronous`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestsSyncRequest {
    pub tests: Vec<TestItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_code_coverage: Option<bool>,
}

impl RunTestsSyncRequest {
    /// Run every test in the given classes, collecting coverage.
    pub fn for_classes<S: AsRef<str>>(class_ids: &[S]) -> Self {
        Self {
            tests: class_ids
                .iter()
                .map(|id| TestItem {
                    class_id: id.as_ref().to_string(),
                })
                .collect(),
            skip_code_coverage: Some(false),
        }
    }
}

/// A single test outcome inside a synchronous run result.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTestOutcome {
    /// Test class name.
    pub name: Option<String>,
    pub method_name: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
}

impl SyncTestOutcome {
    /// `Class.method` label for log output.
    pub fn label(&self) -> String {
        test_label(self.name.as_deref(), self.method_name.as_deref())
    }
}

/// Response of `runTestsSynchronous`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestsSyncResult {
    #[serde(default)]
    pub num_tests_run: u32,

    #[serde(default)]
    pub num_failures: u32,

    #[serde(default)]
    pub failures: Vec<SyncTestOutcome>,
}

/// AsyncApexJob record tracking an asynchronous test run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AsyncApexJob {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "JobItemsProcessed")]
    pub job_items_processed: Option<i32>,

    #[serde(rename = "TotalJobItems")]
    pub total_job_items: Option<i32>,

    #[serde(rename = "ExtendedStatus")]
    pub extended_status: Option<String>,
}

impl AsyncApexJob {
    /// Returns true once the job will make no further progress.
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "Completed" | "Failed" | "Aborted")
    }

    /// Returns true if the job finished normally.
    pub fn is_completed(&self) -> bool {
        self.status == "Completed"
    }
}

/// ApexTestResult record: one test method's outcome in an async run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApexTestResult {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Outcome")]
    pub outcome: String,

    #[serde(rename = "MethodName")]
    pub method_name: Option<String>,

    #[serde(rename = "Message")]
    pub message: Option<String>,

    #[serde(rename = "StackTrace")]
    pub stack_trace: Option<String>,

    #[serde(rename = "ApexClass")]
    pub apex_class: Option<NameRef>,
}

impl ApexTestResult {
    /// Returns true for `Fail` and `CompileFail` outcomes.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome.as_str(), "Fail" | "CompileFail")
    }

    /// `Class.method` label for log output.
    pub fn label(&self) -> String {
        test_label(
            self.apex_class.as_ref().and_then(|c| c.name.as_deref()),
            self.method_name.as_deref(),
        )
    }
}

fn test_label(class: Option<&str>, method: Option<&str>) -> String {
    format!("{}.{}", class.unwrap_or("?"), method.unwrap_or("?"))
}

// ============================================================================
// Code Coverage Types
// ============================================================================

/// ApexCodeCoverage record: lines of one class or trigger touched by one test method.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApexCodeCoverage {
    #[serde(rename = "ApexTestClassId")]
    pub apex_test_class_id: Option<String>,

    #[serde(rename = "TestMethodName")]
    pub test_method_name: Option<String>,

    #[serde(rename = "ApexClassOrTriggerId")]
    pub apex_class_or_trigger_id: Option<String>,

    #[serde(rename = "ApexClassOrTrigger")]
    pub apex_class_or_trigger: Option<ApexClassOrTriggerRef>,

    #[serde(rename = "Coverage")]
    pub coverage: Option<CoverageDetail>,
}

/// Polymorphic reference to ApexClass or ApexTrigger.
///
/// The reference's `attributes.type` is the generic `Name`; only
/// `attributes.url` says which of the two it is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApexClassOrTriggerRef {
    pub attributes: Option<RecordAttributes>,

    #[serde(rename = "Name")]
    pub name: Option<String>,
}

/// Coverage detail with covered and uncovered lines.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoverageDetail {
    #[serde(rename = "coveredLines")]
    pub covered_lines: Option<Vec<i32>>,

    #[serde(rename = "uncoveredLines")]
    pub uncovered_lines: Option<Vec<i32>>,
}

impl From<ApexCodeCoverage> for RawCoverageRecord {
    fn from(row: ApexCodeCoverage) -> Self {
        let (name, url) = match row.apex_class_or_trigger {
            Some(target) => (target.name, target.attributes.and_then(|a| a.url)),
            None => (None, None),
        };
        let (covered_lines, uncovered_lines) = match row.coverage {
            Some(detail) => (detail.covered_lines, detail.uncovered_lines),
            None => (None, None),
        };

        RawCoverageRecord {
            id: row.apex_class_or_trigger_id,
            name,
            url,
            covered_lines,
            uncovered_lines,
            test_class_id: row.apex_test_class_id,
            test_method_name: row.test_method_name,
        }
    }
}

/// ApexOrgWideCoverage record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApexOrgWideCoverage {
    #[serde(rename = "PercentCovered")]
    pub percent_covered: Option<f64>,
}
