use apex_coverage_core::RawCoverageRecord;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::security::soql;
use crate::types::{ApexCodeCoverage, ApexOrgWideCoverage};

const COVERAGE_FIELDS: &str =
    "ApexTestClassId, TestMethodName, ApexClassOrTriggerId, ApexClassOrTrigger.Name, Coverage";

/// Test class ids per `IN (...)` clause. Keeps the GET URI well under the
/// platform's length limit.
pub(crate) const COVERAGE_ID_BATCH: usize = 200;

impl super::ToolingClient {
    /// Get per-test-method coverage rows.
    ///
    /// An empty `test_class_ids` slice fetches every row in the org. Large id
    /// lists are split across several queries. Rows come back in query order;
    /// callers must not assume any grouping.
    #[instrument(skip(self, test_class_ids), fields(classes = test_class_ids.len()))]
    pub async fn get_code_coverage<S: AsRef<str>>(
        &self,
        test_class_ids: &[S],
    ) -> Result<Vec<RawCoverageRecord>> {
        if test_class_ids.is_empty() {
            let query = format!("SELECT {} FROM ApexCodeCoverage", COVERAGE_FIELDS);
            let rows: Vec<ApexCodeCoverage> = self.query_all(&query).await?;
            debug!(rows = rows.len(), "Fetched coverage rows");
            return Ok(rows.into_iter().map(RawCoverageRecord::from).collect());
        }

        // Validate every id before the first request goes out
        let clauses = test_class_ids
            .chunks(COVERAGE_ID_BATCH)
            .map(soql::id_list)
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::new();
        for (batch, ids) in clauses.iter().enumerate() {
            let query = format!(
                "SELECT {} FROM ApexCodeCoverage WHERE ApexTestClassId IN ({})",
                COVERAGE_FIELDS, ids
            );
            let rows: Vec<ApexCodeCoverage> = self.query_all(&query).await?;
            debug!(batch, rows = rows.len(), "Fetched coverage rows");
            records.extend(rows.into_iter().map(RawCoverageRecord::from));
        }

        Ok(records)
    }

    /// Get the org-wide coverage percentage.
    ///
    /// Returns 0.0 if the org has no coverage data yet.
    #[instrument(skip(self))]
    pub async fn get_org_wide_coverage(&self) -> Result<f64> {
        let rows: Vec<ApexOrgWideCoverage> = self
            .query_all("SELECT PercentCovered FROM ApexOrgWideCoverage")
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.percent_covered)
            .unwrap_or(0.0))
    }
}
