//! End-to-end coverage run.

use apex_coverage_core::{aggregate, finalize, AggregateReport};
use apex_coverage_tooling::{
    PollOptions, RunTestsAsyncRequest, RunTestsSyncRequest, ToolingClient,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::settings::{ExecutionMode, RunSettings};

/// Result of a coverage run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: AggregateReport,
    /// AsyncApexJob ID; `None` for synchronous runs.
    pub job_id: Option<String>,
    pub tests_run: usize,
    pub tests_failed: usize,
}

impl PipelineOutcome {
    /// Returns true if any test method failed.
    ///
    /// Coverage is still reported for runs with failures.
    pub fn has_failures(&self) -> bool {
        self.tests_failed > 0
    }
}

struct TestRun {
    job_id: Option<String>,
    tests_run: usize,
    tests_failed: usize,
}

/// Discovers tests, runs them, and aggregates the coverage they produce.
#[derive(Debug, Clone)]
pub struct CoveragePipeline {
    client: ToolingClient,
}

impl CoveragePipeline {
    pub fn new(client: ToolingClient) -> Self {
        Self { client }
    }

    /// Get the underlying Tooling client.
    pub fn client(&self) -> &ToolingClient {
        &self.client
    }

    /// Run the whole pipeline once.
    ///
    /// 1. discover test classes
    /// 2. execute them in the configured mode
    /// 3. fetch coverage for those classes and the org baseline
    /// 4. aggregate and finalize
    #[instrument(skip(self, settings), fields(mode = ?settings.mode))]
    pub async fn run(&self, settings: &RunSettings) -> Result<PipelineOutcome> {
        let classes = self
            .client
            .discover_test_classes(&settings.test_filter)
            .await?;
        if classes.is_empty() {
            return Err(Error::NoTestClasses {
                pattern: settings.test_filter.name_pattern.clone(),
            });
        }
        let class_ids: Vec<&str> = classes.iter().map(|c| c.id.as_str()).collect();

        let run = match settings.mode {
            ExecutionMode::Async => self.run_async(&class_ids, &settings.poll).await?,
            ExecutionMode::Sync => self.run_sync(&class_ids).await?,
        };
        if run.tests_failed > 0 {
            warn!(
                failed = run.tests_failed,
                run = run.tests_run,
                "Some tests failed; reporting coverage anyway"
            );
        }

        let records = self.client.get_code_coverage(&class_ids).await?;
        let org_baseline = self.client.get_org_wide_coverage().await?;

        let entities = aggregate(&records)?;
        let report = finalize(entities, org_baseline);
        info!(
            entities = report.entities().len(),
            total = report.total_coverage(),
            "Coverage run finished"
        );

        Ok(PipelineOutcome {
            report,
            job_id: run.job_id,
            tests_run: run.tests_run,
            tests_failed: run.tests_failed,
        })
    }

    async fn run_async(&self, class_ids: &[&str], poll: &PollOptions) -> Result<TestRun> {
        let job_id = self
            .client
            .run_tests_async(&RunTestsAsyncRequest::for_classes(class_ids))
            .await?;
        self.client.wait_for_job(&job_id, poll).await?;

        let results = self.client.get_test_results(&job_id).await?;
        let mut failed = 0;
        for result in results.iter().filter(|r| r.is_failure()) {
            failed += 1;
            warn!(
                test = %result.label(),
                message = result.message.as_deref().unwrap_or(""),
                "Test failed"
            );
            if let Some(trace) = result.stack_trace.as_deref() {
                debug!(test = %result.label(), trace, "Stack trace");
            }
        }

        Ok(TestRun {
            job_id: Some(job_id),
            tests_run: results.len(),
            tests_failed: failed,
        })
    }

    async fn run_sync(&self, class_ids: &[&str]) -> Result<TestRun> {
        let result = self
            .client
            .run_tests_sync(&RunTestsSyncRequest::for_classes(class_ids))
            .await?;

        for failure in &result.failures {
            warn!(
                test = %failure.label(),
                message = failure.message.as_deref().unwrap_or(""),
                "Test failed"
            );
            if let Some(trace) = failure.stack_trace.as_deref() {
                debug!(test = %failure.label(), trace, "Stack trace");
            }
        }

        Ok(TestRun {
            job_id: None,
            tests_run: result.num_tests_run as usize,
            tests_failed: result.num_failures as usize,
        })
    }
}
