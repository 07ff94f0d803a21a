use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::client::{PollOptions, TestClassFilter};
use crate::error::{Error, ErrorKind, Result};
use crate::security::{is_valid_salesforce_id, soql};
use crate::types::{
    ApexClass, ApexTestResult, AsyncApexJob, RunTestsAsyncRequest, RunTestsSyncRequest,
    RunTestsSyncResult,
};

impl super::ToolingClient {
    /// Find test classes by name.
    #[instrument(skip(self))]
    pub async fn discover_test_classes(&self, filter: &TestClassFilter) -> Result<Vec<ApexClass>> {
        let namespace = match filter.namespace.as_deref() {
            Some(ns) => format!("'{}'", soql::escape_string(ns)),
            None => "null".to_string(),
        };
        let query = format!(
            "SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE Name LIKE '{}' AND NamespacePrefix = {} ORDER BY Name",
            soql::escape_like(&filter.name_pattern),
            namespace
        );

        let classes: Vec<ApexClass> = self.query_all(&query).await?;
        info!(count = classes.len(), pattern = %filter.name_pattern, "Discovered test classes");
        Ok(classes)
    }

    /// Enqueue tests asynchronously.
    ///
    /// Returns the AsyncApexJob ID as a plain string.
    #[instrument(skip(self, request))]
    pub async fn run_tests_async(&self, request: &RunTestsAsyncRequest) -> Result<String> {
        let url = self.client.tooling_url("runTestsAsynchronous/");

        // Salesforce returns the job ID as a plain quoted JSON string, not an object
        let job_id: String = self.client.post_json(&url, request).await?;
        info!(%job_id, "Enqueued test run");
        Ok(job_id)
    }

    /// Run tests synchronously.
    ///
    /// Blocks until every test has finished.
    #[instrument(skip(self, request))]
    pub async fn run_tests_sync(&self, request: &RunTestsSyncRequest) -> Result<RunTestsSyncResult> {
        let url = self.client.tooling_url("runTestsSynchronous/");
        let result: RunTestsSyncResult = self.client.post_json(&url, request).await?;
        info!(
            tests = result.num_tests_run,
            failures = result.num_failures,
            "Synchronous test run finished"
        );
        Ok(result)
    }

    /// Get the current state of an async test job.
    #[instrument(skip(self))]
    pub async fn get_async_job(&self, job_id: &str) -> Result<AsyncApexJob> {
        validate_id(job_id)?;
        let query = format!(
            "SELECT Id, Status, JobItemsProcessed, TotalJobItems, ExtendedStatus FROM AsyncApexJob WHERE Id = '{}'",
            job_id
        );

        let mut jobs: Vec<AsyncApexJob> = self.client.data_query_all(&query).await?;
        jobs.pop().ok_or_else(|| {
            Error::new(ErrorKind::NotFound(format!("AsyncApexJob {}", job_id)))
        })
    }

    /// Poll a test job until it stops running.
    ///
    /// Fails with `JobFailed` if the job ends as `Failed` or `Aborted`, and
    /// with `PollTimeout` if it is still running after `options.timeout`.
    /// Individual test failures do not fail the job.
    #[instrument(skip(self, options))]
    pub async fn wait_for_job(&self, job_id: &str, options: &PollOptions) -> Result<AsyncApexJob> {
        let started = Instant::now();

        loop {
            let job = self.get_async_job(job_id).await?;
            debug!(
                status = %job.status,
                processed = job.job_items_processed,
                total = job.total_job_items,
                "Polled test job"
            );

            if job.is_finished() {
                if job.is_completed() {
                    return Ok(job);
                }
                return Err(Error::new(ErrorKind::JobFailed {
                    job_id: job.id,
                    status: job.status,
                    message: job.extended_status,
                }));
            }

            let waited = started.elapsed();
            if waited >= options.timeout {
                return Err(Error::new(ErrorKind::PollTimeout {
                    job_id: job_id.to_string(),
                    waited,
                }));
            }

            tokio::time::sleep(options.interval.min(options.timeout - waited)).await;
        }
    }

    /// Get per-method outcomes of an async test job.
    #[instrument(skip(self))]
    pub async fn get_test_results(&self, job_id: &str) -> Result<Vec<ApexTestResult>> {
        validate_id(job_id)?;
        let query = format!(
            "SELECT Id, Outcome, MethodName, Message, StackTrace, ApexClass.Name FROM ApexTestResult WHERE AsyncApexJobId = '{}'",
            job_id
        );
        self.query_all(&query).await
    }
}

fn validate_id(id: &str) -> Result<()> {
    if is_valid_salesforce_id(id) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::InvalidId(id.to_string())))
    }
}
