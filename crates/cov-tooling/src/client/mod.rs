//! Tooling API client for test execution and coverage.
//!
//! `ToolingClient` wraps an [`OrgClient`] and provides typed methods for the
//! handful of Tooling API operations the coverage pipeline needs.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::http::OrgClient;

mod coverage;
mod test_execution;

/// Which Apex classes count as test classes.
///
/// SOQL cannot look inside a class body for `@isTest`, so discovery goes by
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestClassFilter {
    /// SOQL LIKE pattern matched against the class name.
    pub name_pattern: String,
    /// Namespace to search. `None` restricts discovery to unpackaged classes.
    pub namespace: Option<String>,
}

impl Default for TestClassFilter {
    fn default() -> Self {
        Self {
            name_pattern: "%Test%".to_string(),
            namespace: None,
        }
    }
}

/// How to wait for an asynchronous test job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between status checks.
    pub interval: Duration,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Salesforce Tooling API client.
///
/// # Example
///
/// ```rust,ignore
/// use apex_coverage_tooling::{SalesforceCredentials, ToolingClient};
///
/// let creds = SalesforceCredentials::from_env()?;
/// let client = ToolingClient::new(&creds)?;
///
/// let baseline = client.get_org_wide_coverage().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ToolingClient {
    client: OrgClient,
}

impl ToolingClient {
    /// Create a new Tooling API client for the given session.
    pub fn new(credentials: &dyn Credentials) -> Result<Self> {
        Ok(Self {
            client: OrgClient::new(credentials)?,
        })
    }

    /// Create a new Tooling API client with custom HTTP configuration.
    pub fn with_config(credentials: &dyn Credentials, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: OrgClient::with_config(credentials, config)?,
        })
    }

    /// Create a Tooling client from an existing OrgClient.
    pub fn from_client(client: OrgClient) -> Self {
        Self { client }
    }

    /// Get the underlying OrgClient.
    pub fn inner(&self) -> &OrgClient {
        &self.client
    }

    /// Get the instance URL.
    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    /// Execute a SOQL query and return all results (automatic pagination).
    ///
    /// Escape interpolated values with [`crate::security::soql`].
    #[instrument(skip(self))]
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        self.client.tooling_query_all(soql).await
    }
}
