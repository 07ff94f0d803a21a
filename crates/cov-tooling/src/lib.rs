//! # apex-coverage-tooling
//!
//! Salesforce Tooling API access for the coverage pipeline.
//!
//! ## Features
//!
//! - **Credentials** - Load an instance URL and access token from the environment or the `sf` CLI
//! - **Test Discovery** - Find Apex test classes by name pattern
//! - **Test Execution** - Enqueue tests asynchronously and poll the job, or run them synchronously
//! - **Code Coverage** - Fetch per-test-method `ApexCodeCoverage` rows and the org-wide baseline
//!
//! ## Example
//!
//! ```rust,ignore
//! use apex_coverage_tooling::{PollOptions, RunTestsAsyncRequest, SalesforceCredentials, ToolingClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), apex_coverage_tooling::Error> {
//!     let creds = SalesforceCredentials::from_env()?;
//!     let client = ToolingClient::new(&creds)?;
//!
//!     let classes = client.discover_test_classes(&Default::default()).await?;
//!     let ids: Vec<String> = classes.iter().map(|c| c.id.clone()).collect();
//!
//!     let job_id = client
//!         .run_tests_async(&RunTestsAsyncRequest::for_classes(&ids))
//!         .await?;
//!     client.wait_for_job(&job_id, &PollOptions::default()).await?;
//!
//!     let records = client.get_code_coverage(&ids).await?;
//!     println!("{} coverage rows", records.len());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod credentials;
mod error;
mod http;
pub mod security;
mod types;

pub use client::{PollOptions, TestClassFilter, ToolingClient};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use credentials::{Credentials, SalesforceCredentials};
pub use error::{Error, ErrorKind, Result};
pub use http::{OrgClient, QueryResult};
pub use types::*;

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("apex-coverage/", env!("CARGO_PKG_VERSION"));
