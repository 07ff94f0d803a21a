//! # apex-coverage
//!
//! Run the Apex tests of a Salesforce org and report the code coverage they
//! produce, one summary per class or trigger plus an org-wide total.
//!
//! ## Crates
//!
//! - **apex-coverage-core** - Aggregation engine: record normalization, line reconciliation, report finalization
//! - **apex-coverage-tooling** - Tooling API: credentials, test execution, coverage records
//!
//! This crate ties the two together: [`CoveragePipeline`] drives a run,
//! [`RunSettings`] configures it and a [`ReportSink`] persists the result.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apex_coverage::{CoveragePipeline, JsonFileSink, ReportSink, RunSettings};
//! use apex_coverage::tooling::{SalesforceCredentials, ToolingClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let creds = SalesforceCredentials::from_sfdx_alias("my-org").await?;
//!     let settings = RunSettings::builder().with_output_path("out/coverage.json").build();
//!
//!     let pipeline = CoveragePipeline::new(ToolingClient::new(&creds)?);
//!     let outcome = pipeline.run(&settings).await?;
//!
//!     JsonFileSink::new(&settings.output_path).write(&outcome.report)?;
//!     println!("Total coverage: {:.2}%", outcome.report.total_coverage());
//!     Ok(())
//! }
//! ```

mod error;
mod pipeline;
mod settings;
mod sink;

// Re-export member crates for convenient access
pub use apex_coverage_core as engine;
pub use apex_coverage_tooling as tooling;

pub use apex_coverage_core::{AggregateReport, CoverageSummary, ReportLayout};
pub use apex_coverage_tooling::{SalesforceCredentials, ToolingClient};

pub use error::{Error, Result};
pub use pipeline::{CoveragePipeline, PipelineOutcome};
pub use settings::{ExecutionMode, RunSettings, RunSettingsBuilder};
pub use sink::{JsonFileSink, ReportSink};
