//! Run the org's Apex tests and write an aggregated coverage report.
//!
//! ```sh
//! export SF_ORG_ALIAS=my-scratch-org     # or SF_INSTANCE_URL + SF_ACCESS_TOKEN
//! export COVERAGE_OUTPUT=out/coverage.json
//! cargo run --bin apex-coverage
//! ```
//!
//! Exits with status 1 if the run fails. Failing tests alone do not fail
//! the run.

use std::process::ExitCode;

use apex_coverage::{
    CoveragePipeline, JsonFileSink, ReportSink, Result, RunSettings, SalesforceCredentials,
    ToolingClient,
};
use apex_coverage::tooling::Credentials;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Coverage run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = RunSettings::from_env()?;

    let creds = match std::env::var("SF_ORG_ALIAS") {
        Ok(alias) if !alias.trim().is_empty() => {
            SalesforceCredentials::from_sfdx_alias(alias.trim()).await?
        }
        _ => SalesforceCredentials::from_env()?,
    };
    println!("Connected to {}", creds.instance_url());

    let pipeline = CoveragePipeline::new(ToolingClient::new(&creds)?);
    let outcome = pipeline.run(&settings).await?;

    let sink = JsonFileSink::new(&settings.output_path).with_layout(settings.layout);
    sink.write(&outcome.report)?;

    println!(
        "{} classes/triggers, {:.2}% covered (org {:.2}%), {} tests run, {} failed -> {}",
        outcome.report.entities().len(),
        outcome.report.total_coverage(),
        outcome.report.org_coverage(),
        outcome.tests_run,
        outcome.tests_failed,
        sink.path().display()
    );
    Ok(())
}
