//! # apex-coverage-core
//!
//! Aggregation engine for Apex code coverage reported by the Tooling API.
//!
//! The Tooling API reports coverage as one `ApexCodeCoverage` row per
//! (test method, class or trigger) pair. The same class shows up once for
//! every test method that touched it, and a line one test method missed may
//! well be hit by another. This crate folds those rows into one summary per
//! class or trigger and an org-wide total.
//!
//! ## Pipeline
//!
//! ```text
//! RawCoverageRecord ──▶ normalize ──▶ merge_record (fold) ──▶ finalize ──▶ AggregateReport
//!                        (record)      (aggregate/reconcile)    (report)
//! ```
//!
//! A line is never both covered and uncovered in the result: covered lines
//! are the union over every observation, and uncovered lines are whatever
//! was reported uncovered and never covered by anything.
//!
//! ## Example
//!
//! ```rust
//! use apex_coverage_core::{aggregate, finalize, RawCoverageRecord};
//!
//! let records = vec![
//!     RawCoverageRecord::new("01p000000000001AAA", "FooTest", "/tooling/sobjects/ApexClass/01p000000000001AAA")
//!         .with_lines(vec![1, 2, 3], vec![4, 5]),
//!     RawCoverageRecord::new("01p000000000001AAA", "FooTest", "/tooling/sobjects/ApexClass/01p000000000001AAA")
//!         .with_lines(vec![4], vec![6]),
//! ];
//!
//! let entities = aggregate(&records)?;
//! let report = finalize(entities, 75.0);
//!
//! let foo = &report.entities()["FooTest"];
//! assert_eq!(foo.covered_count(), 4);
//! assert_eq!(foo.uncovered_count(), 2);
//! # Ok::<(), apex_coverage_core::Error>(())
//! ```

mod aggregate;
mod error;
mod reconcile;
mod record;
mod report;

pub use aggregate::{aggregate, merge_record, percentage, CoverageSummary, EntityMap};
pub use error::{Error, ErrorKind, Result};
pub use reconcile::{reconcile, LineSet};
pub use record::{normalize, EntityKind, NormalizedRecord, RawCoverageRecord};
pub use report::{
    finalize, AggregateReport, LayoutView, ReportLayout, ORG_COVERAGE_KEY, TOTAL_COVERAGE_KEY,
};
