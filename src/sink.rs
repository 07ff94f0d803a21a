//! Report persistence.

use std::path::{Path, PathBuf};

use apex_coverage_core::{AggregateReport, ReportLayout};
use tracing::info;

use crate::error::{Error, Result};

/// Destination for a finished report.
pub trait ReportSink {
    fn write(&self, report: &AggregateReport) -> Result<()>;
}

/// Writes the report as pretty-printed JSON to a file.
///
/// Missing parent directories are created. An existing file is replaced.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    layout: ReportLayout,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: ReportLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: ReportLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonFileSink {
    fn write(&self, report: &AggregateReport) -> Result<()> {
        // Serialize first so a name collision never leaves a truncated file behind
        let json = report.to_json_pretty(self.layout)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))?;

        info!(path = %self.path.display(), layout = ?self.layout, "Wrote coverage report");
        Ok(())
    }
}
