//! CSV attachment writer
//!
//! Writes the report table as a header row plus one row per table row. The
//! file is overwritten on every run and sent as the mail attachment.

use crate::domain::report::ReportTable;
use crate::infra::error::RenderError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writer for the tabular artifact
pub struct CsvReport {
    path: PathBuf,
}

impl CsvReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the table, creating parent directories as needed.
    /// Returns the number of data rows written.
    pub fn write(&self, table: &ReportTable) -> Result<usize, RenderError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|source| RenderError::Io { path: parent.to_path_buf(), source })?;
            }
        }

        let csv_err = |source| RenderError::Csv { path: self.path.clone(), source };

        let mut writer = csv::Writer::from_path(&self.path).map_err(csv_err)?;
        writer.write_record(&table.headers).map_err(csv_err)?;

        for row in &table.rows {
            let record = std::iter::once(row.device_name.as_str())
                .chain(row.cells.iter().map(|c| c.as_str()));
            writer.write_record(record).map_err(csv_err)?;
        }

        writer
            .flush()
            .map_err(|source| RenderError::Io { path: self.path.clone(), source })?;

        info!(
            file = %self.path.display(),
            rows = %table.rows.len(),
            "csv_report_written"
        );
        Ok(table.rows.len())
    }
}
