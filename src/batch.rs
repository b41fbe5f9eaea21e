//! One end-to-end run over an MC range, producing a finished CSV artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use log::{info, warn};

use crate::contact_scraper::EmailSource;
use crate::error::{BatchError, SinkError};
use crate::fetcher::RecordSource;
use crate::output::{CsvSink, OutputLayout};
use crate::pipeline::{EnrichmentPipeline, McRange, RunSummary};

/// Attempts at `<stem>_<n>.csv` before giving up on a taken file name.
const MAX_NAME_SUFFIX: u32 = 99;

pub fn output_file_name() -> String {
    format!("output_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

/// `output_20240101_120000.csv` with suffix 2 becomes `output_20240101_120000_2.csv`.
fn suffixed(path: &Path, suffix: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{}_{}.{}", stem, suffix, ext.to_string_lossy())),
        None => path.with_file_name(format!("{}_{}", stem, suffix)),
    }
}

/// A completed CSV with at least one data row. Whoever holds it decides
/// when the file goes away.
#[derive(Debug)]
pub struct CsvArtifact {
    path: PathBuf,
    rows: u64,
    layout: OutputLayout,
}

impl CsvArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.csv".to_string())
    }

    /// Removes the file from disk, ending the artifact.
    pub fn discard(self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("Removed {:?}", self.path),
            Err(e) => warn!("Could not remove {:?}: {}", self.path, e),
        }
    }
}

#[derive(Debug)]
pub enum BatchOutcome {
    Rows(CsvArtifact),
    /// The run finished but nothing qualified. No file is left behind.
    NoData,
}

pub struct BatchRun {
    range: McRange,
    layout: OutputLayout,
    path: PathBuf,
}

impl BatchRun {
    /// A run writing to a fresh timestamped file under `output_dir`.
    pub fn new(range: McRange, layout: OutputLayout, output_dir: &Path) -> Self {
        Self::with_path(range, layout, output_dir.join(output_file_name()))
    }

    pub fn with_path(range: McRange, layout: OutputLayout, path: PathBuf) -> Self {
        BatchRun { range, layout, path }
    }

    /// Preferred output path. The run moves to a suffixed name if another
    /// run already holds this one.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_sink(&self) -> Result<CsvSink, SinkError> {
        match CsvSink::create(&self.path, self.layout) {
            Err(e) if e.already_exists() => {}
            other => return other,
        }
        for suffix in 1..MAX_NAME_SUFFIX {
            let candidate = suffixed(&self.path, suffix);
            match CsvSink::create(&candidate, self.layout) {
                Err(e) if e.already_exists() => continue,
                other => return other,
            }
        }
        CsvSink::create(&suffixed(&self.path, MAX_NAME_SUFFIX), self.layout)
    }

    pub fn execute(
        self,
        records: &dyn RecordSource,
        emails: &dyn EmailSource,
        delay: Duration,
    ) -> Result<BatchOutcome, BatchError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| SinkError::Io {
                operation: "create output directory",
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut sink = self.open_sink()?;
        let path = sink.path().to_path_buf();
        let mut pipeline = EnrichmentPipeline::new(records, emails, delay);
        let summary: RunSummary = pipeline.run(self.range, &mut sink)?;
        drop(sink);

        if summary.rows_written == 0 {
            info!("No qualifying carriers in MC {}..={}", self.range.start(), self.range.end());
            if let Err(e) = fs::remove_file(&path) {
                warn!("Could not remove empty output {:?}: {}", path, e);
            }
            return Ok(BatchOutcome::NoData);
        }

        info!("Wrote {} rows to {:?}", summary.rows_written, path);
        Ok(BatchOutcome::Rows(CsvArtifact {
            path,
            rows: summary.rows_written,
            layout: self.layout,
        }))
    }
}
