//! The serial enrichment loop: fetch, filter, scrape, write, wait.

use std::ops::RangeInclusive;
use std::time::Duration;

use log::{debug, info, warn};

use crate::contact_scraper::EmailSource;
use crate::delay_manager;
use crate::error::{BatchError, SinkError};
use crate::fetcher::RecordSource;
use crate::filter;
use crate::output::{OutputRow, RowSink};
use crate::record::Lookup;

/// Inclusive range of MC numbers to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McRange {
    start: u64,
    end: u64,
}

impl McRange {
    pub fn new(start: u64, end: u64) -> Result<Self, BatchError> {
        if start > end {
            return Err(BatchError::InvalidRange { start, end });
        }
        Ok(McRange { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of identifiers covered; never zero.
    pub fn count(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn iter(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
}

/// Per-run counters, logged when the run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub fetch_failures: u64,
    pub absent: u64,
    pub qualified: u64,
    pub emails_found: u64,
    pub rows_written: u64,
}

pub struct EnrichmentPipeline<'a> {
    records: &'a dyn RecordSource,
    emails: &'a dyn EmailSource,
    delay: Duration,
    state: PipelineState,
}

impl<'a> EnrichmentPipeline<'a> {
    pub fn new(records: &'a dyn RecordSource, emails: &'a dyn EmailSource, delay: Duration) -> Self {
        EnrichmentPipeline {
            records,
            emails,
            delay,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Walks `range` in ascending order, appending one row per qualifying
    /// record to `sink`.
    ///
    /// Lookup and scrape problems never stop the walk. Only a sink failure
    /// does, since nothing after it could be recorded anyway.
    pub fn run(&mut self, range: McRange, sink: &mut dyn RowSink) -> Result<RunSummary, SinkError> {
        self.state = PipelineState::Running;
        info!(
            "Processing MC {}..={} ({} identifiers)",
            range.start(),
            range.end(),
            range.count()
        );

        let mut summary = RunSummary::default();
        for mc_number in range.iter() {
            summary.processed += 1;
            debug!("Processing {} / {} : MC={}", summary.processed, range.count(), mc_number);

            if let Some(row) = self.process(mc_number, sink.layout().includes_email(), &mut summary) {
                sink.append(&row)?;
                summary.rows_written += 1;
                info!("MC={} - Row written ({} so far)", mc_number, summary.rows_written);
            }

            // Throttle after every identifier, hit or miss; the last one has
            // no follow-up request to protect.
            if mc_number < range.end() {
                delay_manager::item_delay(self.delay);
            }
        }

        self.state = PipelineState::Completed;
        info!(
            "Run complete: {} processed, {} qualified, {} rows, {} emails, {} absent, {} fetch failures",
            summary.processed,
            summary.qualified,
            summary.rows_written,
            summary.emails_found,
            summary.absent,
            summary.fetch_failures
        );
        Ok(summary)
    }

    fn process(&self, mc_number: u64, with_email: bool, summary: &mut RunSummary) -> Option<OutputRow> {
        let record = match self.records.fetch(mc_number) {
            Lookup::Found(record) => record,
            Lookup::Absent => {
                summary.absent += 1;
                return None;
            }
            Lookup::Failed(reason) => {
                summary.fetch_failures += 1;
                warn!("MC={} - Skipped after lookup failure: {}", mc_number, reason);
                return None;
            }
        };

        if !filter::qualifies(&record) {
            debug!(
                "MC={} - Not qualifying (power_units={}, status={:?})",
                mc_number, record.power_units, record.operating_status
            );
            return None;
        }
        summary.qualified += 1;
        info!("MC={} - Qualifies: {}", mc_number, record.legal_name);

        let email = if with_email {
            match self.emails.scrape_email(&record.usdot) {
                Lookup::Found(email) => {
                    summary.emails_found += 1;
                    email
                }
                Lookup::Absent => String::new(),
                Lookup::Failed(reason) => {
                    warn!("MC={} - Writing row without email: {}", mc_number, reason);
                    String::new()
                }
            }
        } else {
            String::new()
        };

        Some(OutputRow::from(&record.with_email(email)))
    }
}
