//! Store-facing ingestion: existence check, batched insert, upload summary.
//!
//! The store is reached only through [`AccountStore`] — the pipeline knows
//! nothing about how accounts are persisted. Key uniqueness under
//! concurrent uploads is the store's responsibility; a conflicting insert
//! comes back as a per-row rejection and is counted as a skip, never an
//! abort.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::error::{PipelineError, RowError, StoreError};
use crate::types::{CanonicalRecord, UploadBatch};

/// Upper bound on row-level errors carried in an upload summary. The full
/// counts are always exact; only the line-item list is bounded.
pub const MAX_REPORTED_ERRORS: usize = 25;

/// The external account store, as the pipeline sees it.
pub trait AccountStore {
    /// Return the subset of `domains` already known to the store.
    fn existing_domains(&self, domains: &[&str]) -> Result<HashSet<String>, StoreError>;

    /// Insert records, returning how many landed and per-row rejections
    /// (uniqueness conflicts from concurrent uploads, constraint failures).
    fn insert(&self, records: &[CanonicalRecord]) -> Result<InsertReport, StoreError>;
}

/// Outcome of one batched insert.
#[derive(Debug, Clone, Default)]
pub struct InsertReport {
    pub inserted: usize,
    pub rejections: Vec<RowRejection>,
}

/// One record the store refused, with the reason surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRejection {
    pub domain: String,
    pub reason: String,
}

/// End-of-upload summary shown to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub total_rows: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub duplicate_count: usize,
    /// Records skipped because the store already knew the domain.
    pub already_known_count: usize,
    pub inserted_count: usize,
    /// Per-row store rejections (e.g. a concurrent upload won the race).
    pub rejections: Vec<RowRejection>,
    /// First [`MAX_REPORTED_ERRORS`] row-level errors.
    pub errors: Vec<RowError>,
    /// How many row-level errors were omitted from `errors`.
    pub omitted_error_count: usize,
    pub warnings: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Consume one batch: skip already-known domains, insert the rest, and
/// fold everything into a summary. Store-level failures are structural —
/// nothing is partially committed by this layer.
pub fn ingest(batch: UploadBatch, store: &dyn AccountStore) -> Result<UploadSummary, PipelineError> {
    let domains: Vec<&str> = batch.records.iter().map(|r| r.domain.as_str()).collect();
    let existing = store.existing_domains(&domains)?;

    let (known, fresh): (Vec<_>, Vec<_>) = batch
        .records
        .into_iter()
        .partition(|r| existing.contains(&r.domain));
    let already_known_count = known.len();

    let report = if fresh.is_empty() {
        InsertReport::default()
    } else {
        store.insert(&fresh)?
    };

    if !report.rejections.is_empty() {
        warn!(
            "store rejected {} of {} new records",
            report.rejections.len(),
            fresh.len()
        );
    }
    info!(
        "ingest complete: {} inserted, {} already known, {} rejected",
        report.inserted,
        already_known_count,
        report.rejections.len()
    );

    let omitted_error_count = batch.errors.len().saturating_sub(MAX_REPORTED_ERRORS);
    let mut errors = batch.errors;
    errors.truncate(MAX_REPORTED_ERRORS);

    Ok(UploadSummary {
        total_rows: batch.total_rows,
        valid_count: batch.valid_count,
        invalid_count: batch.invalid_count,
        duplicate_count: batch.duplicate_count,
        already_known_count,
        inserted_count: report.inserted,
        rejections: report.rejections,
        errors,
        omitted_error_count,
        warnings: batch.warnings,
        completed_at: Utc::now(),
    })
}
