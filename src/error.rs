//! Error types for the ingestion pipeline.
//!
//! Errors are classified by blast radius:
//! - Structural: the whole upload fails, nothing is committed
//! - Row-level: one row is excluded and reported, the batch continues
//! - Signal gaps: not errors at all — the classifier treats absent inputs
//!   as the zero case

use thiserror::Error;

/// Structural failures that abort an upload.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unreadable file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Empty source: {0}")]
    EmptySource(String),

    #[error("No domain column detected — map one manually before importing")]
    NoDomainColumn,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Export failed: {0}")]
    Export(String),
}

impl PipelineError {
    /// True when retrying the same file cannot help and the user must act
    /// (fix the file or supply a manual mapping) before re-uploading.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptySource(_) | PipelineError::NoDomainColumn
        )
    }
}

/// Errors surfaced by the external account store.
///
/// Per-row insert rejections are not errors — they arrive inside
/// [`InsertReport`](crate::ingest::InsertReport). This covers only failures
/// of the store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),
}

/// One excluded row with its original position and a human-readable reason.
///
/// Row numbers are 1-based data-row positions from the uploaded file (the
/// header row is row 0) and are never renumbered after rows are dropped.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_value(row: usize, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            value: Some(value.into()),
            message: message.into(),
        }
    }
}

/// Serializable error representation for the upload UI.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadError {
    pub message: String,
    pub requires_user_action: bool,
}

impl From<&PipelineError> for UploadError {
    fn from(err: &PipelineError) -> Self {
        UploadError {
            message: err.to_string(),
            requires_user_action: err.requires_user_action(),
        }
    }
}
