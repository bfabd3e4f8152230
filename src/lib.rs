//! Ingestion and classification pipeline for target-account spreadsheets.
//!
//! Turns an arbitrary, messily-labeled upload into validated, deduplicated
//! canonical records, and classifies each account into priority tiers:
//!
//! 1. [`parser`] — file → ordered header-keyed rows with row-level error
//!    capture and a row ceiling
//! 2. [`mapper`] — headers → canonical business fields (exact + fuzzy)
//! 3. [`normalizer`] — rows → canonical records keyed by a validated
//!    domain, deduplicated within the batch
//! 4. [`classifier`] — account signals → tech cohort, sales play, tier
//!
//! The first three stages compose into one upload pass ([`run_upload`]);
//! classification runs independently per record, at upload time and again
//! whenever enrichment signals land. The two halves share only the
//! canonical record shapes in [`types`].

pub mod classifier;
pub mod error;
pub mod export;
pub mod ingest;
pub mod mapper;
pub mod normalizer;
pub mod parser;
pub mod types;

use std::path::Path;

use log::info;

pub use classifier::{classify, tier_for_score, Classifier, ClassifierConfig};
pub use error::{PipelineError, RowError, StoreError, UploadError};
pub use ingest::{ingest, AccountStore, InsertReport, RowRejection, UploadSummary};
pub use mapper::{Mapper, MapperConfig};
pub use normalizer::{normalize, normalize_domain, NormalizeOutput};
pub use parser::{parse, FormatHint, ParseOptions, ParseOutput};
pub use types::{
    AccountSignals, CanonicalField, CanonicalRecord, ClassificationResult, FieldMapping,
    JourneyStage, RawRow, SalesPlay, TechCohort, Tier, UploadBatch,
};

/// Fold a parse and a detected (or manually corrected) mapping into one
/// consumable batch. Errors from both stages merge in file order.
pub fn assemble_batch(output: ParseOutput, mapping: &FieldMapping) -> UploadBatch {
    let normalized = normalizer::normalize(&output.rows, mapping);

    let mut errors = output.errors;
    errors.extend(normalized.errors);
    errors.sort_by_key(|e| e.row);

    let mut warnings = output.warnings;
    warnings.extend(mapping.warnings.iter().cloned());

    UploadBatch {
        valid_count: normalized.records.len(),
        invalid_count: errors.len(),
        duplicate_count: normalized.duplicate_count,
        total_rows: output.total_rows,
        records: normalized.records,
        errors,
        warnings,
    }
}

/// One-call upload pass: parse → detect mapping → normalize.
///
/// Fails hard only on structural problems, including the one mapping
/// condition the caller cannot proceed past: no domain column detected.
/// Callers that want to prompt for a manual mapping instead should run the
/// stages separately and inspect [`FieldMapping::has_domain`].
pub fn run_upload(
    path: &Path,
    options: &ParseOptions,
    mapper: &Mapper,
) -> Result<UploadBatch, PipelineError> {
    let output = parser::parse(path, options)?;
    let mapping = mapper.detect_mapping(&output.headers);
    if !mapping.has_domain {
        return Err(PipelineError::NoDomainColumn);
    }

    let batch = assemble_batch(output, &mapping);
    info!(
        "upload batch ready: {} valid, {} invalid, {} duplicates of {} rows",
        batch.valid_count, batch.invalid_count, batch.duplicate_count, batch.total_rows
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_upload_scenario_duplicate_batch() {
        let (_dir, path) = write_csv(
            "Company,Website,Revenue\n\
             Acme Inc,www.acme.com,5000000\n\
             Acme Inc,acme.com,5000000\n",
        );

        let batch = run_upload(&path, &ParseOptions::default(), &Mapper::default()).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.duplicate_count, 1);
        assert_eq!(batch.total_rows, 2);

        let record = &batch.records[0];
        assert_eq!(record.domain, "acme.com");
        assert_eq!(record.company_name.as_deref(), Some("Acme Inc"));
        assert_eq!(record.revenue, Some(5_000_000.0));
    }

    #[test]
    fn test_upload_without_domain_column_fails_hard() {
        let (_dir, path) = write_csv("Company,Revenue\nAcme,5000000\n");

        let err = run_upload(&path, &ParseOptions::default(), &Mapper::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoDomainColumn));
    }

    #[test]
    fn test_upload_mixes_parse_and_domain_errors_in_file_order() {
        let (_dir, path) = write_csv(
            "Website\n\
             good-one.com\n\
             bad\n\
             good-two.com\n\
             nodot\n",
        );

        let batch = run_upload(&path, &ParseOptions::default(), &Mapper::default()).unwrap();
        assert_eq!(batch.valid_count, 2);
        assert_eq!(batch.invalid_count, 2);
        let rows: Vec<usize> = batch.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 4]);
    }

    #[test]
    fn test_upload_then_classify_provisional_tier() {
        // Upload-time classification sees only default signals: no tech
        // detected yet → cold provisional tier, greenfield play.
        let (_dir, path) = write_csv("Website\nacme.com\n");
        let batch = run_upload(&path, &ParseOptions::default(), &Mapper::default()).unwrap();

        for _record in &batch.records {
            let result = classify(&AccountSignals::default());
            assert_eq!(result.tier, Tier::Cold);
            assert_eq!(result.sales_play, SalesPlay::Greenfield);
            assert_eq!(result.tech_cohort, None);
        }
    }

    #[test]
    fn test_batch_export_round_trip() {
        let (_dir, path) = write_csv(
            "Website,Company,Notes\n\
             acme.com,Acme Inc,call back tuesday\n",
        );
        let batch = run_upload(&path, &ParseOptions::default(), &Mapper::default()).unwrap();

        // "Notes" is not a canonical field; it must survive to export
        let csv_text = export::to_csv(&batch.records).unwrap();
        assert!(csv_text.contains("Notes"));
        assert!(csv_text.contains("call back tuesday"));

        let round_tripped =
            export::records_from_json(&export::to_json(&batch.records)).unwrap();
        assert_eq!(batch.records, round_tripped);
    }
}
