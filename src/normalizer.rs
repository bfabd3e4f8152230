//! Record normalization and in-batch deduplication.
//!
//! Applies a [`FieldMapping`] to parsed rows, validates and canonicalizes
//! the domain key, coerces numeric fields, and drops in-batch duplicate
//! domains (first occurrence wins). Rejected rows are reported with their
//! original row number and raw value, never silently dropped.

use std::collections::HashSet;

use log::{debug, info};
use thiserror::Error;

use crate::error::RowError;
use crate::types::{CanonicalField, CanonicalRecord, FieldMapping, RawRow};

/// Why a domain value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Domain is empty")]
    Empty,
    #[error("Domain has no dot")]
    NoDot,
    #[error("Domain is shorter than 4 characters")]
    TooShort,
    #[error("Domain contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// Result of one normalize pass.
#[derive(Debug, Clone)]
pub struct NormalizeOutput {
    pub records: Vec<CanonicalRecord>,
    pub invalid_count: usize,
    pub duplicate_count: usize,
    pub errors: Vec<RowError>,
}

/// Canonicalize a raw domain value.
///
/// Lowercase, strip an `http://`/`https://` scheme, strip one leading
/// `www.` label, cut at the first `/`, `?` or `#`, then validate: must
/// contain a dot, be at least 4 characters, and use only `[a-z0-9.-]`.
pub fn normalize_domain(raw: &str) -> Result<String, DomainError> {
    let mut domain = raw.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
            break;
        }
    }
    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }
    if let Some(cut) = domain.find(['/', '?', '#']) {
        domain.truncate(cut);
    }

    if domain.is_empty() {
        return Err(DomainError::Empty);
    }
    if !domain.contains('.') {
        return Err(DomainError::NoDot);
    }
    if domain.chars().count() < 4 {
        return Err(DomainError::TooShort);
    }
    if let Some(bad) = domain
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(DomainError::InvalidCharacter(bad));
    }

    Ok(domain)
}

/// Lenient numeric coercion for revenue/traffic/score columns.
///
/// Accepts currency symbols, thousands separators, and `K`/`M`/`B`
/// magnitude suffixes: `"$5,000,000"` → `5000000.0`, `"1.2M"` → `1200000.0`.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (digits, multiplier) = match cleaned.chars().last() {
        Some('k') | Some('K') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        Some('b') | Some('B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    digits.parse::<f64>().ok().map(|n| n * multiplier)
}

/// Apply a field mapping to parsed rows, producing canonical records plus
/// validity/duplication tallies.
pub fn normalize(rows: &[RawRow], mapping: &FieldMapping) -> NormalizeOutput {
    let domain_header = mapping.header_for(CanonicalField::Domain);

    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut invalid_count = 0usize;

    for row in rows {
        let raw_domain = domain_header
            .and_then(|h| row.get(h))
            .map(|c| c.as_text())
            .unwrap_or_default();

        let domain = match normalize_domain(&raw_domain) {
            Ok(d) => d,
            Err(e) => {
                invalid_count += 1;
                errors.push(RowError::with_value(row.row, raw_domain, e.to_string()));
                continue;
            }
        };

        records.push(build_record(domain, row, mapping));
    }

    let (records, duplicate_count) = dedupe(records);

    info!(
        "normalized {} rows: {} valid, {} invalid, {} duplicates",
        rows.len(),
        records.len(),
        invalid_count,
        duplicate_count
    );

    NormalizeOutput {
        records,
        invalid_count,
        duplicate_count,
        errors,
    }
}

/// In-batch dedup by normalized domain: first occurrence wins, later ones
/// are dropped whole (no field-level merge). Idempotent — a second pass
/// over its own output removes nothing.
pub fn dedupe(records: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        if seen.insert(record.domain.clone()) {
            kept.push(record);
        } else {
            debug!("duplicate domain {}, dropping", record.domain);
            dropped += 1;
        }
    }
    (kept, dropped)
}

fn build_record(domain: String, row: &RawRow, mapping: &FieldMapping) -> CanonicalRecord {
    let text = |field: CanonicalField| -> Option<String> {
        mapping
            .header_for(field)
            .and_then(|h| row.get(h))
            .map(|c| c.as_text())
            .filter(|s| !s.is_empty())
    };
    let number = |field: CanonicalField| -> Option<f64> {
        text(field).and_then(|s| coerce_number(&s))
    };

    let mut record = CanonicalRecord::new(domain);
    record.company_name = text(CanonicalField::CompanyName);
    record.industry = text(CanonicalField::Industry);
    record.revenue = number(CanonicalField::Revenue);
    record.traffic = number(CanonicalField::Traffic);
    record.owner = text(CanonicalField::Owner);
    record.region = text(CanonicalField::Region);
    record.journey_stage = text(CanonicalField::JourneyStage);
    record.engagement_score = number(CanonicalField::EngagementScore);
    record.crm_id = text(CanonicalField::CrmId);
    record.ticker_symbol = text(CanonicalField::TickerSymbol);

    // Pass-through: unclaimed columns survive untouched (trimmed).
    for (header, cell) in &row.cells {
        if mapping.claims(header) {
            continue;
        }
        let value = cell.as_text();
        if !value.is_empty() {
            record.extra.push((header.clone(), value));
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Mapper;
    use crate::types::CellValue;

    fn raw_row(row: usize, cells: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            row,
            cells
                .iter()
                .map(|(h, v)| {
                    let cell = if v.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    };
                    (h.to_string(), cell)
                })
                .collect(),
        )
    }

    fn mapping_for(headers: &[&str]) -> FieldMapping {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        Mapper::default().detect_mapping(&headers)
    }

    #[test]
    fn test_normalize_domain_equivalence() {
        for input in [
            "HTTPS://WWW.Foo.com/page?x=1",
            "http://foo.com",
            "www.foo.com",
            "foo.com/",
            "Foo.Com#fragment",
            "foo.com",
        ] {
            assert_eq!(normalize_domain(input).unwrap(), "foo.com", "input {:?}", input);
        }
    }

    #[test]
    fn test_normalize_domain_rejections() {
        assert_eq!(normalize_domain(""), Err(DomainError::Empty));
        assert_eq!(normalize_domain("https://"), Err(DomainError::Empty));
        assert_eq!(normalize_domain("localhost"), Err(DomainError::NoDot));
        assert_eq!(normalize_domain("a.b"), Err(DomainError::TooShort));
        assert_eq!(
            normalize_domain("foo bar.com"),
            Err(DomainError::InvalidCharacter(' '))
        );
        assert_eq!(
            normalize_domain("foo_bar.com"),
            Err(DomainError::InvalidCharacter('_'))
        );
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number("5000000"), Some(5000000.0));
        assert_eq!(coerce_number("$5,000,000"), Some(5000000.0));
        assert_eq!(coerce_number("1.2M"), Some(1_200_000.0));
        assert_eq!(coerce_number("350k"), Some(350_000.0));
        assert_eq!(coerce_number("2B"), Some(2_000_000_000.0));
        assert_eq!(coerce_number("n/a"), None);
        assert_eq!(coerce_number(""), None);
    }

    #[test]
    fn test_invalid_rows_keep_original_numbers() {
        let mapping = mapping_for(&["Website"]);
        let rows = vec![
            raw_row(1, &[("Website", "ok-one.com")]),
            raw_row(2, &[("Website", "ab")]),
            raw_row(3, &[("Website", "ok-two.com")]),
            raw_row(4, &[("Website", "nodot")]),
        ];

        let out = normalize(&rows, &mapping);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.invalid_count, 2);
        let error_rows: Vec<usize> = out.errors.iter().map(|e| e.row).collect();
        assert_eq!(error_rows, vec![2, 4]);
        assert_eq!(out.errors[0].value.as_deref(), Some("ab"));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mapping = mapping_for(&["Website", "Revenue"]);
        let rows = vec![
            raw_row(1, &[("Website", "www.acme.com"), ("Revenue", "100")]),
            raw_row(2, &[("Website", "acme.com"), ("Revenue", "999")]),
        ];

        let out = normalize(&rows, &mapping);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.duplicate_count, 1);
        // First row's fields survive; the conflicting revenue is discarded
        assert_eq!(out.records[0].revenue, Some(100.0));
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let records = vec![
            CanonicalRecord::new("a.com"),
            CanonicalRecord::new("b.com"),
            CanonicalRecord::new("a.com"),
        ];
        let (once, dropped) = dedupe(records);
        assert_eq!(dropped, 1);
        let (twice, dropped_again) = dedupe(once.clone());
        assert_eq!(dropped_again, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_pass_through_columns_survive() {
        let mapping = mapping_for(&["Website", "Favorite Color"]);
        let rows = vec![raw_row(
            1,
            &[("Website", "acme.com"), ("Favorite Color", " teal ")],
        )];

        let out = normalize(&rows, &mapping);
        assert_eq!(
            out.records[0].extra,
            vec![("Favorite Color".to_string(), "teal".to_string())]
        );
    }

    #[test]
    fn test_mapped_fields_copied_with_coercion() {
        let mapping = mapping_for(&["Company", "Website", "Revenue", "Stage"]);
        let rows = vec![raw_row(
            1,
            &[
                ("Company", "Acme Inc"),
                ("Website", "ACME.com"),
                ("Revenue", "$1.5M"),
                ("Stage", "Qualified"),
            ],
        )];

        let out = normalize(&rows, &mapping);
        let record = &out.records[0];
        assert_eq!(record.domain, "acme.com");
        assert_eq!(record.company_name.as_deref(), Some("Acme Inc"));
        assert_eq!(record.revenue, Some(1_500_000.0));
        assert_eq!(record.journey_stage.as_deref(), Some("Qualified"));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_unmapped_domain_invalidates_rows() {
        let mapping = mapping_for(&["Company"]);
        let rows = vec![raw_row(1, &[("Company", "Acme")])];

        let out = normalize(&rows, &mapping);
        assert!(out.records.is_empty());
        assert_eq!(out.invalid_count, 1);
        assert_eq!(out.errors[0].row, 1);
    }
}
