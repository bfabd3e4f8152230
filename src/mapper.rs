//! Header → canonical-field detection.
//!
//! Given the header list from a parse, infer which column feeds each
//! canonical field using exact synonym matching first, then fuzzy scoring.
//! The mapper never fails: a missing domain column is communicated through
//! `has_domain = false` plus a warning, and the caller decides whether to
//! halt or prompt for a manual mapping.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::types::{CanonicalField, FieldMapping};

/// Minimum fuzzy score for a header to be accepted for a field.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Built-in synonym lists per canonical field. Entries are compared after
/// normalization, so punctuation and case here are cosmetic.
fn default_synonyms() -> HashMap<CanonicalField, Vec<String>> {
    let table: &[(CanonicalField, &[&str])] = &[
        (
            CanonicalField::Domain,
            &[
                "domain", "website", "url", "web site", "company url", "company website",
                "site", "web address", "homepage", "company domain", "domain name",
            ],
        ),
        (
            CanonicalField::CompanyName,
            &[
                "company", "company name", "account", "account name", "name",
                "organization", "organisation", "business name",
            ],
        ),
        (
            CanonicalField::Industry,
            &["industry", "vertical", "sector", "industry vertical"],
        ),
        (
            CanonicalField::Revenue,
            &[
                "revenue", "annual revenue", "arr", "sales", "turnover",
                "estimated revenue", "revenue usd",
            ],
        ),
        (
            CanonicalField::Traffic,
            &[
                "traffic", "monthly traffic", "visits", "monthly visits",
                "web traffic", "sessions",
            ],
        ),
        (
            CanonicalField::Owner,
            &[
                "owner", "account owner", "sales rep", "rep", "assigned to",
                "account executive",
            ],
        ),
        (
            CanonicalField::Region,
            &["region", "country", "geo", "territory", "state", "location"],
        ),
        (
            CanonicalField::JourneyStage,
            &["journey stage", "stage", "buyer stage", "lifecycle stage", "funnel stage"],
        ),
        (
            CanonicalField::EngagementScore,
            &["engagement score", "engagement", "intent score"],
        ),
        (
            CanonicalField::CrmId,
            &["crm id", "salesforce id", "sfdc id", "account id"],
        ),
        (
            CanonicalField::TickerSymbol,
            &["ticker", "ticker symbol", "stock symbol", "stock ticker"],
        ),
    ];

    table
        .iter()
        .map(|(field, names)| (*field, names.iter().map(|s| s.to_string()).collect()))
        .collect()
}

/// Immutable mapper configuration. Tests and consumers substitute their own
/// synonym lists here instead of patching globals.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub synonyms: HashMap<CanonicalField, Vec<String>>,
    pub threshold: f64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            synonyms: default_synonyms(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MapperConfig {
    /// Extend the built-in synonym lists with consumer-supplied entries.
    pub fn with_overrides(overrides: HashMap<CanonicalField, Vec<String>>) -> Self {
        let mut config = Self::default();
        for (field, extra) in overrides {
            config.synonyms.entry(field).or_default().extend(extra);
        }
        config
    }
}

pub struct Mapper {
    config: MapperConfig,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl Mapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    /// Infer the field mapping for a header list.
    ///
    /// Exact pass first (all fields, priority order), then a fuzzy pass
    /// over whatever remains. Each header is claimed by at most one field;
    /// the first field to claim it in priority order wins.
    pub fn detect_mapping(&self, headers: &[String]) -> FieldMapping {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut columns: HashMap<CanonicalField, String> = HashMap::new();
        let mut claimed: HashSet<usize> = HashSet::new();

        // Exact pass
        for &field in CanonicalField::ALL {
            let Some(synonyms) = self.config.synonyms.get(&field) else {
                continue;
            };
            let exact: HashSet<String> = synonyms.iter().map(|s| normalize_header(s)).collect();
            for (i, norm) in normalized.iter().enumerate() {
                if claimed.contains(&i) || norm.is_empty() {
                    continue;
                }
                if exact.contains(norm) {
                    debug!("exact match: \"{}\" -> {}", headers[i], field.as_str());
                    columns.insert(field, headers[i].clone());
                    claimed.insert(i);
                    break;
                }
            }
        }

        // Fuzzy pass for fields the exact pass left unmatched
        for &field in CanonicalField::ALL {
            if columns.contains_key(&field) {
                continue;
            }
            let Some(synonyms) = self.config.synonyms.get(&field) else {
                continue;
            };

            let mut best: Option<(usize, f64)> = None;
            for (i, norm) in normalized.iter().enumerate() {
                if claimed.contains(&i) || norm.is_empty() {
                    continue;
                }
                let score = synonyms
                    .iter()
                    .map(|s| similarity(norm, &normalize_header(s)))
                    .fold(0.0_f64, f64::max);
                if score >= self.config.threshold
                    && best.map_or(true, |(_, prev)| score > prev)
                {
                    best = Some((i, score));
                }
            }

            if let Some((i, score)) = best {
                debug!(
                    "fuzzy match: \"{}\" -> {} (score {:.2})",
                    headers[i],
                    field.as_str(),
                    score
                );
                columns.insert(field, headers[i].clone());
                claimed.insert(i);
            }
        }

        let has_domain = columns.contains_key(&CanonicalField::Domain);
        let optional_total = CanonicalField::ALL.len() - 1;
        let optional_matched = columns.len() - usize::from(has_domain);
        let confidence = (if has_domain { 70.0 } else { 0.0 }
            + 30.0 * optional_matched as f64 / optional_total as f64)
            .round() as u8;

        let mut warnings = Vec::new();
        if !has_domain {
            warnings.push(
                "No domain column detected — map one manually before importing".to_string(),
            );
        }
        if !columns.contains_key(&CanonicalField::CompanyName) {
            warnings.push("No company name column detected".to_string());
        }
        let unmapped = headers.len().saturating_sub(claimed.len());
        if unmapped * 2 > headers.len() {
            warnings.push(format!(
                "{} of {} columns were not recognized and will be kept as extra fields",
                unmapped,
                headers.len()
            ));
        }

        info!(
            "mapping detected: {} of {} fields, confidence {}",
            columns.len(),
            CanonicalField::ALL.len(),
            confidence
        );

        FieldMapping {
            columns,
            confidence,
            has_domain,
            warnings,
        }
    }
}

/// Case/punctuation-insensitive header form: lowercase, non-alphanumerics
/// become spaces, whitespace runs collapse to one space.
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut last_was_space = true;
    for c in header.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Similarity between two normalized strings:
/// 1.0 identical, 0.8 when one contains the other, otherwise 0.7 × the
/// fraction of shared tokens over the token union.
fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.contains(b) || b.contains(a) {
        return 0.8;
    }

    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    0.7 * shared as f64 / union as f64
}
