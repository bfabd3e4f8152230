//! Shared data model for the ingestion and classification pipeline.
//!
//! The two halves of the pipeline (parse/map/normalize and classification)
//! only share these shapes — they never call each other directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RowError;

// =============================================================================
// Raw cells and rows
// =============================================================================

/// One spreadsheet cell after parsing. Integer and float cells unify into
/// `Number`; workbook formula errors and blanks both land on `Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as display text. Whole-number floats drop the
    /// trailing `.0` so `5000000.0` exports as `5000000`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Boolean(b) => b.to_string(),
        }
    }
}

/// One parsed row: original header text → cell value, column order preserved.
/// Carries its 1-based data-row position so errors reported downstream
/// reference the uploaded file, not a renumbered batch.
/// Ephemeral — exists only between parsing and normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row: usize,
    pub cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new(row: usize, cells: Vec<(String, CellValue)>) -> Self {
        Self { row, cells }
    }

    /// Value under the given header, if the column exists in this row.
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, v)| v)
    }
}

// =============================================================================
// Canonical fields and field mapping
// =============================================================================

/// The fixed set of business fields a spreadsheet column can map onto.
/// `Domain` is the only required field — everything else is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Domain,
    CompanyName,
    Industry,
    Revenue,
    Traffic,
    Owner,
    Region,
    JourneyStage,
    EngagementScore,
    CrmId,
    TickerSymbol,
}

impl CanonicalField {
    /// Priority order for header claiming: the first field to claim a
    /// header wins, so `Domain` must come first.
    pub const ALL: &'static [CanonicalField] = &[
        CanonicalField::Domain,
        CanonicalField::CompanyName,
        CanonicalField::Industry,
        CanonicalField::Revenue,
        CanonicalField::Traffic,
        CanonicalField::Owner,
        CanonicalField::Region,
        CanonicalField::JourneyStage,
        CanonicalField::EngagementScore,
        CanonicalField::CrmId,
        CanonicalField::TickerSymbol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Domain => "domain",
            CanonicalField::CompanyName => "company_name",
            CanonicalField::Industry => "industry",
            CanonicalField::Revenue => "revenue",
            CanonicalField::Traffic => "traffic",
            CanonicalField::Owner => "owner",
            CanonicalField::Region => "region",
            CanonicalField::JourneyStage => "journey_stage",
            CanonicalField::EngagementScore => "engagement_score",
            CanonicalField::CrmId => "crm_id",
            CanonicalField::TickerSymbol => "ticker_symbol",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, CanonicalField::Domain)
    }
}

/// Which original header feeds each canonical field, plus how sure the
/// detector was. Produced once per upload, immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// canonical field → original header text, absent when unmatched
    pub columns: HashMap<CanonicalField, String>,
    /// 0–100: 70% weight on the domain match, 30% on optional coverage
    pub confidence: u8,
    pub has_domain: bool,
    pub warnings: Vec<String>,
}

impl FieldMapping {
    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(|s| s.as_str())
    }

    /// True when the given original header was claimed by any field.
    pub fn claims(&self, header: &str) -> bool {
        self.columns.values().any(|h| h == header)
    }
}

// =============================================================================
// Canonical records and batches
// =============================================================================

/// The validated, field-mapped representation of one uploaded row, keyed by
/// a normalized domain. Unrecognized columns survive in `extra` untouched
/// (trimmed when textual) so no information is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker_symbol: Option<String>,
    /// Pass-through bag: original header → trimmed text, first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl CanonicalRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            company_name: None,
            industry: None,
            revenue: None,
            traffic: None,
            owner: None,
            region: None,
            journey_stage: None,
            engagement_score: None,
            crm_id: None,
            ticker_symbol: None,
            extra: Vec::new(),
        }
    }
}

/// One parse+map+normalize pass over an upload. Consumed exactly once by
/// the ingest step; only its effects on the store persist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatch {
    pub records: Vec<CanonicalRecord>,
    pub total_rows: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub duplicate_count: usize,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
}

// =============================================================================
// Classification inputs and outputs
// =============================================================================

/// Buyer-journey stage from the intent data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyStage {
    Qualified,
    Engagement,
    Awareness,
}

impl JourneyStage {
    /// Lenient parse for values arriving from spreadsheets or the intent
    /// feed. Unknown stages map to `None` (the zero-point case).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "qualified" => Some(JourneyStage::Qualified),
            "engagement" | "engaged" => Some(JourneyStage::Engagement),
            "awareness" | "aware" => Some(JourneyStage::Awareness),
            _ => None,
        }
    }
}

/// Everything the classifier reads for one account. Technology flags come
/// from detection at upload time; the secondary-layer signals (journey,
/// overlap, industry) land later via enrichment and trigger a re-classify.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSignals {
    /// Content-management vendor, e.g. "WordPress"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms: Option<String>,
    /// Commerce platform vendor, e.g. "Shopify Plus"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commerce: Option<String>,
    /// Marketing automation vendor, e.g. "Klaviyo"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing: Option<String>,
    /// Site-search vendor; `"Native"` means platform-built-in search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey_stage: Option<JourneyStage>,
    #[serde(default)]
    pub partner_overlap: bool,
    #[serde(default)]
    pub industry_boost: u32,
}

impl AccountSignals {
    /// Any partner technology detected at all (the `BASE` cohort gate).
    pub fn has_any_technology(&self) -> bool {
        self.cms.is_some()
            || self.commerce.is_some()
            || self.marketing.is_some()
            || self.search.is_some()
    }

    /// Whether any secondary-layer signal has landed yet.
    pub fn has_secondary_signals(&self) -> bool {
        self.journey_stage.is_some() || self.partner_overlap || self.industry_boost > 0
    }
}

/// Technology-stack cohort, ordered best-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TechCohort {
    Jackpot,
    High,
    Medium,
    Base,
}

impl TechCohort {
    pub fn as_str(&self) -> &'static str {
        match self {
            TechCohort::Jackpot => "JACKPOT",
            TechCohort::High => "HIGH",
            TechCohort::Medium => "MEDIUM",
            TechCohort::Base => "BASE",
        }
    }
}

/// Whether the account already runs a competing search product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SalesPlay {
    Displacement,
    Greenfield,
}

/// Final outreach priority, derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

/// Output of one classification pass. A pure function of [`AccountSignals`]
/// — recomputing with the same input always yields the same result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_cohort: Option<TechCohort>,
    pub sales_play: SalesPlay,
    pub tier: Tier,
    /// The composite score the tier was cut from, kept for display.
    pub score: u32,
}
