//! Canonical-record export: delimited text and JSON round-trips.
//!
//! Canonical columns come first, then the union of pass-through columns in
//! first-seen order. Every extra column survives export — the pipeline
//! promises not to destroy unrecognized data.

use serde_json::{json, Map, Value};

use crate::error::PipelineError;
use crate::types::{CanonicalField, CanonicalRecord, CellValue};

/// Render records as CSV. Canonical columns appear only when populated in
/// at least one record (the domain column always); extras follow in the
/// order they were first seen.
pub fn to_csv(records: &[CanonicalRecord]) -> Result<String, PipelineError> {
    let canonical: Vec<CanonicalField> = CanonicalField::ALL
        .iter()
        .copied()
        .filter(|f| f.is_required() || records.iter().any(|r| canonical_value(r, *f).is_some()))
        .collect();
    let extras = extra_columns(records);

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = canonical.iter().map(|f| f.as_str()).collect();
    header.extend(extras.iter().map(|s| s.as_str()));
    writer
        .write_record(&header)
        .map_err(|e| PipelineError::Export(e.to_string()))?;

    for record in records {
        let mut row: Vec<String> = canonical
            .iter()
            .map(|f| canonical_value(record, *f).unwrap_or_default())
            .collect();
        for column in &extras {
            let value = record
                .extra
                .iter()
                .find(|(k, _)| k == column)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            row.push(value);
        }
        writer
            .write_record(&row)
            .map_err(|e| PipelineError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Export(e.to_string()))
}

/// Render records as a JSON array of flat objects: canonical fields under
/// their snake_case names, pass-through columns inlined under their
/// original headers. Extras whose header collides with a canonical field
/// name keep the canonical value and are dropped from the object.
pub fn to_json(records: &[CanonicalRecord]) -> Value {
    let objects: Vec<Value> = records
        .iter()
        .map(|record| {
            let mut obj = Map::new();
            for &field in CanonicalField::ALL {
                if let Some(value) = canonical_json_value(record, field) {
                    obj.insert(field.as_str().to_string(), value);
                }
            }
            for (header, value) in &record.extra {
                if !obj.contains_key(header) {
                    obj.insert(header.clone(), json!(value));
                }
            }
            Value::Object(obj)
        })
        .collect();
    Value::Array(objects)
}

/// Reverse [`to_json`]: known snake_case keys become canonical fields,
/// everything else lands back in the pass-through bag.
pub fn records_from_json(value: &Value) -> Result<Vec<CanonicalRecord>, PipelineError> {
    let array = value
        .as_array()
        .ok_or_else(|| PipelineError::Export("expected a JSON array of records".into()))?;

    let mut records = Vec::with_capacity(array.len());
    for (i, entry) in array.iter().enumerate() {
        let obj = entry
            .as_object()
            .ok_or_else(|| PipelineError::Export(format!("record {} is not an object", i)))?;
        let domain = obj
            .get("domain")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PipelineError::Export(format!("record {} has no domain", i)))?;

        let mut record = CanonicalRecord::new(domain);
        let text = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);
        let number = |key: &str| obj.get(key).and_then(|v| v.as_f64());

        record.company_name = text("company_name");
        record.industry = text("industry");
        record.revenue = number("revenue");
        record.traffic = number("traffic");
        record.owner = text("owner");
        record.region = text("region");
        record.journey_stage = text("journey_stage");
        record.engagement_score = number("engagement_score");
        record.crm_id = text("crm_id");
        record.ticker_symbol = text("ticker_symbol");

        let canonical_keys: Vec<&str> = CanonicalField::ALL.iter().map(|f| f.as_str()).collect();
        for (key, val) in obj {
            if canonical_keys.contains(&key.as_str()) {
                continue;
            }
            let rendered = match val {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            record.extra.push((key.clone(), rendered));
        }

        records.push(record);
    }
    Ok(records)
}

fn canonical_value(record: &CanonicalRecord, field: CanonicalField) -> Option<String> {
    let num = |n: Option<f64>| n.map(|v| CellValue::Number(v).as_text());
    match field {
        CanonicalField::Domain => Some(record.domain.clone()),
        CanonicalField::CompanyName => record.company_name.clone(),
        CanonicalField::Industry => record.industry.clone(),
        CanonicalField::Revenue => num(record.revenue),
        CanonicalField::Traffic => num(record.traffic),
        CanonicalField::Owner => record.owner.clone(),
        CanonicalField::Region => record.region.clone(),
        CanonicalField::JourneyStage => record.journey_stage.clone(),
        CanonicalField::EngagementScore => num(record.engagement_score),
        CanonicalField::CrmId => record.crm_id.clone(),
        CanonicalField::TickerSymbol => record.ticker_symbol.clone(),
    }
}

fn canonical_json_value(record: &CanonicalRecord, field: CanonicalField) -> Option<Value> {
    match field {
        CanonicalField::Domain => Some(json!(record.domain)),
        CanonicalField::CompanyName => record.company_name.as_ref().map(|v| json!(v)),
        CanonicalField::Industry => record.industry.as_ref().map(|v| json!(v)),
        CanonicalField::Revenue => record.revenue.map(|v| json!(v)),
        CanonicalField::Traffic => record.traffic.map(|v| json!(v)),
        CanonicalField::Owner => record.owner.as_ref().map(|v| json!(v)),
        CanonicalField::Region => record.region.as_ref().map(|v| json!(v)),
        CanonicalField::JourneyStage => record.journey_stage.as_ref().map(|v| json!(v)),
        CanonicalField::EngagementScore => record.engagement_score.map(|v| json!(v)),
        CanonicalField::CrmId => record.crm_id.as_ref().map(|v| json!(v)),
        CanonicalField::TickerSymbol => record.ticker_symbol.as_ref().map(|v| json!(v)),
    }
}

/// Union of pass-through headers across records, first-seen order.
fn extra_columns(records: &[CanonicalRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for (header, _) in &record.extra {
            if !columns.iter().any(|c| c == header) {
                columns.push(header.clone());
            }
        }
    }
    columns
}
