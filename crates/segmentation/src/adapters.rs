//! Payload normalization at the data-source boundary.
//!
//! Upstream payloads arrive in snake_case, camelCase or PascalCase, with
//! numbers sometimes encoded as strings and tags either as an array or a
//! comma-separated string. Everything is mapped onto the canonical types
//! here so the evaluator never sees raw shapes.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use audience_core::error::{SegmentationError, SegmentationResult};
use audience_core::types::{AudienceRecord, Contact, FilterCriteria};

/// snake_case key plus its camelCase and PascalCase spellings.
fn key_variants(snake: &str) -> [String; 3] {
    let mut camel = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            camel.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            camel.push(ch);
        }
    }
    let mut pascal = String::with_capacity(camel.len());
    let mut chars = camel.chars();
    if let Some(first) = chars.next() {
        pascal.extend(first.to_uppercase());
        pascal.push_str(chars.as_str());
    }
    [snake.to_string(), camel, pascal]
}

/// First non-null value stored under any spelling of `snake`.
fn field<'a>(raw: &'a Value, snake: &str) -> Option<&'a Value> {
    key_variants(snake)
        .iter()
        .find_map(|k| raw.get(k.as_str()))
        .filter(|v| !v.is_null())
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        _ => None,
    }
}

fn string_field(raw: &Value, snake: &str) -> Option<String> {
    field(raw, snake).and_then(as_string)
}

/// Array of strings, a single string, or a comma-separated string.
fn string_set(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_string).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

fn u32_set(value: &Value) -> BTreeSet<u32> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_u32).collect(),
        other => as_u32(other).into_iter().collect(),
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Map a raw contact payload onto [`Contact`]. `id` and `email` are required.
pub fn normalize_contact(raw: &Value) -> SegmentationResult<Contact> {
    let id = string_field(raw, "id")
        .ok_or_else(|| SegmentationError::Validation("contact payload missing id".to_string()))?;
    let email = string_field(raw, "email").ok_or_else(|| {
        SegmentationError::Validation(format!("contact {} missing email", id))
    })?;

    Ok(Contact {
        first_name: string_field(raw, "first_name"),
        last_name: string_field(raw, "last_name"),
        property_type: string_field(raw, "property_type"),
        bedrooms: field(raw, "bedrooms").and_then(as_u32),
        bathrooms: field(raw, "bathrooms").and_then(as_u32),
        budget_min: field(raw, "budget_min").and_then(as_f64),
        budget_max: field(raw, "budget_max").and_then(as_f64),
        square_feet: field(raw, "square_feet").and_then(as_f64),
        preferred_location: string_field(raw, "preferred_location"),
        custom_tags: field(raw, "custom_tags").map(string_set).unwrap_or_default(),
        notes: string_field(raw, "notes"),
        is_active: field(raw, "is_active").and_then(as_bool).unwrap_or(true),
        id,
        email,
    })
}

/// Normalize every payload in a JSON array, failing on the first bad entry.
pub fn normalize_contacts(raw: &Value) -> SegmentationResult<Vec<Contact>> {
    raw.as_array()
        .ok_or_else(|| {
            SegmentationError::Validation("expected a JSON array of contacts".to_string())
        })?
        .iter()
        .map(normalize_contact)
        .collect()
}

/// Map raw filter criteria. Null, absent, or inactive criteria yield `None`.
pub fn normalize_filters(raw: Option<&Value>) -> Option<FilterCriteria> {
    let raw = raw.filter(|v| v.is_object())?;
    let set = |snake: &str| field(raw, snake).map(string_set);
    let criteria = FilterCriteria {
        property_type: set("property_type"),
        bedrooms: field(raw, "bedrooms").map(u32_set),
        bathrooms: field(raw, "bathrooms").map(u32_set),
        budget_min: field(raw, "budget_min").and_then(as_f64),
        budget_max: field(raw, "budget_max").and_then(as_f64),
        square_feet_min: field(raw, "square_feet_min").and_then(as_f64),
        square_feet_max: field(raw, "square_feet_max").and_then(as_f64),
        preferred_location: set("preferred_location"),
        custom_tags: set("custom_tags"),
        notes_search: string_field(raw, "notes_search"),
    };
    criteria.into_active()
}

/// Map a raw audience payload onto [`AudienceRecord`].
pub fn normalize_audience(raw: &Value) -> SegmentationResult<AudienceRecord> {
    let id = string_field(raw, "id")
        .ok_or_else(|| SegmentationError::Validation("audience payload missing id".to_string()))?;
    let name = string_field(raw, "name").ok_or_else(|| {
        SegmentationError::Validation(format!("audience {} missing name", id))
    })?;
    let created_at = field(raw, "created_at")
        .and_then(timestamp)
        .unwrap_or_else(Utc::now);

    Ok(AudienceRecord {
        description: string_field(raw, "description"),
        filters: normalize_filters(field(raw, "filters")),
        contact_count: field(raw, "contact_count")
            .and_then(as_f64)
            .map(|n| n.max(0.0) as u64)
            .unwrap_or(0),
        updated_at: field(raw, "updated_at")
            .and_then(timestamp)
            .unwrap_or(created_at),
        created_at,
        id,
        name,
    })
}
