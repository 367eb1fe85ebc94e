//! Parse-and-validate step for raw backend payloads.
//!
//! The backend is loosely typed: coordinates and sizes may be serialized as
//! numbers or strings (sometimes with a `,` decimal separator), ids may be
//! numbers or strings, and status casing varies. These functions turn a
//! [`serde_json::Value`] into a [`Report`] or reject it with a
//! [`ModelError`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    Attribution, AttributionField, ModelError, Report, ReportId, ReportStatus, Timeline,
    check_latitude, check_longitude,
};

/// Outcome of parsing a batch of reports.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    /// Records that passed validation, in input order.
    pub reports: Vec<Report>,
    /// Why each rejected record was dropped, in input order.
    pub rejected: Vec<ModelError>,
}

/// Parses a JSON array of reports, dropping malformed records.
///
/// A single bad record never aborts the batch.
///
/// # Errors
///
/// Returns [`ModelError::Shape`] if `body` is not a JSON array.
pub fn parse_reports(body: &Value) -> Result<ParsedBatch, ModelError> {
    let items = body.as_array().ok_or_else(|| ModelError::Shape {
        message: format!("expected an array of reports, got {}", type_name(body)),
    })?;

    let mut batch = ParsedBatch {
        reports: Vec::with_capacity(items.len()),
        rejected: Vec::new(),
    };

    for item in items {
        match parse_report(item) {
            Ok(report) => batch.reports.push(report),
            Err(e) => batch.rejected.push(e),
        }
    }

    Ok(batch)
}

/// Parses and validates a single report object.
///
/// # Errors
///
/// Returns [`ModelError`] if the value is not an object, the id or a
/// coordinate is missing, or a coordinate is non-finite or out of range.
pub fn parse_report(value: &Value) -> Result<Report, ModelError> {
    let obj = value.as_object().ok_or_else(|| ModelError::Shape {
        message: format!("expected a report object, got {}", type_name(value)),
    })?;

    let id = obj
        .get("id")
        .and_then(parse_id)
        .ok_or(ModelError::MissingField { field: "id" })?;

    let latitude = obj
        .get("latitude")
        .and_then(parse_number)
        .ok_or(ModelError::MissingField { field: "latitude" })?;
    let longitude = obj
        .get("longitude")
        .and_then(parse_number)
        .ok_or(ModelError::MissingField { field: "longitude" })?;
    check_latitude(latitude)?;
    check_longitude(longitude)?;

    let status = ReportStatus::from_lenient(obj.get("status").and_then(Value::as_str));

    let size = obj
        .get("size")
        .and_then(parse_number)
        .filter(|s| s.is_finite() && *s >= 0.0);

    let phone = obj
        .get("phone")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);

    let mut attribution = Attribution::default();
    for field in AttributionField::all() {
        attribution.set(*field, obj.get(field.json_name()).and_then(parse_user_id));
    }

    let timestamp = |name: &str| obj.get(name).and_then(parse_timestamp);
    let timeline = Timeline {
        reported_at: timestamp("reportedAt"),
        updated_at: timestamp("updatedAt"),
        scheduled_at: timestamp("scheduledAt"),
        recovered_at: timestamp("recoveredAt"),
        cancelled_at: timestamp("cancelledAt"),
    };

    Ok(Report {
        id,
        latitude,
        longitude,
        status,
        size,
        phone,
        attribution,
        timeline,
    })
}

/// Coerces a JSON number or numeric string into an `f64`.
///
/// Strings may use `,` as the decimal separator. Returns `None` for any
/// other JSON type or an unparseable string. Non-finite results (e.g. the
/// string `"NaN"`) are returned as-is so callers can range-check them.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Parses a user-entered decimal, accepting `,` or `.` as the separator.
#[must_use]
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse().ok()
}

fn parse_id(value: &Value) -> Option<ReportId> {
    match value {
        Value::Number(n) => n.as_i64().map(ReportId::Numeric),
        Value::String(s) if !s.trim().is_empty() => Some(ReportId::from(s.as_str())),
        _ => None,
    }
}

fn parse_user_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(|s| s.parse::<DateTime<Utc>>().ok())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
