//! Built-in transforms: `integer`, `date`, `text`, `list_count`, `concat`.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use super::TransformContext;
use crate::path;
use bioconnect_common::{BioconnectError, Result};

/// Year used when a structured date carries no year at all.
pub const EPOCH_YEAR: i32 = 1970;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun",
    "jul", "aug", "sep", "oct", "nov", "dec",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%Y%m%d"];

// ── integer ───────────────────────────────────────────────────────────────────

/// Coerce to an integer. Strings keep only digits and a leading minus sign
/// (`"1,234 citations"` → 1234); anything unparsable becomes `null`.
pub fn integer(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    let parsed = match &value {
        Value::Null => return Ok(Value::Null),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_integer_str(s),
        _ => None,
    };
    match parsed {
        Some(n) => Ok(Value::from(n)),
        None => {
            warn!(?value, "Error converting to integer");
            Ok(Value::Null)
        }
    }
}

fn parse_integer_str(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    let negative = trimmed.starts_with('-');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    Some(if negative { -n } else { n })
}

// ── date ──────────────────────────────────────────────────────────────────────

/// Build an ISO `YYYY-MM-DD` date.
///
/// Structured form: `args` names `year`/`month`/`day` sub-paths relative to
/// the field's node (`Month|MedlineDate` tries each alternative), or the
/// value itself is an object with those keys. Missing month/day default to 1,
/// a missing year to [`EPOCH_YEAR`]. Plain strings are tried against the
/// common date layouts.
pub fn date(value: Value, ctx: &TransformContext<'_>) -> Result<Value> {
    let parsed = if has_date_parts(ctx.args) {
        let part = |key: &str| {
            ctx.args
                .get(key)
                .and_then(Value::as_str)
                .and_then(|p| resolve_alternatives(ctx, p))
        };
        from_parts(part("year"), part("month"), part("day"))
    } else if has_date_parts(&value) {
        let part = |key: &str| value.get(key).and_then(scalar_string);
        from_parts(part("year"), part("month"), part("day"))
    } else if let Some(s) = value.as_str() {
        parse_date_str(s)
    } else if value.is_null() {
        return Ok(Value::Null);
    } else {
        None
    };

    match parsed {
        Some(d) => Ok(Value::String(d.format("%Y-%m-%d").to_string())),
        None => {
            warn!(?value, "Error transforming date");
            Ok(Value::Null)
        }
    }
}

fn has_date_parts(v: &Value) -> bool {
    v.as_object()
        .map(|o| o.contains_key("year") || o.contains_key("month") || o.contains_key("day"))
        .unwrap_or(false)
}

fn resolve_alternatives(ctx: &TransformContext<'_>, paths: &str) -> Option<String> {
    paths
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .find_map(|p| scalar_string(&path::extract(ctx.node, p)))
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn from_parts(year: Option<String>, month: Option<String>, day: Option<String>) -> Option<NaiveDate> {
    let year: i32 = match year {
        // MedlineDate values look like "2023 Jan-Feb"
        Some(y) => y
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok()?,
        None => EPOCH_YEAR,
    };
    let month: u32 = match month {
        Some(m) => month_number(&m)?,
        None => 1,
    };
    let day: u32 = match day {
        Some(d) => d.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `"3"` → 3, `"Mar"`/`"March"` → 3. Unrecognised names fall back to January.
fn month_number(m: &str) -> Option<u32> {
    if m.chars().all(|c| c.is_ascii_digit()) {
        return m.parse().ok();
    }
    let prefix: String = m.chars().take(3).collect::<String>().to_lowercase();
    Some(
        MONTHS
            .iter()
            .position(|name| *name == prefix)
            .map(|i| i as u32 + 1)
            .unwrap_or(1),
    )
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Partial dates: "2024-03" and "2024"
    let mut parts = s.splitn(3, '-');
    let year = parts.next().filter(|y| y.len() == 4)?;
    let month = parts.next();
    if parts.next().is_some() {
        return None;
    }
    from_parts(Some(year.to_string()), month.map(String::from), None)
}

// ── text ──────────────────────────────────────────────────────────────────────

pub fn text(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => {
            return Err(BioconnectError::Transform(format!(
                "text transform expects a scalar, got {other}"
            )))
        }
    })
}

// ── list_count ────────────────────────────────────────────────────────────────

pub fn list_count(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    Ok(match value {
        Value::Array(items) => Value::from(items.len()),
        _ => Value::Null,
    })
}

// ── concat ────────────────────────────────────────────────────────────────────

/// Join literal strings and path-resolved values:
/// `{separator: ", ", fields: ["Dr.", {path: "LastName"}]}`.
pub fn concat(_value: Value, ctx: &TransformContext<'_>) -> Result<Value> {
    let separator = ctx.args.get("separator").and_then(Value::as_str).unwrap_or(" ");
    let fields = ctx
        .args
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| BioconnectError::Transform("concat requires a `fields` list".into()))?;

    let parts: Vec<String> = fields
        .iter()
        .filter_map(|field| match field {
            Value::String(literal) => Some(literal.clone()),
            Value::Object(o) => o
                .get("path")
                .and_then(Value::as_str)
                .and_then(|p| scalar_string(&path::extract(ctx.node, p))),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::String(parts.join(separator)))
    }
}
