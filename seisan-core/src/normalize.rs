//! Lenient coercion of extracted fields.
//!
//! Extraction output is best-effort: amounts arrive as JSON numbers,
//! numeric strings, adorned strings ("¥1,280", "1,280円") or garbage.
//! The policy is parse-or-zero so one bad field never sinks a whole
//! document. A coerced 0 is indistinguishable from a genuine zero-amount
//! receipt; callers must not read it as an error signal.

use serde_json::Value;

/// Coerce any JSON value to a numeric amount. Unparsable input becomes `0.0`.
pub fn coerce_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_amount(s),
        _ => 0.0,
    }
}

/// Parse a currency string. Yen signs, commas and whitespace are stripped;
/// the remainder must be a plain number or the result is `0.0`.
pub fn parse_amount(s: &str) -> f64 {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '¥' | '￥' | '円'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() => f,
        _ => 0.0,
    }
}

/// Treat empty or whitespace-only strings as absent.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    let s = value?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Zero-pad recognizable date shapes to `YYYY/MM/DD` so lexicographic
/// comparison equals chronological comparison. Unrecognized shapes pass
/// through verbatim.
pub fn canonical_date(s: &str) -> String {
    let parts: Vec<&str> = s.split(['/', '-']).collect();
    if parts.len() == 3 && parts[0].len() == 4 {
        if let (Ok(y), Ok(m), Ok(d)) = (
            parts[0].parse::<u32>(),
            parts[1].parse::<u32>(),
            parts[2].parse::<u32>(),
        ) {
            if (1..=12).contains(&m) && (1..=31).contains(&d) {
                return format!("{y:04}/{m:02}/{d:02}");
            }
        }
    }
    s.to_string()
}
