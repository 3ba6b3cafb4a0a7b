//! Input and output normalization.
//!
//! Keywords are cleaned before they reach the API. Upstream fields are
//! inconsistently typed (numbers, numeric strings, threshold strings such as
//! `"< 10"`, missing keys), so every helper here is total: bad input falls
//! back to a default instead of failing.

use serde_json::Value;

/// Longest keyword (in characters) sent upstream.
pub const MAX_KEYWORD_CHARS: usize = 50;

/// Placeholder shown for a missing or non-positive bid.
pub const NO_BID: &str = "-";

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'   // syllables
        | '\u{1100}'..='\u{11FF}' // jamo
        | '\u{3130}'..='\u{318F}' // compatibility jamo
    )
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || is_hangul(c) || matches!(c, ' ' | '.' | '-' | '_')
}

/// Normalize a raw keyword for the API.
///
/// Whitespace becomes a single space, disallowed characters are dropped,
/// the ends are trimmed and the result is capped at 50 characters. An empty
/// result means the keyword cannot be queried. Cleaning is idempotent.
pub fn clean_keyword(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        let c = if c.is_whitespace() { ' ' } else { c };
        if !is_allowed(c) {
            continue;
        }
        if c == ' ' {
            pending_space = !cleaned.is_empty();
            continue;
        }
        if pending_space {
            cleaned.push(' ');
            pending_space = false;
        }
        cleaned.push(c);
    }

    let truncated: String = cleaned.chars().take(MAX_KEYWORD_CHARS).collect();
    truncated.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Parse a numeric string the way upstream formats counts.
///
/// `"< 10"` and `"> 100"` denote thresholds; only the part after the last
/// marker is kept. Everything but ASCII digits and `.` is stripped.
fn parse_numeric_text(text: &str) -> Option<i64> {
    let tail = match text.rfind(|c| c == '<' || c == '>') {
        Some(idx) => &text[idx + 1..],
        None => text,
    };
    let digits: String = tail
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
}

/// Coerce an upstream field into an integer, truncating fractions.
pub fn safe_number(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|v| v.trunc() as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => parse_numeric_text(s).unwrap_or(default),
        _ => default,
    }
}

/// The field as a float, only when upstream sent an actual number.
pub fn numeric_field(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

/// `1234567` → `"1,234,567"`.
pub fn format_number(n: i64) -> String {
    group_thousands(n)
}

/// Fractional rate as a percentage with two decimals; missing → `"0.00%"`.
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => "0.00%".to_string(),
    }
}

/// Bid amount as a grouped integer, or `"-"` when there is nothing to show.
pub fn format_bid(value: Option<&Value>) -> String {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let compact: String = s.chars().filter(|c| *c != ',' && *c != ' ').collect();
            let looks_numeric = !compact.is_empty()
                && compact
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
            if looks_numeric {
                compact.parse::<f64>().ok()
            } else {
                None
            }
        }
        _ => None,
    };

    match amount {
        Some(v) if v.is_finite() && v > 0.0 => group_thousands(v.trunc() as i64),
        _ => NO_BID.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
