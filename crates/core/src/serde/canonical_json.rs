//! Canonical JSON: sorted keys, no insignificant whitespace, minimal numbers.

use serde_json::{Number, Value as JsonValue};
use thiserror::Error;

/// A JSON object as signed and verified on the federation wire.
pub type CanonicalJsonObject = serde_json::Map<String, JsonValue>;

/// Integers in this range are exact in an IEEE double, so a float holding one
/// is written without a fractional part.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Error, Debug)]
pub enum CanonicalJsonError {
    #[error("value is not a JSON object")]
    NotObject,
    #[error("number `{0}` has no canonical form")]
    InvalidNumber(Number),
    #[error("json: `{0}`")]
    Json(#[from] serde_json::Error),
}

/// Serializes the value in canonical form.
///
/// Object keys are sorted by their UTF-8 bytes at every nesting level. Strings
/// use the shortest escapes JSON allows, so non-ASCII text is emitted as-is.
pub fn to_canonical_string(value: &JsonValue) -> Result<String, CanonicalJsonError> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &JsonValue) -> Result<(), CanonicalJsonError> {
    match value {
        JsonValue::Object(object) => {
            let mut entries: Vec<_> = object.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

            out.push('{');
            for (index, (key, value)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_value(out, value)?;
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        JsonValue::Number(number) => write_number(out, number)?,
        other => out.push_str(&serde_json::to_string(other)?),
    }
    Ok(())
}

fn write_number(out: &mut String, number: &Number) -> Result<(), CanonicalJsonError> {
    if number.is_i64() || number.is_u64() {
        out.push_str(&number.to_string());
        return Ok(());
    }
    let Some(float) = number.as_f64().filter(|f| f.is_finite()) else {
        return Err(CanonicalJsonError::InvalidNumber(number.clone()));
    };
    if float.fract() == 0.0 && float.abs() <= MAX_SAFE_INTEGER {
        out.push_str(&(float as i64).to_string());
    } else {
        out.push_str(&number.to_string());
    }
    Ok(())
}
