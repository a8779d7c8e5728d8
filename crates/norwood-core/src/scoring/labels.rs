//! Stage label extraction from index match metadata.
//!
//! Reference vectors were upserted by several ingestion scripts over time,
//! so the stage label can live under different keys and in different
//! shapes: a bare number, a numeric string, or a string with the stage
//! embedded ("stage_3", "LV2", "3단계"). Extraction tries a fixed key
//! list and falls back to the first integer found in the value.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Metadata keys tried in order.
const LABEL_KEYS: &[&str] = &["stage", "label", "class", "category", "stage_label"];

fn integer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("literal pattern"))
}

/// Extract a 1-based stage label from match metadata.
///
/// Returns `None` when no key yields an integer in `1..=num_classes`.
pub fn stage_label(metadata: &Map<String, Value>, num_classes: usize) -> Option<usize> {
    for key in LABEL_KEYS {
        if let Some(value) = metadata.get(*key) {
            if let Some(label) = parse_label(value) {
                if (1..=num_classes).contains(&label) {
                    return Some(label);
                }
            }
        }
    }
    None
}

/// Pull an integer out of a metadata value.
fn parse_label(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                return usize::try_from(i).ok();
            }
            // Some upserts stored stages as floats
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as usize)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<usize>() {
                return Some(i);
            }
            integer_pattern()
                .find(trimmed)
                .and_then(|m| m.as_str().parse::<usize>().ok())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(key: &str, value: Value) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(key.to_string(), value);
        m
    }

    #[test]
    fn test_numeric_stage() {
        let m = meta("stage", json!(3));
        assert_eq!(stage_label(&m, 7), Some(3));
    }

    #[test]
    fn test_float_stage() {
        let m = meta("stage", json!(4.0));
        assert_eq!(stage_label(&m, 7), Some(4));
    }

    #[test]
    fn test_string_stage() {
        let m = meta("label", json!("5"));
        assert_eq!(stage_label(&m, 7), Some(5));
    }

    #[test]
    fn test_embedded_integer_fallback() {
        assert_eq!(stage_label(&meta("class", json!("stage_3")), 7), Some(3));
        assert_eq!(stage_label(&meta("category", json!("LV2")), 7), Some(2));
        assert_eq!(stage_label(&meta("stage", json!("3단계")), 7), Some(3));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(stage_label(&meta("stage", json!(0)), 7), None);
        assert_eq!(stage_label(&meta("stage", json!(8)), 7), None);
    }

    #[test]
    fn test_key_priority() {
        let mut m = meta("stage", json!(2));
        m.insert("label".to_string(), json!(5));
        assert_eq!(stage_label(&m, 7), Some(2));
    }

    #[test]
    fn test_out_of_range_key_falls_through() {
        // "stage" holds garbage, "label" holds the real value
        let mut m = meta("stage", json!(99));
        m.insert("label".to_string(), json!("stage_4"));
        assert_eq!(stage_label(&m, 7), Some(4));
    }

    #[test]
    fn test_no_label() {
        assert_eq!(stage_label(&Map::new(), 7), None);
        assert_eq!(stage_label(&meta("stage", json!("severe")), 7), None);
        assert_eq!(stage_label(&meta("other", json!(3)), 7), None);
        assert_eq!(stage_label(&meta("stage", json!(true)), 7), None);
    }

    #[test]
    fn test_fractional_float_rejected() {
        assert_eq!(stage_label(&meta("stage", json!(3.5)), 7), None);
    }
}
