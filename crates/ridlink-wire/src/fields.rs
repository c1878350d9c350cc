//! Lenient field extraction
//!
//! The device firmware is inconsistent about types: coordinates usually
//! arrive as strings, sometimes as numbers, sometimes as empty strings.
//! These helpers never fail; anything absent or unparseable becomes the
//! type's zero value.

use serde_json::{Map, Value};

/// JSON object as produced by `serde_json`
pub type Object = Map<String, Value>;

/// String value; numbers and booleans are rendered to text, null is empty
pub fn string_field(obj: &Object, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Integer value; floats truncate, numeric strings are parsed
pub fn int_field(obj: &Object, key: &str) -> i32 {
    match obj.get(key) {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                clamp_i32(i)
            } else {
                n.as_f64().map(truncate_f64).unwrap_or(0)
            }
        }
        Some(Value::String(s)) => parse_int(s),
        _ => 0,
    }
}

/// Double-precision value; numeric strings are parsed
pub fn f64_field(obj: &Object, key: &str) -> f64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_f64(s),
        _ => 0.0,
    }
}

/// Single-precision value; numeric strings are parsed
pub fn f32_field(obj: &Object, key: &str) -> f32 {
    f64_field(obj, key) as f32
}

fn parse_f64(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    s.parse::<f64>().unwrap_or(0.0)
}

fn parse_int(s: &str) -> i32 {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return clamp_i32(i);
    }
    s.parse::<f64>().map(truncate_f64).unwrap_or(0)
}

fn clamp_i32(i: i64) -> i32 {
    i.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn truncate_f64(f: f64) -> i32 {
    if f.is_nan() {
        0
    } else {
        // `as` saturates at the i32 bounds
        f.trunc() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Object {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_string_field_coercion() {
        let o = obj(json!({"a": "x", "b": 12, "c": true, "d": null, "e": [1]}));
        assert_eq!(string_field(&o, "a"), "x");
        assert_eq!(string_field(&o, "b"), "12");
        assert_eq!(string_field(&o, "c"), "true");
        assert_eq!(string_field(&o, "d"), "");
        assert_eq!(string_field(&o, "e"), "");
        assert_eq!(string_field(&o, "missing"), "");
    }

    #[test]
    fn test_int_field_coercion() {
        let o = obj(json!({
            "a": -67, "b": 3.9, "c": "16", "d": "12.7", "e": "abc",
            "f": "", "g": null, "h": 99999999999i64
        }));
        assert_eq!(int_field(&o, "a"), -67);
        assert_eq!(int_field(&o, "b"), 3);
        assert_eq!(int_field(&o, "c"), 16);
        assert_eq!(int_field(&o, "d"), 12);
        assert_eq!(int_field(&o, "e"), 0);
        assert_eq!(int_field(&o, "f"), 0);
        assert_eq!(int_field(&o, "g"), 0);
        assert_eq!(int_field(&o, "h"), i32::MAX);
        assert_eq!(int_field(&o, "missing"), 0);
    }

    #[test]
    fn test_float_field_coercion() {
        let o = obj(json!({
            "a": "47.6062", "b": -122.3321, "c": "", "d": "n/a",
            "e": " 12.5 ", "f": null, "g": false
        }));
        assert_eq!(f64_field(&o, "a"), 47.6062);
        assert_eq!(f64_field(&o, "b"), -122.3321);
        assert_eq!(f64_field(&o, "c"), 0.0);
        assert_eq!(f64_field(&o, "d"), 0.0);
        assert_eq!(f32_field(&o, "e"), 12.5);
        assert_eq!(f64_field(&o, "f"), 0.0);
        assert_eq!(f64_field(&o, "g"), 0.0);
        assert_eq!(f32_field(&o, "missing"), 0.0);
    }
}
