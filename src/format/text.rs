use bytes::Bytes;

use crate::rpc::schema::RpcSchema;
use crate::rpc::value::{RpcValue, Scalar};

/// Interprets a plain-text payload against the target schema.
///
/// The coercion chain: the raw string wins if the schema takes it. A string of digits is
///  tried as boolean (`"0"`/`"1"` only), then i32, then i64, then f64, first parse the
///  schema accepts wins. Anything else falls back to a byte sequence if the schema wants
///  bytes, else stays a plain string. This never fails - ambiguity is resolved, not
///  rejected.
pub fn parse(text: &str, schema: RpcSchema) -> RpcValue {
    let as_string = RpcValue::from(text);
    if schema.accepts(&as_string) {
        return as_string;
    }

    if is_all_digits(text) {
        if let Some(value) = parse_numeric(text, schema) {
            return value;
        }
    }

    let as_bytes = RpcValue::of(Scalar::Bytes(Bytes::from(text.as_bytes().to_vec())));
    if schema.accepts(&as_bytes) {
        return as_bytes;
    }
    as_string
}

fn parse_numeric(text: &str, schema: RpcSchema) -> Option<RpcValue> {
    if text == "0" || text == "1" {
        let as_bool = RpcValue::from(text == "1");
        if schema.accepts(&as_bool) {
            return Some(as_bool);
        }
    }

    if let Ok(n) = text.parse::<i32>() {
        let as_int = RpcValue::from(n);
        if schema.accepts(&as_int) {
            return Some(as_int);
        }
    }
    if let Ok(n) = text.parse::<i64>() {
        let as_long = RpcValue::from(n);
        if schema.accepts(&as_long) {
            return Some(as_long);
        }
    }
    if let Ok(n) = text.parse::<f64>() {
        let as_double = RpcValue::from(n);
        if schema.accepts(&as_double) {
            return Some(as_double);
        }
    }
    None
}

fn is_all_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}
