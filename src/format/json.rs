use anyhow::Context;
use bytes::Bytes;
use serde_json::{Map, Number, Value as Json};

use crate::format::JsonMode;
use crate::rpc::value::{RpcValue, Scalar};

/// Key under which a node's own scalar is stored when the node also has children;
///  a childless node serializes as its bare scalar.
const SCALAR_KEY: &str = "$";

pub fn encode(value: &RpcValue) -> anyhow::Result<Bytes> {
    let json = value_to_json(value);
    Ok(Bytes::from(serde_json::to_vec(&json)?))
}

pub fn decode(content: &[u8], mode: JsonMode) -> anyhow::Result<RpcValue> {
    let json: Json = serde_json::from_slice(content).context("malformed json content")?;
    Ok(json_to_value(&json, mode))
}

fn value_to_json(value: &RpcValue) -> Json {
    if !value.has_children() {
        return value.scalar().map(scalar_to_json).unwrap_or(Json::Null);
    }

    let mut object = Map::new();
    if let Some(scalar) = value.scalar() {
        object.insert(SCALAR_KEY.to_string(), scalar_to_json(scalar));
    }
    for (name, values) in value.children() {
        let rendered = if values.len() == 1 {
            value_to_json(&values[0])
        } else {
            Json::Array(values.iter().map(value_to_json).collect())
        };
        object.insert(name.to_string(), rendered);
    }
    Json::Object(object)
}

fn scalar_to_json(scalar: &Scalar) -> Json {
    match scalar {
        Scalar::Str(s) => Json::String(s.clone()),
        Scalar::Int(n) => Json::Number((*n).into()),
        Scalar::Long(n) => Json::Number((*n).into()),
        Scalar::Double(n) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Scalar::Bool(b) => Json::Bool(*b),
        Scalar::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
    }
}

fn json_to_value(json: &Json, mode: JsonMode) -> RpcValue {
    match json {
        Json::Null => RpcValue::empty(),
        Json::Bool(b) => RpcValue::from(*b),
        Json::Number(n) => number_to_value(n, mode),
        Json::String(s) => RpcValue::from(s.as_str()),
        Json::Array(elements) => {
            // an array without an enclosing field keeps its elements under an anonymous name
            let mut value = RpcValue::empty();
            for element in elements {
                value.push_child("_", json_to_value(element, mode));
            }
            value
        }
        Json::Object(object) => {
            let mut value = RpcValue::empty();
            for (name, member) in object {
                if name == SCALAR_KEY {
                    if let Some(scalar) = json_to_value(member, mode).scalar() {
                        value.set_scalar(scalar.clone());
                    }
                    continue;
                }
                match member {
                    Json::Array(elements) => {
                        for element in elements {
                            value.push_child(name.clone(), json_to_value(element, mode));
                        }
                    }
                    other => value.push_child(name.clone(), json_to_value(other, mode)),
                }
            }
            value
        }
    }
}

fn number_to_value(n: &Number, mode: JsonMode) -> RpcValue {
    if mode == JsonMode::Strict {
        if let Some(i) = n.as_i64() {
            return match i32::try_from(i) {
                Ok(i) => RpcValue::from(i),
                Err(_) => RpcValue::from(i),
            };
        }
    }
    RpcValue::from(n.as_f64().unwrap_or(0.0))
}
