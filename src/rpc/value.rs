use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

use bytes::Bytes;

/// The scalar leaf types the host runtime distinguishes. Everything that goes over the
///  wire as content is built from these plus nesting.
#[derive(Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Bytes(Bytes),
}

impl Scalar {
    /// canonical textual rendering, used for plain-text content and alias substitution
    pub fn render(&self) -> String {
        match self {
            Scalar::Str(s) => s.clone(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Long(n) => n.to_string(),
            Scalar::Double(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl Debug for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Int(n) => write!(f, "{}:int", n),
            Scalar::Long(n) => write!(f, "{}:long", n),
            Scalar::Double(n) => write!(f, "{}:double", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

/// A tree-shaped payload value: an optional scalar plus named children, each name holding
///  an ordered sequence of values. This mirrors the host runtime's generic data model,
///  and it is what the content codecs serialize and deserialize.
///
/// Child sequences are what JSON arrays and repeated XML elements map onto; most code
///  only ever looks at the first entry per name.
#[derive(Clone, PartialEq, Default)]
pub struct RpcValue {
    scalar: Option<Scalar>,
    children: BTreeMap<String, Vec<RpcValue>>,
}

impl RpcValue {
    pub fn empty() -> RpcValue {
        RpcValue::default()
    }

    pub fn of(scalar: Scalar) -> RpcValue {
        RpcValue {
            scalar: Some(scalar),
            children: Default::default(),
        }
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        self.scalar.as_ref()
    }

    pub fn set_scalar(&mut self, scalar: Scalar) {
        self.scalar = Some(scalar);
    }

    /// true if the value carries neither a scalar nor any children
    pub fn is_empty(&self) -> bool {
        self.scalar.is_none() && self.children.is_empty()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &[RpcValue])> {
        self.children.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn first_child(&self, name: &str) -> Option<&RpcValue> {
        self.children.get(name).and_then(|v| v.first())
    }

    /// replaces all values stored under `name` with the single given value
    pub fn set_child(&mut self, name: impl Into<String>, value: RpcValue) {
        self.children.insert(name.into(), vec![value]);
    }

    /// appends a value under `name`, keeping earlier ones
    pub fn push_child(&mut self, name: impl Into<String>, value: RpcValue) {
        self.children.entry(name.into()).or_default().push(value);
    }

    pub fn remove_child(&mut self, name: &str) -> Option<Vec<RpcValue>> {
        self.children.remove(name)
    }

    /// canonical textual rendering of the scalar, empty for a scalar-less node
    pub fn render(&self) -> String {
        self.scalar.as_ref().map(Scalar::render).unwrap_or_default()
    }
}

impl Debug for RpcValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.scalar, self.children.is_empty()) {
            (None, true) => write!(f, "(empty)"),
            (Some(s), true) => write!(f, "{:?}", s),
            (scalar, false) => {
                if let Some(s) = scalar {
                    write!(f, "{:?}", s)?;
                }
                f.debug_map().entries(self.children.iter()).finish()
            }
        }
    }
}

impl From<&str> for RpcValue {
    fn from(value: &str) -> Self {
        RpcValue::of(Scalar::Str(value.to_string()))
    }
}
impl From<String> for RpcValue {
    fn from(value: String) -> Self {
        RpcValue::of(Scalar::Str(value))
    }
}
impl From<i32> for RpcValue {
    fn from(value: i32) -> Self {
        RpcValue::of(Scalar::Int(value))
    }
}
impl From<i64> for RpcValue {
    fn from(value: i64) -> Self {
        RpcValue::of(Scalar::Long(value))
    }
}
impl From<f64> for RpcValue {
    fn from(value: f64) -> Self {
        RpcValue::of(Scalar::Double(value))
    }
}
impl From<bool> for RpcValue {
    fn from(value: bool) -> Self {
        RpcValue::of(Scalar::Bool(value))
    }
}
impl From<Bytes> for RpcValue {
    fn from(value: Bytes) -> Self {
        RpcValue::of(Scalar::Bytes(value))
    }
}
