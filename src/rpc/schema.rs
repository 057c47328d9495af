use anyhow::{anyhow, bail};

use crate::rpc::value::{RpcValue, Scalar};

/// The expected shape of a decoded payload, as declared per operation. The content codecs
///  consult this while decoding to pick between ambiguous textual representations (is `"1"`
///  a string, a bool, or a number?), and for the final cast after structured decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RpcSchema {
    /// accepts anything, never forces a conversion
    #[default]
    Any,
    /// accepts only scalar-less values
    Void,
    Str,
    Int,
    Long,
    Double,
    Bool,
    Bytes,
}

impl RpcSchema {
    /// shallow check: does the value's scalar kind match this schema?
    pub fn accepts(&self, value: &RpcValue) -> bool {
        match self {
            RpcSchema::Any => true,
            RpcSchema::Void => value.scalar().is_none(),
            RpcSchema::Str => matches!(value.scalar(), Some(Scalar::Str(_))),
            RpcSchema::Int => matches!(value.scalar(), Some(Scalar::Int(_))),
            RpcSchema::Long => matches!(value.scalar(), Some(Scalar::Long(_))),
            RpcSchema::Double => matches!(value.scalar(), Some(Scalar::Double(_))),
            RpcSchema::Bool => matches!(value.scalar(), Some(Scalar::Bool(_))),
            RpcSchema::Bytes => matches!(value.scalar(), Some(Scalar::Bytes(_))),
        }
    }

    /// Converts the value's scalar into this schema's kind where a lossless or textual
    ///  conversion exists, keeping children untouched. Fails where no sensible conversion
    ///  is defined, leaving it to the caller to decide whether that is fatal.
    pub fn cast(&self, mut value: RpcValue) -> anyhow::Result<RpcValue> {
        if self.accepts(&value) {
            return Ok(value);
        }

        let scalar = match (self, value.scalar()) {
            (RpcSchema::Void, Some(_)) => bail!("value has content where none is expected"),
            (_, None) => bail!("value has no content to convert"),
            (RpcSchema::Str, Some(s)) => Scalar::Str(s.render()),
            (RpcSchema::Int, Some(s)) => Scalar::Int(cast_to_i64(s)?
                .try_into()
                .map_err(|_| anyhow!("value out of int range"))?),
            (RpcSchema::Long, Some(s)) => Scalar::Long(cast_to_i64(s)?),
            (RpcSchema::Double, Some(s)) => Scalar::Double(match s {
                Scalar::Int(n) => *n as f64,
                Scalar::Long(n) => *n as f64,
                Scalar::Str(s) => s.parse()?,
                Scalar::Bool(b) => if *b { 1.0 } else { 0.0 },
                _ => bail!("cannot convert {:?} to double", s),
            }),
            (RpcSchema::Bool, Some(s)) => Scalar::Bool(match s {
                Scalar::Int(0) | Scalar::Long(0) => false,
                Scalar::Int(_) | Scalar::Long(_) => true,
                Scalar::Str(s) => s.parse()?,
                _ => bail!("cannot convert {:?} to bool", s),
            }),
            (RpcSchema::Bytes, Some(Scalar::Str(s))) => Scalar::Bytes(s.clone().into_bytes().into()),
            (schema, Some(s)) => bail!("cannot convert {:?} to {:?}", s, schema),
        };

        value.set_scalar(scalar);
        Ok(value)
    }
}

fn cast_to_i64(scalar: &Scalar) -> anyhow::Result<i64> {
    match scalar {
        Scalar::Int(n) => Ok(*n as i64),
        Scalar::Long(n) => Ok(*n),
        Scalar::Str(s) => Ok(s.parse()?),
        Scalar::Bool(b) => Ok(if *b { 1 } else { 0 }),
        Scalar::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
        s => bail!("cannot convert {:?} to an integer", s),
    }
}
