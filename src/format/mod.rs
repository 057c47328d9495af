mod json;
mod text;
mod xml;

use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::debug;

use crate::rpc::schema::RpcSchema;
use crate::rpc::value::RpcValue;

/// The negotiated payload serializations, keyed on the wire by their registered
///  content-format identifiers. Dispatch over this enum is exhaustive, so an
///  unsupported format is a compile-time impossibility rather than a stringly
///  typed runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum ContentFormat {
    TextPlain = 0,
    LinkFormat = 40,
    Xml = 41,
    OctetStream = 42,
    Exi = 47,
    Json = 50,
}

impl ContentFormat {
    pub fn name(self) -> &'static str {
        match self {
            ContentFormat::TextPlain => "text/plain",
            ContentFormat::LinkFormat => "application/link-format",
            ContentFormat::Xml => "application/xml",
            ContentFormat::OctetStream => "application/octet-stream",
            ContentFormat::Exi => "application/exi",
            ContentFormat::Json => "application/json",
        }
    }

    /// lookup by canonical name, case-insensitive
    pub fn from_name(name: &str) -> Option<ContentFormat> {
        let lower = name.to_lowercase();
        SUPPORTED.iter().find(|f| f.name() == lower).copied()
    }

    pub fn supported_names() -> impl Iterator<Item = &'static str> {
        SUPPORTED.iter().map(|f| f.name())
    }
}

const SUPPORTED: &[ContentFormat] = &[
    ContentFormat::TextPlain,
    ContentFormat::LinkFormat,
    ContentFormat::Xml,
    ContentFormat::OctetStream,
    ContentFormat::Exi,
    ContentFormat::Json,
];

/// Whether JSON numbers keep their integral types when decoding, or are flattened
///  to doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    #[default]
    Strict,
    Lenient,
}

/// Serializes a payload value into the given format. The operation name becomes the
///  root element for XML. Link-format is a known limitation and produces no bytes.
pub fn encode(value: &RpcValue, format: ContentFormat, operation: &str) -> anyhow::Result<Bytes> {
    match format {
        ContentFormat::TextPlain | ContentFormat::OctetStream | ContentFormat::Exi => {
            Ok(Bytes::from(value.render().into_bytes()))
        }
        ContentFormat::Xml => xml::encode(value, operation),
        ContentFormat::Json => json::encode(value),
        ContentFormat::LinkFormat => Ok(Bytes::new()),
    }
}

/// Deserializes a payload against the operation's declared schema.
///
/// An empty payload never fails: the first of {empty value, empty string, empty byte
///  sequence, untyped empty value} the schema accepts is returned. A non-empty payload
///  is parsed per format, then cast into the schema on a best-effort basis - a failing
///  cast keeps the uncast value rather than failing the decode.
pub fn decode(
    content: &[u8],
    format: ContentFormat,
    schema: RpcSchema,
    json_mode: JsonMode,
) -> anyhow::Result<RpcValue> {
    if content.is_empty() {
        return Ok(empty_fallback(schema));
    }

    let value = match format {
        ContentFormat::TextPlain | ContentFormat::OctetStream | ContentFormat::Exi | ContentFormat::LinkFormat => {
            text::parse(&String::from_utf8_lossy(content), schema)
        }
        ContentFormat::Xml => xml::decode(content)?,
        ContentFormat::Json => json::decode(content, json_mode)?,
    };

    match schema.cast(value.clone()) {
        Ok(cast) => Ok(cast),
        Err(e) => {
            debug!("decoded value does not fit the declared schema, keeping it uncast: {}", e);
            Ok(value)
        }
    }
}

fn empty_fallback(schema: RpcSchema) -> RpcValue {
    let candidates = [
        RpcValue::empty(),
        RpcValue::from(""),
        RpcValue::from(Bytes::new()),
    ];
    for candidate in candidates {
        if schema.accepts(&candidate) {
            return candidate;
        }
    }
    RpcValue::empty()
}
