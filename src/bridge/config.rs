use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::{error, warn};

use crate::coap::codes::{MessageCode, MessageType};
use crate::format::{ContentFormat, JsonMode};
use crate::rpc::schema::RpcSchema;

/// The remote endpoint a channel talks to, plus the static path part of its location.
#[derive(Debug, Clone)]
pub struct Location {
    pub host: String,
    pub port: u16,
    /// path component of the configured location, may be empty
    pub path: String,
}

impl Location {
    pub fn new(host: impl Into<String>, port: u16) -> Location {
        Location {
            host: host.into(),
            port,
            path: String::new(),
        }
    }
}

/// A configuration value that may be given numerically or symbolically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Int(i32),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationKind {
    /// request/response: the caller blocks until a correlated reply arrives
    #[default]
    RequestResponse,
    /// fire-and-forget: no application-level reply is ever produced on the wire
    OneWay,
}

/// Per-operation overrides. Everything is optional; the lookup methods on
///  [BridgeConfig] apply defaults and validate configured values, falling back with a
///  log message rather than failing the call.
#[derive(Debug, Clone, Default)]
pub struct OperationConfig {
    pub kind: OperationKind,
    pub message_type: Option<Param>,
    pub message_code: Option<Param>,
    pub content_format: Option<String>,
    /// path templates with `%{field}` / `%!{field}` placeholders, concatenated in order
    pub aliases: Vec<String>,
    pub proxy: bool,
    /// the declared shape of payloads exchanged for this operation
    pub schema: RpcSchema,
}

/// Channel-level configuration plus the per-operation table. Read-only once the channel
///  is up; the lookup methods never fail, they validate and default.
#[derive(Debug)]
pub struct BridgeConfig {
    pub location: Location,
    pub receive_timeout: Duration,
    pub debug: bool,
    pub json_encoding: JsonMode,
    pub operations: FxHashMap<String, OperationConfig>,
}

impl BridgeConfig {
    pub fn new(location: Location) -> BridgeConfig {
        BridgeConfig {
            location,
            receive_timeout: Duration::from_secs(30),
            debug: false,
            json_encoding: JsonMode::Strict,
            operations: Default::default(),
        }
    }

    pub fn operation(&self, operation: &str) -> Option<&OperationConfig> {
        self.operations.get(operation)
    }

    pub fn is_one_way(&self, operation: &str) -> bool {
        self.operation(operation)
            .map(|op| op.kind == OperationKind::OneWay)
            .unwrap_or(false)
    }

    pub fn proxy(&self, operation: &str) -> bool {
        self.operation(operation).map(|op| op.proxy).unwrap_or(false)
    }

    pub fn schema(&self, operation: &str) -> RpcSchema {
        self.operation(operation).map(|op| op.schema).unwrap_or_default()
    }

    pub fn aliases(&self, operation: &str) -> &[String] {
        self.operation(operation)
            .map(|op| op.aliases.as_slice())
            .unwrap_or(&[])
    }

    /// the wire message type for this operation, default non-confirmable
    pub fn message_type(&self, operation: &str) -> MessageType {
        let configured = match self.operation(operation).and_then(|op| op.message_type.as_ref()) {
            None => return MessageType::Non,
            Some(param) => param,
        };

        let parsed = match configured {
            Param::Int(n) => u8::try_from(*n).ok().and_then(|n| MessageType::try_from(n).ok()),
            Param::Str(s) => MessageType::from_name(s),
        };
        match parsed {
            Some(t) => t,
            None => {
                error!(
                    "message type {:?} configured for operation {} is not allowed, assuming default \"NON\"",
                    configured, operation
                );
                MessageType::Non
            }
        }
    }

    /// the wire message code for this operation and direction, default POST for
    ///  requests and CONTENT for responses
    pub fn message_code(&self, operation: &str, is_response: bool) -> MessageCode {
        let default = if is_response { MessageCode::Content } else { MessageCode::Post };

        let configured = match self.operation(operation).and_then(|op| op.message_code.as_ref()) {
            None => return default,
            Some(param) => param,
        };

        let parsed = match configured {
            Param::Int(n) => u8::try_from(*n).ok().and_then(|n| MessageCode::try_from(n).ok()),
            Param::Str(s) => MessageCode::from_name(s),
        };
        match parsed {
            Some(code) => code,
            None => {
                error!(
                    "message code {:?} configured for operation {} is not supported, assuming default {}",
                    configured,
                    operation,
                    default.name()
                );
                default
            }
        }
    }

    /// the negotiated content format for this operation, default text/plain
    pub fn content_format(&self, operation: &str) -> ContentFormat {
        let configured = match self.operation(operation).and_then(|op| op.content_format.as_deref()) {
            None => return ContentFormat::TextPlain,
            Some(name) => name,
        };

        match ContentFormat::from_name(configured) {
            Some(format) => format,
            None => {
                let supported = ContentFormat::supported_names().collect::<Vec<_>>().join(", ");
                warn!(
                    "content format {:?} configured for operation {} is not supported, \
                     using \"text/plain\" instead. supported formats are: {}",
                    configured, operation, supported
                );
                ContentFormat::TextPlain
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config_with(operation: &str, op_config: OperationConfig) -> BridgeConfig {
        let mut config = BridgeConfig::new(Location::new("127.0.0.1", 5683));
        config.operations.insert(operation.to_string(), op_config);
        config
    }

    #[rstest]
    #[case::unconfigured(None, MessageType::Non)]
    #[case::by_name(Some(Param::Str("CON".to_string())), MessageType::Con)]
    #[case::by_number(Some(Param::Int(0)), MessageType::Con)]
    #[case::invalid_name(Some(Param::Str("XXL".to_string())), MessageType::Non)]
    #[case::invalid_number(Some(Param::Int(77)), MessageType::Non)]
    #[case::negative_number(Some(Param::Int(-1)), MessageType::Non)]
    fn test_message_type(#[case] configured: Option<Param>, #[case] expected: MessageType) {
        let config = config_with("op", OperationConfig {
            message_type: configured,
            ..Default::default()
        });
        assert_eq!(config.message_type("op"), expected);
        assert_eq!(config.message_type("other"), MessageType::Non);
    }

    #[rstest]
    #[case::request_default(None, false, MessageCode::Post)]
    #[case::response_default(None, true, MessageCode::Content)]
    #[case::by_name(Some(Param::Str("put".to_string())), false, MessageCode::Put)]
    #[case::by_number(Some(Param::Int(69)), false, MessageCode::Content)]
    #[case::invalid_name(Some(Param::Str("TEAPOT".to_string())), false, MessageCode::Post)]
    #[case::invalid_number(Some(Param::Int(42)), true, MessageCode::Content)]
    fn test_message_code(
        #[case] configured: Option<Param>,
        #[case] is_response: bool,
        #[case] expected: MessageCode,
    ) {
        let config = config_with("op", OperationConfig {
            message_code: configured,
            ..Default::default()
        });
        assert_eq!(config.message_code("op", is_response), expected);
    }

    #[rstest]
    #[case::unconfigured(None, ContentFormat::TextPlain)]
    #[case::json(Some("application/json"), ContentFormat::Json)]
    #[case::case_insensitive(Some("Application/XML"), ContentFormat::Xml)]
    #[case::unsupported(Some("application/cbor"), ContentFormat::TextPlain)]
    fn test_content_format(#[case] configured: Option<&str>, #[case] expected: ContentFormat) {
        let config = config_with("op", OperationConfig {
            content_format: configured.map(str::to_string),
            ..Default::default()
        });
        assert_eq!(config.content_format("op"), expected);
    }

    #[test]
    fn test_one_way_membership() {
        let config = config_with("notify", OperationConfig {
            kind: OperationKind::OneWay,
            ..Default::default()
        });
        assert!(config.is_one_way("notify"));
        assert!(!config.is_one_way("getTemp"));
    }
}
