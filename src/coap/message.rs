use std::fmt::{Debug, Formatter};

use bytes::Bytes;

use crate::coap::codes::{MessageCode, MessageType};
use crate::coap::token::Token;
use crate::format::ContentFormat;

/// The structured view of one wire message, as produced and consumed by an external
///  binary codec. Header layout, option encoding and token framing are that codec's
///  business; this type only carries the decoded fields the bridge correlates on.
#[derive(Clone, PartialEq)]
pub struct CoapMessage {
    pub msg_type: MessageType,
    pub code: MessageCode,
    pub message_id: u16,
    pub token: Token,
    /// the URI path option, with its leading separator
    pub path: Option<String>,
    /// the proxy-uri option; set instead of the path when the request goes through a proxy
    pub proxy_uri: Option<String>,
    pub content: Bytes,
    pub content_format: Option<ContentFormat>,
}

impl CoapMessage {
    /// a message with a freshly rolled message id and no token, path or content
    pub fn new(msg_type: MessageType, code: MessageCode) -> CoapMessage {
        CoapMessage {
            msg_type,
            code,
            message_id: rand::random(),
            token: Token::EMPTY,
            path: None,
            proxy_uri: None,
            content: Bytes::new(),
            content_format: None,
        }
    }

    /// the bare transport-level acknowledgement for a previously received message id
    pub fn empty_ack(message_id: u16) -> CoapMessage {
        CoapMessage {
            msg_type: MessageType::Ack,
            code: MessageCode::Empty,
            message_id,
            token: Token::EMPTY,
            path: None,
            proxy_uri: None,
            content: Bytes::new(),
            content_format: None,
        }
    }

    pub fn is_ack(&self) -> bool {
        self.msg_type == MessageType::Ack
    }

    pub fn is_request(&self) -> bool {
        self.code.is_request()
    }

    pub fn is_response(&self) -> bool {
        self.code.is_response()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn set_content(&mut self, content: Bytes, format: ContentFormat) {
        self.content = content;
        self.content_format = Some(format);
    }
}

impl Debug for CoapMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CoapMessage{{{:?} {} id:{} token:{:?}",
            self.msg_type,
            self.code.name(),
            self.message_id,
            self.token,
        )?;
        if let Some(path) = &self.path {
            write!(f, " path:{}", path)?;
        }
        if self.has_content() {
            write!(f, " content:{} bytes", self.content.len())?;
            if let Some(format) = self.content_format {
                write!(f, " ({})", format.name())?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ack() {
        let ack = CoapMessage::empty_ack(0x1234);
        assert!(ack.is_ack());
        assert!(!ack.is_request());
        assert!(!ack.is_response());
        assert_eq!(ack.message_id, 0x1234);
        assert_eq!(ack.code, MessageCode::Empty);
        assert!(!ack.has_content());
    }

    #[test]
    fn test_request_predicates() {
        let msg = CoapMessage::new(MessageType::Non, MessageCode::Post);
        assert!(msg.is_request());
        assert!(!msg.is_response());
        assert!(!msg.is_ack());
    }

    #[test]
    fn test_set_content() {
        let mut msg = CoapMessage::new(MessageType::Non, MessageCode::Content);
        msg.set_content(Bytes::from_static(b"21"), ContentFormat::TextPlain);
        assert!(msg.has_content());
        assert_eq!(msg.content_format, Some(ContentFormat::TextPlain));
    }
}
