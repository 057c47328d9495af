use num_enum::{IntoPrimitive, TryFromPrimitive};

/// CoAP message type at the transport-retransmission layer. Confirmable messages are
///  acknowledged on the wire, non-confirmable ones are fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
    Con = 0,
    Non = 1,
    Ack = 2,
    Rst = 3,
}

impl MessageType {
    /// the symbolic names accepted in configuration
    pub fn from_name(name: &str) -> Option<MessageType> {
        match name {
            "CON" => Some(MessageType::Con),
            "NON" => Some(MessageType::Non),
            "ACK" => Some(MessageType::Ack),
            "RST" => Some(MessageType::Rst),
            _ => None,
        }
    }
}

/// Request verbs and response status codes, sharing a single numeric code registry:
///  1-4 are request verbs, 65+ are response statuses, 128+ are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageCode {
    Empty = 0,
    Get = 1,
    Post = 2,
    Put = 3,
    Delete = 4,
    Created = 65,
    Deleted = 66,
    Valid = 67,
    Changed = 68,
    Content = 69,
    Continue = 95,
    BadRequest = 128,
    Unauthorized = 129,
    BadOption = 130,
    Forbidden = 131,
    NotFound = 132,
    MethodNotAllowed = 133,
    NotAcceptable = 134,
    RequestEntityIncomplete = 136,
    PreconditionFailed = 140,
    RequestEntityTooLarge = 141,
    UnsupportedContentFormat = 143,
    InternalServerError = 160,
    NotImplemented = 161,
    BadGateway = 162,
    ServiceUnavailable = 163,
    GatewayTimeout = 164,
    ProxyingNotSupported = 165,
}

impl MessageCode {
    pub fn is_request(self) -> bool {
        (1..5).contains(&u8::from(self))
    }

    pub fn is_response(self) -> bool {
        u8::from(self) >= 5
    }

    pub fn is_error(self) -> bool {
        u8::from(self) >= 128
    }

    /// GET and DELETE are parameterless; everything else may carry content
    pub fn allows_content(self) -> bool {
        !matches!(self, MessageCode::Get | MessageCode::Delete)
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageCode::Empty => "EMPTY",
            MessageCode::Get => "GET",
            MessageCode::Post => "POST",
            MessageCode::Put => "PUT",
            MessageCode::Delete => "DELETE",
            MessageCode::Created => "CREATED",
            MessageCode::Deleted => "DELETED",
            MessageCode::Valid => "VALID",
            MessageCode::Changed => "CHANGED",
            MessageCode::Content => "CONTENT",
            MessageCode::Continue => "CONTINUE",
            MessageCode::BadRequest => "BAD_REQUEST",
            MessageCode::Unauthorized => "UNAUTHORIZED",
            MessageCode::BadOption => "BAD_OPTION",
            MessageCode::Forbidden => "FORBIDDEN",
            MessageCode::NotFound => "NOT_FOUND",
            MessageCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            MessageCode::NotAcceptable => "NOT_ACCEPTABLE",
            MessageCode::RequestEntityIncomplete => "REQUEST_ENTITY_INCOMPLETE",
            MessageCode::PreconditionFailed => "PRECONDITION_FAILED",
            MessageCode::RequestEntityTooLarge => "REQUEST_ENTITY_TOO_LARGE",
            MessageCode::UnsupportedContentFormat => "UNSUPPORTED_CONTENT_FORMAT",
            MessageCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            MessageCode::NotImplemented => "NOT_IMPLEMENTED",
            MessageCode::BadGateway => "BAD_GATEWAY",
            MessageCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            MessageCode::GatewayTimeout => "GATEWAY_TIMEOUT",
            MessageCode::ProxyingNotSupported => "PROXYING_NOT_SUPPORTED",
        }
    }

    /// the symbolic names accepted in configuration, matched case-insensitively
    pub fn from_name(name: &str) -> Option<MessageCode> {
        let upper = name.to_uppercase();
        ALL_CODES.iter().find(|c| c.name() == upper).copied()
    }
}

const ALL_CODES: &[MessageCode] = &[
    MessageCode::Empty,
    MessageCode::Get,
    MessageCode::Post,
    MessageCode::Put,
    MessageCode::Delete,
    MessageCode::Created,
    MessageCode::Deleted,
    MessageCode::Valid,
    MessageCode::Changed,
    MessageCode::Content,
    MessageCode::Continue,
    MessageCode::BadRequest,
    MessageCode::Unauthorized,
    MessageCode::BadOption,
    MessageCode::Forbidden,
    MessageCode::NotFound,
    MessageCode::MethodNotAllowed,
    MessageCode::NotAcceptable,
    MessageCode::RequestEntityIncomplete,
    MessageCode::PreconditionFailed,
    MessageCode::RequestEntityTooLarge,
    MessageCode::UnsupportedContentFormat,
    MessageCode::InternalServerError,
    MessageCode::NotImplemented,
    MessageCode::BadGateway,
    MessageCode::ServiceUnavailable,
    MessageCode::GatewayTimeout,
    MessageCode::ProxyingNotSupported,
];

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::con("CON", Some(MessageType::Con))]
    #[case::non("NON", Some(MessageType::Non))]
    #[case::ack("ACK", Some(MessageType::Ack))]
    #[case::rst("RST", Some(MessageType::Rst))]
    #[case::lowercase("con", None)]
    #[case::garbage("XYZ", None)]
    fn test_message_type_from_name(#[case] name: &str, #[case] expected: Option<MessageType>) {
        assert_eq!(MessageType::from_name(name), expected);
    }

    #[rstest]
    #[case::get(MessageCode::Get, true, false, false)]
    #[case::post(MessageCode::Post, true, false, false)]
    #[case::content(MessageCode::Content, false, true, false)]
    #[case::not_found(MessageCode::NotFound, false, true, true)]
    #[case::empty(MessageCode::Empty, false, false, false)]
    fn test_code_predicates(
        #[case] code: MessageCode,
        #[case] is_request: bool,
        #[case] is_response: bool,
        #[case] is_error: bool,
    ) {
        assert_eq!(code.is_request(), is_request);
        assert_eq!(code.is_response(), is_response);
        assert_eq!(code.is_error(), is_error);
    }

    #[rstest]
    #[case::get(MessageCode::Get, false)]
    #[case::delete(MessageCode::Delete, false)]
    #[case::post(MessageCode::Post, true)]
    #[case::put(MessageCode::Put, true)]
    #[case::empty(MessageCode::Empty, true)]
    #[case::content(MessageCode::Content, true)]
    fn test_allows_content(#[case] code: MessageCode, #[case] expected: bool) {
        assert_eq!(code.allows_content(), expected);
    }

    #[rstest]
    #[case::post("POST", Some(MessageCode::Post))]
    #[case::lowercase("content", Some(MessageCode::Content))]
    #[case::unknown("TEAPOT", None)]
    fn test_code_from_name(#[case] name: &str, #[case] expected: Option<MessageCode>) {
        assert_eq!(MessageCode::from_name(name), expected);
    }

    #[test]
    fn test_code_from_numeric() {
        assert_eq!(MessageCode::try_from(69u8), Ok(MessageCode::Content));
        assert!(MessageCode::try_from(42u8).is_err());
    }
}
