use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rpc::value::RpcValue;

/// Failure classes that are surfaced to a waiting caller instead of a regular response.
///  These unblock the call with a diagnosable result; they are never silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// an inbound wire message matched no pending exchange
    Correlation,
    /// the content could not be decoded in its declared format
    Decode,
    /// no matching wire message arrived within the configured bound
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFault {
    pub kind: FaultKind,
    pub message: String,
}

impl RpcFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> RpcFault {
        RpcFault {
            kind,
            message: message.into(),
        }
    }
}

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// The transport-agnostic message abstraction of the host runtime: an operation name, a
///  resource path (conventionally `/`), a typed payload value, a call id for matching
///  requests to responses, and an optional fault.
#[derive(Clone, PartialEq)]
pub struct RpcMessage {
    pub id: u64,
    pub operation: String,
    pub path: String,
    pub value: RpcValue,
    pub fault: Option<RpcFault>,
}

impl RpcMessage {
    /// a fresh request with a process-unique call id
    pub fn request(operation: impl Into<String>, path: impl Into<String>, value: RpcValue) -> RpcMessage {
        RpcMessage {
            id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            operation: operation.into(),
            path: path.into(),
            value,
            fault: None,
        }
    }

    /// a successful response to the given request, carrying its call id
    pub fn response(request: &RpcMessage, value: RpcValue) -> RpcMessage {
        RpcMessage {
            id: request.id,
            operation: request.operation.clone(),
            path: "/".to_string(),
            value,
            fault: None,
        }
    }

    pub fn fault(id: u64, operation: impl Into<String>, fault: RpcFault) -> RpcMessage {
        RpcMessage {
            id,
            operation: operation.into(),
            path: "/".to_string(),
            value: RpcValue::empty(),
            fault: Some(fault),
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

impl Debug for RpcMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RpcMessage{{#{} {}@{}", self.id, self.operation, self.path)?;
        if let Some(fault) = &self.fault {
            write!(f, " fault:{:?}({})", fault.kind, fault.message)?;
        }
        write!(f, " {:?}}}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RpcMessage::request("op", "/", RpcValue::empty());
        let b = RpcMessage::request("op", "/", RpcValue::empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_response_copies_request_id() {
        let request = RpcMessage::request("getTemp", "/", RpcValue::empty());
        let response = RpcMessage::response(&request, RpcValue::from(21));

        assert_eq!(response.id, request.id);
        assert_eq!(response.operation, "getTemp");
        assert_eq!(response.path, "/");
        assert!(!response.is_fault());
    }

    #[test]
    fn test_fault() {
        let msg = RpcMessage::fault(17, "getTemp", RpcFault::new(FaultKind::Timeout, "no response"));
        assert!(msg.is_fault());
        assert_eq!(msg.fault.as_ref().unwrap().kind, FaultKind::Timeout);
    }
}
