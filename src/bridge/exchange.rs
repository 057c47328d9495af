use std::sync::Arc;

use anyhow::bail;
use tracing::{debug, warn};

use crate::bridge::alias::{self, AliasRegistry};
use crate::bridge::config::BridgeConfig;
use crate::coap::codes::MessageType;
use crate::coap::message::CoapMessage;
use crate::coap::token::Token;
use crate::format;
use crate::rpc::message::{FaultKind, RpcFault, RpcMessage};
use crate::rpc::value::RpcValue;

/// Which end of a call this channel terminates: `Output` issues requests and awaits
///  responses, `Input` receives requests and produces responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// The correlation state of the one in-flight request on an output channel.
#[derive(Debug)]
struct Exchange {
    request: RpcMessage,
    message_id: u16,
    token: Token,
}

/// Correlation key of the request an input channel is currently serving, kept for the
///  eventual response. One-way requests need no token.
#[derive(Debug)]
struct InboundRequest {
    message_id: u16,
    token: Option<Token>,
}

/// The result of translating an outbound RPC message: the wire message to transmit,
///  and possibly a reply that is complete before anything hits the wire (a one-way
///  non-confirmable call expects no acknowledgement at all).
#[derive(Debug)]
pub struct OutboundMessage {
    pub message: CoapMessage,
    pub immediate_reply: Option<RpcMessage>,
}

/// The protocol state machine of one channel: translates between RPC and wire messages
///  in both directions and matches inbound messages against the single in-flight
///  exchange.
///
/// All state is private to the owning channel; the correlator itself does no I/O.
pub struct ExchangeCorrelator {
    direction: Direction,
    config: Arc<BridgeConfig>,
    aliases: AliasRegistry,
    pending: Option<Exchange>,
    inbound: Option<InboundRequest>,
}

impl ExchangeCorrelator {
    pub fn new(direction: Direction, config: Arc<BridgeConfig>) -> ExchangeCorrelator {
        ExchangeCorrelator {
            direction,
            aliases: AliasRegistry::new(&config),
            config,
            pending: None,
            inbound: None,
        }
    }

    pub fn encode(&mut self, rpc: &RpcMessage) -> anyhow::Result<OutboundMessage> {
        match self.direction {
            Direction::Output => self.encode_request(rpc),
            Direction::Input => self.encode_response(rpc),
        }
    }

    pub fn decode(&mut self, msg: &CoapMessage) -> RpcMessage {
        match self.direction {
            Direction::Output => self.decode_response(msg),
            Direction::Input => self.decode_request(msg),
        }
    }

    /// Clears the in-flight exchange, returning a timeout fault for the caller that was
    ///  waiting on it.
    pub fn abort_pending(&mut self) -> Option<RpcMessage> {
        self.pending.take().map(|exchange| {
            RpcMessage::fault(
                exchange.request.id,
                exchange.request.operation,
                RpcFault::new(FaultKind::Timeout, "no matching message arrived in time"),
            )
        })
    }

    fn encode_request(&mut self, rpc: &RpcMessage) -> anyhow::Result<OutboundMessage> {
        if self.pending.is_some() {
            bail!("an exchange is already in flight on this channel");
        }

        let operation = rpc.operation.as_str();
        let one_way = self.config.is_one_way(operation);
        let msg_type = self.config.message_type(operation);
        let code = self.config.message_code(operation, false);

        // alias substitution works on a copy: consumed fields must not show up in the
        // encoded content, but the caller's message stays untouched
        let mut value = rpc.value.clone();
        let target = alias::resolve_target(&self.config, operation, &mut value)?;

        let mut msg = CoapMessage::new(msg_type, code);
        if self.config.proxy(operation) {
            msg.proxy_uri = Some(target.uri);
        } else {
            msg.path = Some(target.path);
        }

        // a confirmable one-way notification is correlated by message id alone
        if !(one_way && msg_type == MessageType::Con) {
            msg.token = Token::random();
        }

        if code.allows_content() {
            let payload = payload_value(rpc, value);
            if !payload.is_empty() {
                let content_format = self.config.content_format(operation);
                let content = format::encode(&payload, content_format, operation)?;
                msg.set_content(content, content_format);
            }
        }

        let immediate_reply = if one_way && msg_type == MessageType::Non {
            // no wire-level acknowledgement is expected for this combination, the
            // caller gets its empty reply right away
            Some(RpcMessage::response(rpc, RpcValue::empty()))
        } else {
            self.pending = Some(Exchange {
                request: rpc.clone(),
                message_id: msg.message_id,
                token: msg.token,
            });
            None
        };

        if self.config.debug {
            debug!("sending request {:?}", msg);
        }
        Ok(OutboundMessage { message: msg, immediate_reply })
    }

    fn encode_response(&mut self, rpc: &RpcMessage) -> anyhow::Result<OutboundMessage> {
        let inbound = match self.inbound.take() {
            Some(inbound) => inbound,
            None => bail!("no inbound request to correlate the response with"),
        };

        let operation = rpc.operation.as_str();
        if self.config.is_one_way(operation) {
            if self.config.debug {
                debug!("acknowledging one-way request with message id {}", inbound.message_id);
            }
            return Ok(OutboundMessage {
                message: CoapMessage::empty_ack(inbound.message_id),
                immediate_reply: None,
            });
        }

        let code = self.config.message_code(operation, true);
        let mut msg = CoapMessage::new(MessageType::Non, code);
        msg.token = inbound.token.unwrap_or(Token::EMPTY);

        if code.allows_content() {
            let payload = payload_value(rpc, rpc.value.clone());
            if !payload.is_empty() {
                let content_format = self.config.content_format(operation);
                let content = format::encode(&payload, content_format, operation)?;
                msg.set_content(content, content_format);
            }
        }

        if self.config.debug {
            debug!("sending response {:?}", msg);
        }
        Ok(OutboundMessage { message: msg, immediate_reply: None })
    }

    fn decode_request(&mut self, msg: &CoapMessage) -> RpcMessage {
        let operation = self.aliases.operation_for(msg.path.as_deref());

        let mut fault = None;
        let value = if msg.code.allows_content() && msg.has_content() {
            match self.decode_content(msg, &operation) {
                Ok(value) => value,
                Err(e) => {
                    warn!("failed to decode content of inbound request: {}", e);
                    fault = Some(RpcFault::new(
                        FaultKind::Decode,
                        format!("error decoding request content: {}", e),
                    ));
                    RpcValue::empty()
                }
            }
        } else {
            RpcValue::empty()
        };

        self.inbound = Some(InboundRequest {
            message_id: msg.message_id,
            token: if self.config.is_one_way(&operation) { None } else { Some(msg.token) },
        });
        if self.config.debug {
            debug!("stored correlation for inbound request: id {}, token {:?}", msg.message_id, msg.token);
        }

        let mut request = RpcMessage::request(operation, "/", value);
        request.fault = fault;
        request
    }

    /// The 4-way match of an inbound message against the in-flight exchange, in
    ///  precedence order: piggyback response, separate response, bare acknowledgement,
    ///  correlation fault. Every branch produces a terminal message for the caller.
    fn decode_response(&mut self, msg: &CoapMessage) -> RpcMessage {
        let exchange = match self.pending.take() {
            Some(exchange) => exchange,
            None => {
                warn!("received {:?} with no exchange in flight", msg);
                return RpcMessage::fault(
                    0,
                    String::new(),
                    RpcFault::new(FaultKind::Correlation, "no exchange is in flight on this channel"),
                );
            }
        };

        // content is decoded up front: a malformed payload terminates the exchange no
        // matter how the message would have matched
        let value = if msg.code.allows_content() && msg.has_content() {
            match self.decode_content(msg, &exchange.request.operation) {
                Ok(value) => value,
                Err(e) => {
                    warn!("failed to decode content of inbound response: {}", e);
                    return RpcMessage::fault(
                        exchange.request.id,
                        exchange.request.operation,
                        RpcFault::new(FaultKind::Decode, format!("error decoding response content: {}", e)),
                    );
                }
            }
        } else {
            RpcValue::empty()
        };

        let id_matches = msg.message_id == exchange.message_id;
        let token_matches = msg.token == exchange.token;

        if msg.is_ack() && id_matches && token_matches {
            if self.config.debug {
                debug!("piggyback response for message id {}", msg.message_id);
            }
            return RpcMessage::response(&exchange.request, value);
        }

        if msg.is_response() && token_matches {
            if self.config.debug {
                debug!("separate response for token {:?}", msg.token);
            }
            return RpcMessage::response(&exchange.request, value);
        }

        if msg.is_ack() && id_matches {
            if self.config.debug {
                debug!("bare acknowledgement for message id {}", msg.message_id);
            }
            let notification = RpcMessage {
                id: exchange.request.id,
                operation: exchange.request.operation.clone(),
                path: "/".to_string(),
                value,
                fault: None,
            };
            // for a request/response operation the actual response is still to come,
            // only a one-way exchange ends here
            if !self.config.is_one_way(&notification.operation) {
                self.pending = Some(exchange);
            }
            return notification;
        }

        warn!(
            "received {:?} matching neither message id {} nor token {:?} of the exchange in flight",
            msg, exchange.message_id, exchange.token
        );
        RpcMessage::fault(
            exchange.request.id,
            exchange.request.operation,
            RpcFault::new(FaultKind::Correlation, "inbound message does not match the exchange in flight"),
        )
    }

    fn decode_content(&self, msg: &CoapMessage, operation: &str) -> anyhow::Result<RpcValue> {
        let content_format = msg
            .content_format
            .unwrap_or_else(|| self.config.content_format(operation));
        format::decode(
            &msg.content,
            content_format,
            self.config.schema(operation),
            self.config.json_encoding,
        )
    }
}

/// a fault-carrying message encodes its fault text, everything else its value
fn payload_value(rpc: &RpcMessage, value: RpcValue) -> RpcValue {
    match &rpc.fault {
        Some(fault) => RpcValue::from(fault.message.as_str()),
        None => value,
    }
}
