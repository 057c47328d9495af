pub mod codes;
pub mod message;
pub mod token;

use bytes::Bytes;
#[cfg(test)] use mockall::automock;

use crate::coap::message::CoapMessage;

/// Boundary to the external wire-format library: turns structured messages into the
///  binary header/option/token layout and back. The bridge never looks inside the bytes.
#[cfg_attr(test, automock)]
pub trait WireCodec: Send + Sync + 'static {
    fn encode(&self, msg: &CoapMessage) -> anyhow::Result<Bytes>;

    fn decode(&self, buf: &[u8]) -> anyhow::Result<CoapMessage>;
}
