pub mod udp;

use std::net::SocketAddr;
use std::sync::Arc;

#[cfg(test)] use mockall::automock;

/// Datagrams larger than this are assumed to be truncated and are skipped.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024; //TODO make this configurable

/// Boundary to the async I/O layer: accepts byte buffers to send and delivers
///  already-framed inbound datagrams to a handler. Retransmission timers and socket
///  strategy live behind this trait.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Transport: Sync + Send {
    async fn send(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()>;

    async fn recv_loop(&self, handler: Arc<dyn DatagramHandler>) -> anyhow::Result<()>;

    fn cancel_recv_loop(&self);
}

/// This trait decouples the transport implementation from the handling of a delivered
///  datagram. It is passed around as an `Arc<dyn ...>` to minimize dependencies of
///  [Transport] implementations.
#[async_trait::async_trait]
pub trait DatagramHandler: Sync + Send {
    async fn on_datagram(&self, buf: &[u8], sender: SocketAddr);
}
