use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::transport::{DatagramHandler, Transport};

/// One side of an in-memory datagram link: everything sent here is delivered to the
///  other side's receive loop, in order and without loss. Useful for running two
///  channels against each other without sockets.
pub struct InMemoryTransport {
    local_addr: SocketAddr,
    outbound: mpsc::Sender<(Vec<u8>, SocketAddr)>,
    inbound: Mutex<mpsc::Receiver<(Vec<u8>, SocketAddr)>>,
    cancel: Notify,
}

/// two linked transports with the given local addresses
pub fn in_memory_pair(addr_a: SocketAddr, addr_b: SocketAddr) -> (InMemoryTransport, InMemoryTransport) {
    let (tx_to_b, rx_at_b) = mpsc::channel(16);
    let (tx_to_a, rx_at_a) = mpsc::channel(16);

    let a = InMemoryTransport {
        local_addr: addr_a,
        outbound: tx_to_b,
        inbound: Mutex::new(rx_at_a),
        cancel: Notify::new(),
    };
    let b = InMemoryTransport {
        local_addr: addr_b,
        outbound: tx_to_a,
        inbound: Mutex::new(rx_at_b),
        cancel: Notify::new(),
    };
    (a, b)
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, _to: SocketAddr, buf: &[u8]) -> anyhow::Result<()> {
        self.outbound
            .send((buf.to_vec(), self.local_addr))
            .await
            .map_err(|_| anyhow!("peer transport is gone"))
    }

    async fn recv_loop(&self, handler: Arc<dyn DatagramHandler>) -> anyhow::Result<()> {
        let mut inbound = self.inbound.lock().await;
        loop {
            tokio::select! {
                _ = self.cancel.notified() => {
                    return Ok(());
                }
                received = inbound.recv() => {
                    match received {
                        Some((buf, from)) => handler.on_datagram(&buf, from).await,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    fn cancel_recv_loop(&self) {
        self.cancel.notify_one();
    }
}
