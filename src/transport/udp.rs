use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::transport::{DatagramHandler, Transport, MAX_DATAGRAM_SIZE};

/// Plain UDP: datagrams go out unmodified and come in one handler call per packet.
///  Loss and reordering are the protocol layer's problem.
pub struct UdpTransport {
    socket: UdpSocket,
    cancel: Notify,
}

impl UdpTransport {
    pub async fn new(addr: SocketAddr) -> anyhow::Result<UdpTransport> {
        let socket = UdpSocket::bind(addr).await?;
        info!("bound udp socket to {:?}", socket.local_addr()?);
        Ok(UdpTransport {
            socket,
            cancel: Notify::new(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()> {
        self.socket.send_to(buf, to).await?;
        Ok(())
    }

    async fn recv_loop(&self, handler: Arc<dyn DatagramHandler>) -> anyhow::Result<()> {
        info!("starting receive loop");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            tokio::select! {
                _ = self.cancel.notified() => {
                    info!("shutting down receive loop");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (num_read, from) = match received {
                        Ok(x) => x,
                        Err(e) => {
                            error!("socket error: {}", e);
                            continue;
                        }
                    };
                    if num_read == MAX_DATAGRAM_SIZE {
                        warn!("received a datagram exceeding max size of {} bytes - skipping", MAX_DATAGRAM_SIZE);
                        continue;
                    }
                    handler.on_datagram(&buf[..num_read], from).await;
                }
            }
        }
    }

    fn cancel_recv_loop(&self) {
        // notify_one keeps a permit if the loop is not parked in its select yet
        self.cancel.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tokio::sync::mpsc;

    use super::*;

    struct ForwardingHandler {
        received: mpsc::Sender<(Vec<u8>, SocketAddr)>,
    }

    #[async_trait]
    impl DatagramHandler for ForwardingHandler {
        async fn on_datagram(&self, buf: &[u8], sender: SocketAddr) {
            self.received.send((buf.to_vec(), sender)).await.ok();
        }
    }

    fn any_local() -> SocketAddr {
        SocketAddr::from_str("127.0.0.1:0").unwrap()
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let sender = UdpTransport::new(any_local()).await.unwrap();
        let receiver = Arc::new(UdpTransport::new(any_local()).await.unwrap());
        let receiver_addr = receiver.local_addr().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        {
            let receiver = receiver.clone();
            tokio::spawn(async move {
                receiver.recv_loop(Arc::new(ForwardingHandler { received: tx })).await
            });
        }

        sender.send(receiver_addr, b"hello").await.unwrap();

        let (buf, from) = rx.recv().await.unwrap();
        assert_eq!(buf, b"hello");
        assert_eq!(from, sender.local_addr().unwrap());

        receiver.cancel_recv_loop();
    }

    #[tokio::test]
    async fn test_cancel_ends_recv_loop() {
        let transport = Arc::new(UdpTransport::new(any_local()).await.unwrap());

        let handle = {
            let transport = transport.clone();
            let (tx, _rx) = mpsc::channel(1);
            tokio::spawn(async move {
                transport.recv_loop(Arc::new(ForwardingHandler { received: tx })).await
            })
        };

        // let the loop reach its select before cancelling
        tokio::task::yield_now().await;
        transport.cancel_recv_loop();

        handle.await.unwrap().unwrap();
    }
}
