use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{trace, warn};

use crate::bridge::config::BridgeConfig;
use crate::bridge::exchange::{Direction, ExchangeCorrelator};
use crate::coap::message::CoapMessage;
use crate::coap::WireCodec;
use crate::rpc::message::{FaultKind, RpcFault, RpcMessage};
use crate::transport::{DatagramHandler, Transport};

/// The one-shot hand-off between the transport's delivery callback and a blocked
///  caller. Completing without an armed pair buffers the message in a fresh one, so a
///  delivery can never race a late `receive` into a lost message.
#[derive(Default)]
struct CompletionSlot {
    tx: Option<oneshot::Sender<RpcMessage>>,
    rx: Option<oneshot::Receiver<RpcMessage>>,
}

/// Bridges asynchronous datagram delivery into the blocking one-call-at-a-time contract
///  of the host runtime: `send` hands one translated message to the transport,
///  `receive` blocks until exactly one decoded RPC message is available.
///
/// One instance serves one request/response exchange at a time against one peer.
pub struct BridgeChannel {
    peer: SocketAddr,
    correlator: Mutex<ExchangeCorrelator>,
    transport: Arc<dyn Transport>,
    wire_codec: Arc<dyn WireCodec>,
    completion: StdMutex<CompletionSlot>,
    receive_timeout: Duration,
}

impl BridgeChannel {
    pub fn new(
        direction: Direction,
        config: Arc<BridgeConfig>,
        peer: SocketAddr,
        transport: Arc<dyn Transport>,
        wire_codec: Arc<dyn WireCodec>,
    ) -> BridgeChannel {
        BridgeChannel {
            peer,
            receive_timeout: config.receive_timeout,
            correlator: Mutex::new(ExchangeCorrelator::new(direction, config)),
            transport,
            wire_codec,
            completion: StdMutex::new(CompletionSlot::default()),
        }
    }

    /// Translates and transmits one outbound RPC message. Returns once the transport
    ///  has accepted the datagram; protocol-level correlation happens in [Self::receive].
    pub async fn send(&self, rpc: &RpcMessage) -> anyhow::Result<()> {
        let outbound = self.correlator.lock().await.encode(rpc)?;

        // the completion slot is armed before anything hits the wire, so even an
        // immediately delivered reply finds it
        self.arm();

        let buf = self.wire_codec.encode(&outbound.message)?;
        self.transport.send(self.peer, &buf).await?;
        trace!("transmitted {} bytes to {:?}", buf.len(), self.peer);

        if let Some(reply) = outbound.immediate_reply {
            self.complete(reply);
        }
        Ok(())
    }

    /// Blocks until one decoded RPC message is available and returns it. A lost reply
    ///  is bounded by the configured timeout, which resolves to a timeout fault rather
    ///  than blocking forever. A second concurrent call is a programming error and
    ///  fails fast.
    pub async fn receive(&self) -> anyhow::Result<RpcMessage> {
        let rx = {
            let mut slot = self.completion.lock().expect("completion slot lock poisoned");
            match slot.rx.take() {
                Some(rx) => rx,
                None if slot.tx.is_some() => bail!("a receive is already in progress on this channel"),
                None => {
                    let (tx, rx) = oneshot::channel();
                    slot.tx = Some(tx);
                    rx
                }
            }
        };

        match timeout(self.receive_timeout, rx).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => bail!("channel was torn down while waiting for a message"),
            Err(_) => {
                self.completion.lock().expect("completion slot lock poisoned").tx = None;
                let fault = self.correlator.lock().await.abort_pending().unwrap_or_else(|| {
                    RpcMessage::fault(
                        0,
                        String::new(),
                        RpcFault::new(FaultKind::Timeout, "no message arrived in time"),
                    )
                });
                Ok(fault)
            }
        }
    }

    /// Runs the transport's receive loop, feeding every decoded datagram through the
    ///  correlator into the completion slot. Runs until cancelled via the transport.
    pub async fn recv_loop(self: &Arc<Self>) -> anyhow::Result<()> {
        let handler = ChannelDatagramHandler { channel: self.clone() };
        self.transport.recv_loop(Arc::new(handler)).await
    }

    pub(crate) async fn on_wire_message(&self, msg: CoapMessage) {
        let rpc = self.correlator.lock().await.decode(&msg);
        self.complete(rpc);
    }

    fn arm(&self) {
        let mut slot = self.completion.lock().expect("completion slot lock poisoned");
        if slot.tx.is_none() && slot.rx.is_none() {
            let (tx, rx) = oneshot::channel();
            slot.tx = Some(tx);
            slot.rx = Some(rx);
        }
    }

    fn complete(&self, msg: RpcMessage) {
        let tx = {
            let mut slot = self.completion.lock().expect("completion slot lock poisoned");
            if slot.tx.is_none() && slot.rx.is_none() {
                // delivery outran the receiving side, buffer the message in a fresh pair
                let (tx, rx) = oneshot::channel();
                slot.rx = Some(rx);
                Some(tx)
            } else {
                slot.tx.take()
            }
        };

        match tx {
            Some(tx) => {
                if tx.send(msg).is_err() {
                    warn!("receiver went away before the message could be handed over");
                }
            }
            None => warn!("no pending read to complete - dropping {:?}", msg),
        }
    }
}

struct ChannelDatagramHandler {
    channel: Arc<BridgeChannel>,
}

#[async_trait]
impl DatagramHandler for ChannelDatagramHandler {
    async fn on_datagram(&self, buf: &[u8], sender: SocketAddr) {
        trace!("received datagram of {} bytes from {:?}", buf.len(), sender);
        match self.channel.wire_codec.decode(buf) {
            Ok(msg) => self.channel.on_wire_message(msg).await,
            Err(e) => {
                warn!("received an undecodable datagram from {:?} - discarding: {}", sender, e);
            }
        }
    }
}
