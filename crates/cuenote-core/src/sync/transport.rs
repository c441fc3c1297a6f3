//! Transport abstraction for sync envelopes.
//!
//! The engine never speaks a concrete protocol; it publishes envelopes
//! through this trait and pumps whatever the transport's receiver yields.
//! Hosts wire in their own implementation (websocket, message bus). Two
//! implementations ship here: a loopback channel pair for tests and local
//! demos, and a no-op for offline sessions.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use super::message::Envelope;

/// Bidirectional envelope pipe.
pub trait Transport: Send + Sync {
    /// Send an envelope to peers. Failures are reported, not retried; the
    /// caller logs and moves on.
    fn publish(&self, envelope: Envelope) -> Result<()>;

    /// Take the inbound receiver. Yields `Some` once for transports that
    /// deliver; `None` for send-only or offline transports, and on every
    /// call after the first.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Envelope>>;
}

/// Transport that drops everything, for offline sessions.
#[derive(Debug, Default)]
pub struct NoopTransport;

impl Transport for NoopTransport {
    fn publish(&self, _envelope: Envelope) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Envelope>> {
        None
    }
}

/// In-process loopback transport. `pair()` returns two connected ends:
/// what one publishes, the other receives.
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Envelope>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
        let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                outbound: a_to_b_tx,
                inbound: Mutex::new(Some(b_to_a_rx)),
            },
            ChannelTransport {
                outbound: b_to_a_tx,
                inbound: Mutex::new(Some(a_to_b_rx)),
            },
        )
    }
}

impl Transport for ChannelTransport {
    fn publish(&self, envelope: Envelope) -> Result<()> {
        self.outbound
            .send(envelope)
            .map_err(|_| anyhow!("peer end of channel transport is closed"))
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Envelope>> {
        self.inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}
