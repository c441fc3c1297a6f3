//! Peer sync: wire messages and the transport seam.

pub mod message;
pub mod transport;

pub use message::{Envelope, PeerId, RemoteEvent, Topic};
pub use transport::{ChannelTransport, NoopTransport, Transport};
