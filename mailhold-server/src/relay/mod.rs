//! Outbound delivery of forwarded messages.
//!
//! The [`ForwardingAgent`] turns a stored message into an [`OutboundMessage`]
//! (new envelope, original bytes) and hands it to a [`Relay`]. Retry policy,
//! if any, belongs to the relay.

pub mod forward;
pub mod smtp;

use futures::future::BoxFuture;
use lettre::address::Envelope;

use crate::error::RelayError;

pub use forward::{ForwardAck, ForwardingAgent};
pub use smtp::SmtpRelay;

/// A fully formed outbound message: envelope plus the verbatim MIME payload.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub envelope: Envelope,
    pub raw: Vec<u8>,
}

/// External relay accepting messages for delivery.
pub trait Relay: Send + Sync {
    fn submit(&self, message: OutboundMessage) -> BoxFuture<'_, Result<(), RelayError>>;
}
