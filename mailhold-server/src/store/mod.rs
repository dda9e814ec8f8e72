//! Raw message store boundary.
//!
//! Ingestion (the SMTP sink) writes messages; this crate only reads them.
//! A [`RawMessage`] is immutable once stored.

pub mod directory;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

/// Stable numeric message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(MessageId)
    }
}

/// A captured message exactly as it came off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub id: MessageId,
    pub sender: String,
    pub recipient: String,
    pub received_at: DateTime<Utc>,
    pub raw: Vec<u8>,
}

/// Listing projection of a stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListItem {
    pub message_id: MessageId,
    pub received_at: DateTime<Utc>,
    pub sender_email: String,
    pub recipient_email: String,
    pub subject: Option<String>,
}

/// Result of a store listing.
///
/// `unreadable` counts entries that exist but could not be loaded, so a
/// partial listing is never mistaken for a complete one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub messages: Vec<MessageListItem>,
    pub unreadable: usize,
}

/// Read access to persisted raw messages.
///
/// Implementations own their concurrency discipline; callers may invoke any
/// method from many tasks at once.
pub trait MessageStore: Send + Sync {
    /// Fetch a message, failing with [`StoreError::NotFound`] when absent.
    fn get(&self, id: MessageId) -> BoxFuture<'_, Result<RawMessage, StoreError>>;

    /// List messages newest first, optionally restricted to one recipient
    /// (case-insensitive).
    fn list<'a>(
        &'a self,
        recipient: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Listing, StoreError>>;
}

/// Case-insensitive recipient match used by the store implementations.
pub(crate) fn recipient_matches(recipient: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(wanted) => recipient.trim().eq_ignore_ascii_case(wanted.trim()),
        None => true,
    }
}

/// Subject header of a raw message, if it parses.
pub(crate) fn raw_subject(raw: &[u8]) -> Option<String> {
    use mailparse::MailHeaderMap;

    mailparse::parse_headers(raw)
        .ok()
        .and_then(|(headers, _)| headers.get_first_value("Subject"))
}
