//! Mailhold - inspection and re-delivery of email captured by a test SMTP sink.
//!
//! The sink stores every message as raw bytes. This crate turns those bytes
//! into browsable views and can forward a message, unchanged, to a real
//! recipient.
//!
//! ## Architecture
//!
//! ```text
//! MessageStore → mime::decompose → MessageSummary ──→ web (detail/html/text/raw)
//!                                   PartResolver  ──→ web (content/{partId})
//! MessageStore → ForwardingAgent → Relay (SMTP)
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod mime;
pub mod relay;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{DecomposeError, ForwardError, MessageError, RelayError, ResolveError, StoreError};
pub use message::{MessageService, MessageSummary, PartResolver};
pub use mime::{decompose, rewrite, DecomposedMessage};
pub use relay::{ForwardingAgent, Relay, SmtpRelay};
pub use store::{DirectoryStore, Listing, MemoryStore, MessageId, MessageStore, RawMessage};
pub use web::{router, AppState};
