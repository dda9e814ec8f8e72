//! Read side of the service: loading, summarizing and resolving messages.
//!
//! ```text
//! MessageStore → MessageService → MessageSummary (detail, text, html, raw)
//!                      └────────→ PartResolver   (content/{partId})
//! ```

pub mod cache;
pub mod resolver;
pub mod service;
pub mod summary;

pub use cache::{payload_digest, DecompositionCache};
pub use resolver::{PartResolver, ResolvedPart};
pub use service::MessageService;
pub use summary::{MessageDetail, MessageList, MessageSummary, PartInfo};
