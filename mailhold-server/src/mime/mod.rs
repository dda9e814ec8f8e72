//! MIME handling: decomposition, content-id rewriting and part streams.
//!
//! ```text
//! raw bytes → decompose() → DecomposedMessage { text, html, parts }
//!                                 html → rewrite() → /messages/{id}/content/{cid}
//!                                 part → open()    → PartStream
//! ```

pub mod decomposer;
pub mod rewriter;
pub mod stream;
pub mod types;

pub use decomposer::{decompose, normalize_content_id};
pub use rewriter::{content_path, rewrite};
pub use stream::PartStream;
pub use types::{ContentPart, DecomposedMessage, PartNode};
