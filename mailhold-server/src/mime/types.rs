//! Type definitions for decomposed messages.

use std::sync::Arc;

use super::stream::PartStream;

/// A node of the MIME tree as found in the raw message.
///
/// Leaves carry decoded content; groups carry their multipart subtype and
/// children in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum PartNode {
    Leaf(ContentPart),
    Group {
        /// Multipart subtype, e.g. `alternative`, `mixed`, `related`.
        subtype: String,
        children: Vec<PartNode>,
    },
}

impl PartNode {
    /// Flatten the tree into leaves, depth-first, preserving source order.
    pub fn flatten(self) -> Vec<ContentPart> {
        let mut parts = Vec::new();
        self.flatten_into(&mut parts);
        parts
    }

    fn flatten_into(self, out: &mut Vec<ContentPart>) {
        match self {
            PartNode::Leaf(part) => out.push(part),
            PartNode::Group { children, .. } => {
                for child in children {
                    child.flatten_into(out);
                }
            }
        }
    }
}

/// A single decoded leaf part of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPart {
    /// Position of the part in the flattened, depth-first part list.
    pub index: usize,
    /// Content-ID without angle brackets.
    pub content_id: Option<String>,
    /// MIME type, lowercased (e.g. `image/png`).
    pub content_type: String,
    /// Declared charset, if any.
    pub charset: Option<String>,
    /// Filename from `Content-Disposition` or the `name` content-type parameter.
    pub filename: Option<String>,
    /// Whether the part was declared `Content-Disposition: attachment`.
    pub attachment: bool,
    /// Nesting depth, 0 for the top-level entity.
    pub depth: usize,
    data: Arc<Vec<u8>>,
    text: Option<String>,
}

impl ContentPart {
    pub fn new(content_type: String, data: Vec<u8>) -> Self {
        Self {
            index: 0,
            content_id: None,
            content_type,
            charset: None,
            filename: None,
            attachment: false,
            depth: 0,
            data: Arc::new(data),
            text: None,
        }
    }

    /// Attach the charset-decoded text of a `text/*` part.
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }

    /// Charset-decoded content, present for `text/*` parts.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Decoded size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Decoded content.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Value suitable for an HTTP `Content-Type` header.
    pub fn content_type_header(&self) -> String {
        match &self.charset {
            Some(charset) if self.content_type.starts_with("text/") => {
                format!("{}; charset={}", self.content_type, charset)
            }
            _ => self.content_type.clone(),
        }
    }

    /// Open a read-once stream over the decoded content.
    pub fn open(&self) -> PartStream {
        PartStream::new(Arc::clone(&self.data))
    }
}

/// Derived, non-persisted view of a raw message.
///
/// A pure function of the raw payload: identical bytes always yield an
/// identical structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecomposedMessage {
    /// Top-level headers in source order.
    pub headers: Vec<(String, String)>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    /// Leaf parts, depth-first in source order.
    pub parts: Vec<ContentPart>,
}

impl DecomposedMessage {
    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Exact content-id lookup.
    pub fn part_by_content_id(&self, content_id: &str) -> Option<&ContentPart> {
        self.parts
            .iter()
            .find(|p| p.content_id.as_deref() == Some(content_id))
    }

    /// Positional lookup in the flattened part list.
    pub fn part_by_index(&self, index: usize) -> Option<&ContentPart> {
        self.parts.get(index)
    }
}
