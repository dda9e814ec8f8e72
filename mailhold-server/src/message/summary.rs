//! Per-request projections of a stored message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mime::{rewrite, ContentPart, DecomposedMessage};
use crate::store::{Listing, MessageId, MessageListItem, RawMessage};

/// Externally exposed view of one message, built per request.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    message: RawMessage,
    decomposed: Arc<DecomposedMessage>,
    html_body: Option<String>,
}

impl MessageSummary {
    pub fn new(message: RawMessage, decomposed: Arc<DecomposedMessage>) -> Self {
        let html_body = decomposed
            .html_body
            .as_deref()
            .map(|html| rewrite(html, message.id));

        Self {
            message,
            decomposed,
            html_body,
        }
    }

    pub fn id(&self) -> MessageId {
        self.message.id
    }

    pub fn subject(&self) -> Option<&str> {
        self.decomposed.header("Subject")
    }

    pub fn text_body(&self) -> Option<&str> {
        self.decomposed.text_body.as_deref()
    }

    /// HTML body with `cid:` references rewritten to content paths.
    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_deref()
    }

    /// The untouched wire-format message.
    pub fn raw(&self) -> &[u8] {
        &self.message.raw
    }

    pub fn part_by_content_id(&self, content_id: &str) -> Option<&ContentPart> {
        self.decomposed.part_by_content_id(content_id)
    }

    pub fn parts(&self) -> &[ContentPart] {
        &self.decomposed.parts
    }

    /// JSON detail view.
    pub fn detail(&self) -> MessageDetail {
        MessageDetail {
            id: self.message.id,
            sender: self.message.sender.clone(),
            recipient: self.message.recipient.clone(),
            received_at: self.message.received_at,
            subject: self.subject().map(str::to_string),
            text_body: self.text_body().map(str::to_string),
            html_body: self.html_body.clone(),
            headers: self.decomposed.headers.clone(),
            parts: self.parts().iter().map(PartInfo::from).collect(),
        }
    }
}

/// Message detail as served by `GET /messages/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    pub id: MessageId,
    pub sender: String,
    pub recipient: String,
    pub received_at: DateTime<Utc>,
    pub subject: Option<String>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub parts: Vec<PartInfo>,
}

/// Metadata of one addressable part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInfo {
    pub index: usize,
    pub content_id: Option<String>,
    pub content_type: String,
    pub filename: Option<String>,
    pub size: usize,
}

impl From<&ContentPart> for PartInfo {
    fn from(part: &ContentPart) -> Self {
        Self {
            index: part.index,
            content_id: part.content_id.clone(),
            content_type: part.content_type.clone(),
            filename: part.filename.clone(),
            size: part.size(),
        }
    }
}

/// Message listing as served by `GET /messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageList {
    pub messages: Vec<MessageListItem>,
    /// Set when the listing was cut at the configured limit.
    pub truncated: bool,
    /// Stored entries that could not be read and are missing from `messages`.
    pub unreadable: usize,
}

impl MessageList {
    /// Build a listing capped at `limit` entries.
    pub fn capped(listing: Listing, limit: usize) -> Self {
        let Listing {
            mut messages,
            unreadable,
        } = listing;

        let truncated = messages.len() > limit;
        messages.truncate(limit);
        Self {
            messages,
            truncated,
            unreadable,
        }
    }
}
