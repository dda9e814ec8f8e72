//! In-memory message store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    raw_subject, recipient_matches, Listing, MessageId, MessageListItem, MessageStore, RawMessage,
};
use crate::error::StoreError;

/// Message store held entirely in memory.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    messages: BTreeMap<MessageId, RawMessage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message received now and return its identifier.
    pub async fn insert(&self, sender: &str, recipient: &str, raw: Vec<u8>) -> MessageId {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = MessageId(inner.next_id);

        inner.messages.insert(
            id,
            RawMessage {
                id,
                sender: sender.to_string(),
                recipient: recipient.to_string(),
                received_at: Utc::now(),
                raw,
            },
        );

        debug!(message_id = %id, "memory_store_inserted");
        id
    }
}

impl MessageStore for MemoryStore {
    fn get(&self, id: MessageId) -> BoxFuture<'_, Result<RawMessage, StoreError>> {
        Box::pin(async move {
            self.inner
                .read()
                .await
                .messages
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn list<'a>(
        &'a self,
        recipient: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Listing, StoreError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            let messages = inner
                .messages
                .values()
                .rev()
                .filter(|m| recipient_matches(&m.recipient, recipient))
                .map(|m| MessageListItem {
                    message_id: m.id,
                    received_at: m.received_at,
                    sender_email: m.sender.clone(),
                    recipient_email: m.recipient.clone(),
                    subject: raw_subject(&m.raw),
                })
                .collect();

            Ok(Listing {
                messages,
                unreadable: 0,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let id = store
            .insert("a@example.com", "b@example.com", b"Subject: Hi\r\n\r\nbody".to_vec())
            .await;

        let message = store.get(id).await.unwrap();
        assert_eq!(message.id, id);
        assert_eq!(message.sender, "a@example.com");
        assert_eq!(message.raw, b"Subject: Hi\r\n\r\nbody".to_vec());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get(MessageId(99)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(MessageId(99))));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let store = MemoryStore::new();
        let first = store.insert("a@x.com", "one@x.com", b"Subject: 1\r\n\r\n".to_vec()).await;
        let second = store.insert("a@x.com", "two@x.com", b"Subject: 2\r\n\r\n".to_vec()).await;
        let third = store.insert("a@x.com", "One@x.com", b"Subject: 3\r\n\r\n".to_vec()).await;

        let all = store.list(None).await.unwrap().messages;
        let ids: Vec<_> = all.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![third, second, first]);
        assert_eq!(all[0].subject.as_deref(), Some("3"));

        let filtered = store.list(Some("one@x.com")).await.unwrap().messages;
        let ids: Vec<_> = filtered.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![third, first]);
    }
}
