//! Message loading: raw retrieval, decomposition and summaries.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::cache::DecompositionCache;
use super::summary::{MessageList, MessageSummary};
use crate::error::{DecomposeError, MessageError, StoreError};
use crate::mime::DecomposedMessage;
use crate::store::{MessageId, MessageStore, RawMessage};

/// Read-side facade over the store and the decomposer.
///
/// Cheap to clone; clones share the store and the decomposition cache.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    cache: Arc<DecompositionCache>,
}

impl MessageService {
    pub fn new(store: Arc<dyn MessageStore>, cache: DecompositionCache) -> Self {
        Self {
            store,
            cache: Arc::new(cache),
        }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// List messages newest first, capped at `limit`.
    pub async fn list(
        &self,
        recipient: Option<&str>,
        limit: usize,
    ) -> Result<MessageList, StoreError> {
        let listing = self.store.list(recipient).await?;
        let list = MessageList::capped(listing, limit);

        info!(
            recipient = ?recipient,
            returned = list.messages.len(),
            truncated = list.truncated,
            unreadable = list.unreadable,
            "message_list_loaded"
        );

        Ok(list)
    }

    /// Fetch the raw message. Never parses, so it works for malformed input.
    pub async fn raw(&self, id: MessageId) -> Result<RawMessage, StoreError> {
        self.store.get(id).await
    }

    /// Fetch and decompose a message.
    pub async fn load(
        &self,
        id: MessageId,
    ) -> Result<(RawMessage, Arc<DecomposedMessage>), MessageError> {
        let message = self.store.get(id).await?;

        let cache = Arc::clone(&self.cache);
        let (message, decomposed) = tokio::task::spawn_blocking(move || {
            let decomposed = cache.get_or_decompose(&message.raw);
            (message, decomposed)
        })
        .await
        .map_err(|e| {
            error!(message_id = %id, error = %e, "message_decompose_task_failed");
            DecomposeError::Malformed(format!("decomposition aborted: {e}"))
        })?;

        let decomposed = decomposed.map_err(|e| {
            warn!(message_id = %id, error = %e, "message_decompose_failed");
            e
        })?;

        Ok((message, decomposed))
    }

    /// Build the per-request summary of a message.
    pub async fn summary(&self, id: MessageId) -> Result<MessageSummary, MessageError> {
        let (message, decomposed) = self.load(id).await?;
        Ok(MessageSummary::new(message, decomposed))
    }
}
