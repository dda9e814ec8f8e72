//! Forwarding a stored message to a new recipient.

use std::sync::Arc;

use lettre::address::Envelope;
use lettre::Address;
use serde::Serialize;
use tracing::{info, warn};

use super::{OutboundMessage, Relay};
use crate::error::{ForwardError, RelayError};
use crate::store::{MessageId, MessageStore};

/// Acknowledgement returned once the relay accepted a forward.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardAck {
    pub message_id: MessageId,
    pub recipient: String,
}

/// Re-submits stored messages to a relay under a new envelope recipient.
///
/// The MIME payload is passed through byte for byte; headers such as `To:`
/// keep their original values. Malformed messages forward like any other
/// since nothing here parses the payload.
#[derive(Clone)]
pub struct ForwardingAgent {
    store: Arc<dyn MessageStore>,
    relay: Arc<dyn Relay>,
    fallback_sender: Option<Address>,
}

impl ForwardingAgent {
    pub fn new(store: Arc<dyn MessageStore>, relay: Arc<dyn Relay>) -> Self {
        Self {
            store,
            relay,
            fallback_sender: None,
        }
    }

    /// Envelope sender used when the stored sender is not a valid address.
    pub fn with_fallback_sender(mut self, sender: Option<Address>) -> Self {
        self.fallback_sender = sender;
        self
    }

    pub async fn forward(
        &self,
        id: MessageId,
        recipient: &str,
    ) -> Result<ForwardAck, ForwardError> {
        let recipient = recipient.trim();
        let to: Address = recipient.parse().map_err(|e| {
            warn!(message_id = %id, recipient = recipient, error = %e, "forward_recipient_invalid");
            ForwardError::InvalidRecipient(recipient.to_string())
        })?;

        let message = self.store.get(id).await?;

        let from = match message.sender.parse::<Address>() {
            Ok(address) => Some(address),
            Err(_) => self.fallback_sender.clone(),
        };

        let envelope = Envelope::new(from, vec![to])
            .map_err(|e| ForwardError::InvalidRecipient(format!("{recipient}: {e}")))?;

        info!(
            message_id = %id,
            recipient = recipient,
            sender = ?envelope.from().map(|a| a.to_string()),
            raw_length = message.raw.len(),
            "forward_start"
        );

        self.relay
            .submit(OutboundMessage {
                envelope,
                raw: message.raw,
            })
            .await
            .map_err(|e| match e {
                RelayError::InvalidAddress(reason) => ForwardError::InvalidRecipient(reason),
                RelayError::Unavailable(reason) => {
                    warn!(message_id = %id, error = %reason, "forward_relay_unavailable");
                    ForwardError::RelayUnavailable(reason)
                }
            })?;

        info!(message_id = %id, recipient = recipient, "forward_complete");

        Ok(ForwardAck {
            message_id: id,
            recipient: recipient.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::testing::{DownRelay, RecordingRelay, RejectingRelay};
    use crate::store::MemoryStore;

    const RAW: &[u8] =
        b"From: sender@example.com\r\nTo: original@example.com\r\nSubject: Hi\r\n\r\nbody\r\n";

    async fn setup(sender: &str, raw: &[u8]) -> (Arc<RecordingRelay>, ForwardingAgent, MessageId) {
        let store = MemoryStore::new();
        let id = store.insert(sender, "original@example.com", raw.to_vec()).await;
        let relay = Arc::new(RecordingRelay::default());
        let agent = ForwardingAgent::new(Arc::new(store), relay.clone());
        (relay, agent, id)
    }

    #[tokio::test]
    async fn test_forward_submits_raw_bytes_verbatim() {
        let (relay, agent, id) = setup("sender@example.com", RAW).await;

        let ack = agent.forward(id, "new@example.com").await.unwrap();
        assert_eq!(ack.message_id, id);
        assert_eq!(ack.recipient, "new@example.com");

        let submitted = relay.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].raw, RAW);
        assert_eq!(submitted[0].envelope.to().len(), 1);
        assert_eq!(submitted[0].envelope.to()[0].to_string(), "new@example.com");
        assert_eq!(
            submitted[0].envelope.from().map(|a| a.to_string()),
            Some("sender@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_forward_malformed_message_is_still_sent() {
        let raw = b"Content-Type: multipart/mixed; boundary=X\r\n\r\n--X\r\nunterminated";
        let (relay, agent, id) = setup("sender@example.com", raw).await;

        agent.forward(id, "new@example.com").await.unwrap();
        assert_eq!(relay.submitted.lock().unwrap()[0].raw, raw.to_vec());
    }

    #[tokio::test]
    async fn test_forward_invalid_recipient() {
        let (relay, agent, id) = setup("sender@example.com", RAW).await;

        for bad in ["", "not-an-address", "a@@b"] {
            let err = agent.forward(id, bad).await.unwrap_err();
            assert!(matches!(err, ForwardError::InvalidRecipient(_)), "{bad}");
        }
        assert!(relay.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forward_missing_message() {
        let (relay, agent, _) = setup("sender@example.com", RAW).await;

        let err = agent.forward(MessageId(404), "new@example.com").await.unwrap_err();
        assert!(matches!(err, ForwardError::MessageNotFound(MessageId(404))));
        assert!(relay.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forward_relay_unavailable() {
        let store = MemoryStore::new();
        let id = store.insert("sender@example.com", "o@example.com", RAW.to_vec()).await;
        let agent = ForwardingAgent::new(Arc::new(store), Arc::new(DownRelay));

        let err = agent.forward(id, "new@example.com").await.unwrap_err();
        assert!(matches!(err, ForwardError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_forward_recipient_rejected_by_relay() {
        let store = MemoryStore::new();
        let id = store.insert("sender@example.com", "o@example.com", RAW.to_vec()).await;
        let agent = ForwardingAgent::new(Arc::new(store), Arc::new(RejectingRelay));

        let err = agent.forward(id, "ghost@example.com").await.unwrap_err();
        assert!(matches!(err, ForwardError::InvalidRecipient(_)));
    }

    #[tokio::test]
    async fn test_forward_uses_fallback_sender() {
        let (relay, agent, id) = setup("unknown", RAW).await;
        let agent = agent.with_fallback_sender(Some("holdmail@example.com".parse().unwrap()));

        agent.forward(id, "new@example.com").await.unwrap();

        let submitted = relay.submitted.lock().unwrap();
        assert_eq!(
            submitted[0].envelope.from().map(|a| a.to_string()),
            Some("holdmail@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_forward_without_any_sender_uses_null_sender() {
        let (relay, agent, id) = setup("unknown", RAW).await;

        agent.forward(id, " new@example.com ").await.unwrap();

        let submitted = relay.submitted.lock().unwrap();
        assert!(submitted[0].envelope.from().is_none());
    }
}
