//! Directory-backed message store.
//!
//! Messages live as `{base_path}/{id}.eml` files written by the ingestion
//! side. Envelope data is recovered from the `From`/`To` headers and the
//! file modification time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use mailparse::{addrparse, MailAddr, MailHeaderMap};
use tokio::fs;
use tracing::{debug, warn};

use super::{recipient_matches, Listing, MessageId, MessageListItem, MessageStore, RawMessage};
use crate::error::StoreError;

/// Store reading `.eml` files from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base_path: PathBuf,
}

impl DirectoryStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the path to a specific message file.
    fn message_path(&self, id: MessageId) -> PathBuf {
        self.base_path.join(format!("{id}.eml"))
    }

    async fn load(&self, id: MessageId) -> Result<RawMessage, StoreError> {
        let path = self.message_path(id);

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id))
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let received_at: DateTime<Utc> = fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::from)
            .map_err(|e| StoreError::io(&path, e))?;

        let (sender, recipient) = envelope_from_headers(&raw);

        Ok(RawMessage {
            id,
            sender,
            recipient,
            received_at,
            raw,
        })
    }

    /// Identifiers of every `.eml` file in the directory, newest first.
    async fn ids(&self) -> Result<Vec<MessageId>, StoreError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.base_path, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.base_path, e))?
        {
            let path = entry.path();
            if path.extension().map(|ext| ext == "eml").unwrap_or(false) {
                match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<MessageId>) {
                    Some(Ok(id)) => ids.push(id),
                    _ => debug!(path = %path.display(), "directory_store_skipped_file"),
                }
            }
        }

        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }
}

impl MessageStore for DirectoryStore {
    fn get(&self, id: MessageId) -> BoxFuture<'_, Result<RawMessage, StoreError>> {
        Box::pin(self.load(id))
    }

    fn list<'a>(
        &'a self,
        recipient: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Listing, StoreError>> {
        Box::pin(async move {
            let mut listing = Listing::default();

            for id in self.ids().await? {
                let message = match self.load(id).await {
                    Ok(message) => message,
                    // removed between read_dir and read
                    Err(StoreError::NotFound(_)) => continue,
                    Err(e) => {
                        warn!(message_id = %id, error = %e, "directory_store_load_failed");
                        listing.unreadable += 1;
                        continue;
                    }
                };

                if !recipient_matches(&message.recipient, recipient) {
                    continue;
                }

                listing.messages.push(MessageListItem {
                    message_id: message.id,
                    received_at: message.received_at,
                    subject: super::raw_subject(&message.raw),
                    sender_email: message.sender,
                    recipient_email: message.recipient,
                });
            }

            if listing.unreadable > 0 {
                warn!(
                    unreadable = listing.unreadable,
                    listed = listing.messages.len(),
                    "directory_store_list_incomplete"
                );
            }

            Ok(listing)
        })
    }
}

/// Sender and first recipient address from the `From`/`To` headers.
fn envelope_from_headers(raw: &[u8]) -> (String, String) {
    let headers = match mailparse::parse_headers(raw) {
        Ok((headers, _)) => headers,
        Err(_) => return (String::new(), String::new()),
    };

    let address = |name: &str| {
        headers
            .get_first_value(name)
            .map(|value| first_address(&value))
            .unwrap_or_default()
    };

    (address("From"), address("To"))
}

/// Bare address of the first mailbox in an address header value.
fn first_address(value: &str) -> String {
    let first = addrparse(value).ok().and_then(|list| {
        list.iter().find_map(|addr| match addr {
            MailAddr::Single(info) => Some(info.addr.clone()),
            MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
        })
    });

    first.unwrap_or_else(|| value.trim().to_string())
}
