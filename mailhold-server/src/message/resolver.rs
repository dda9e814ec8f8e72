//! Part resolution by content-id or positional index.

use tracing::{debug, info};

use super::service::MessageService;
use crate::error::ResolveError;
use crate::mime::{ContentPart, DecomposedMessage, PartStream};
use crate::store::MessageId;

/// A lookup strategy over the decomposed part list.
type Lookup = fn(&DecomposedMessage, &str) -> Option<usize>;

/// Strategies tried in order; the first match wins.
const LOOKUPS: &[(&str, Lookup)] = &[("content_id", by_content_id), ("index", by_index)];

fn by_content_id(message: &DecomposedMessage, part_id: &str) -> Option<usize> {
    message.part_by_content_id(part_id).map(|p| p.index)
}

fn by_index(message: &DecomposedMessage, part_id: &str) -> Option<usize> {
    let index: usize = part_id.parse().ok()?;
    message.part_by_index(index).map(|p| p.index)
}

/// A resolved part: its content type and a read-once byte stream.
#[derive(Debug)]
pub struct ResolvedPart {
    pub content_type: String,
    pub size: usize,
    pub stream: PartStream,
}

impl ResolvedPart {
    fn from_part(part: &ContentPart) -> Self {
        Self {
            content_type: part.content_type_header(),
            size: part.size(),
            stream: part.open(),
        }
    }
}

/// Resolves `/messages/{id}/content/{partId}` to a part of the message.
#[derive(Clone)]
pub struct PartResolver {
    service: MessageService,
}

impl PartResolver {
    pub fn new(service: MessageService) -> Self {
        Self { service }
    }

    /// Look up a part by exact content-id, falling back to its position when
    /// `part_id` is an integer and no content-id matches.
    ///
    /// Returns [`ResolveError::NotFound`] when the message or the part is
    /// absent.
    pub async fn resolve(
        &self,
        message_id: MessageId,
        part_id: &str,
    ) -> Result<ResolvedPart, ResolveError> {
        let (_, decomposed) = self.service.load(message_id).await?;

        for &(strategy, lookup) in LOOKUPS {
            if let Some(index) = lookup(&*decomposed, part_id) {
                let part = &decomposed.parts[index];

                info!(
                    message_id = %message_id,
                    part_id = part_id,
                    strategy = strategy,
                    content_type = %part.content_type,
                    size = part.size(),
                    "part_resolved"
                );

                return Ok(ResolvedPart::from_part(part));
            }
        }

        debug!(message_id = %message_id, part_id = part_id, "part_not_found");
        Err(ResolveError::NotFound)
    }
}
