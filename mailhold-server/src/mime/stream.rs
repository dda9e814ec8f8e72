//! Read-once byte stream over a decoded part.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

/// Size of the chunks yielded by [`PartStream`].
pub const CHUNK_SIZE: usize = 16 * 1024;

/// A scoped, read-once stream over a part's decoded bytes.
///
/// The stream is acquired with [`ContentPart::open`](super::ContentPart::open),
/// consumed chunk by chunk, and released when dropped. Once exhausted it keeps
/// returning `None`.
#[derive(Debug)]
pub struct PartStream {
    data: Arc<Vec<u8>>,
    offset: usize,
    chunk_size: usize,
}

impl PartStream {
    pub(crate) fn new(data: Arc<Vec<u8>>) -> Self {
        Self::with_chunk_size(data, CHUNK_SIZE)
    }

    pub(crate) fn with_chunk_size(data: Arc<Vec<u8>>, chunk_size: usize) -> Self {
        Self {
            data,
            offset: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn next_chunk(&mut self) -> Option<Vec<u8>> {
        if self.offset >= self.data.len() {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Some(chunk)
    }
}

impl Stream for PartStream {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.next_chunk().map(Ok))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining().div_ceil(self.chunk_size);
        (chunks, Some(chunks))
    }
}
