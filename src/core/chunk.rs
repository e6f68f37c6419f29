//! Purpose: Split ordered sequences into bounded-size batches.
//! Exports: `chunk`, `ChunkSpan`, `chunk_spans`, `DEFAULT_MAX_BULK_ITEMS`.
//! Role: Pure helper shared by the bulk uploader and the local exporter.
//! Invariants: Every chunk holds at most `max` items; all but the last hold exactly `max`.
//! Invariants: Concatenating the chunks in order reproduces the input.
use crate::core::error::{Error, ErrorKind};

/// Largest batch the key-value bulk endpoint accepts in one write.
pub const DEFAULT_MAX_BULK_ITEMS: usize = 10_000;

pub fn chunk<T>(items: &[T], max: usize) -> Result<Vec<&[T]>, Error> {
    if max == 0 {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("chunk size must be greater than zero"));
    }
    Ok(items.chunks(max).collect())
}

/// 1-based, inclusive item range covered by one chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkSpan {
    pub index: usize,
    pub first: usize,
    pub last: usize,
}

impl ChunkSpan {
    pub fn item_count(&self) -> usize {
        self.last + 1 - self.first
    }
}

pub fn chunk_spans<T>(chunks: &[&[T]]) -> Vec<ChunkSpan> {
    let mut spans = Vec::with_capacity(chunks.len());
    let mut consumed = 0usize;
    for (index, items) in chunks.iter().enumerate() {
        spans.push(ChunkSpan {
            index,
            first: consumed + 1,
            last: consumed + items.len(),
        });
        consumed += items.len();
    }
    spans
}
