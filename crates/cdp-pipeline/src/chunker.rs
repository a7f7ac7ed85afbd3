//! Grouping of the record stream into ordered, bounded batches

use crate::error::DecodeError;
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// An ordered batch of records, contiguous in the collection's global index
/// space.
///
/// `start_index` is the zero-based position of the first record within the
/// full collection stream; record `i` of the chunk sits at global index
/// `start_index + i`. Every chunk holds exactly the configured chunk size,
/// except possibly the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub start_index: u64,
    pub records: Vec<Record>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Global index one past the last record of this chunk
    pub fn end_index(&self) -> u64 {
        self.start_index + self.records.len() as u64
    }

    /// Global index of the record at `offset` within this chunk
    pub fn global_index(&self, offset: usize) -> u64 {
        self.start_index + offset as u64
    }
}

/// Iterator adapter that groups records into chunks of at most `chunk_size`.
///
/// Pure grouping: no validation, no transformation, and no read-ahead beyond
/// the chunk currently being filled. On an upstream decode error the partial
/// chunk is discarded, the error is yielded once, and the iterator is fused.
pub struct Chunker<I> {
    source: I,
    chunk_size: usize,
    next_index: u64,
    done: bool,
}

impl<I> Chunker<I>
where
    I: Iterator<Item = Result<Record, DecodeError>>,
{
    /// `start_index` is the global index of the first record `source` will
    /// yield (non-zero when the decoder was resumed at an offset).
    /// `chunk_size` must be positive; callers validate before constructing.
    pub fn new(source: I, chunk_size: usize, start_index: u64) -> Self {
        Self {
            source,
            chunk_size,
            next_index: start_index,
            done: false,
        }
    }
}

impl<I> Iterator for Chunker<I>
where
    I: Iterator<Item = Result<Record, DecodeError>>,
{
    type Item = Result<Chunk, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut records = Vec::new();
        loop {
            match self.source.next() {
                Some(Ok(record)) => {
                    records.push(record);
                    if records.len() == self.chunk_size {
                        break;
                    }
                },
                Some(Err(err)) => {
                    // Records decoded before the failure are dropped; the
                    // collection cannot continue past a decode error.
                    self.done = true;
                    return Some(Err(err));
                },
                None => {
                    self.done = true;
                    if records.is_empty() {
                        return None;
                    }
                    break;
                },
            }
        }

        let chunk = Chunk {
            start_index: self.next_index,
            records,
        };
        self.next_index = chunk.end_index();
        Some(Ok(chunk))
    }
}
