//! Splitting extracted text into bounded, contiguous chunks.
//!
//! Chunks are borrowed slices of the source text. Sizes are measured either in Unicode scalar
//! values or in whitespace-delimited words:
//!
//! - Characters: every chunk holds exactly `max_unit_size` characters except the last.
//! - Words: every chunk holds at most `max_unit_size` words. A chunk ends where the next chunk's
//!   first word begins, so whitespace between words stays with the preceding chunk.
//!
//! In both modes the chunks partition the text: concatenating them in order yields the input
//! unchanged, and no chunk is empty.

use crate::config::ChunkUnit;

use super::types::ChunkingError;

/// A contiguous slice of document text submitted to the summarizer as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Zero-based position of the chunk within the document.
    pub ordinal: usize,
    /// The chunk contents.
    pub text: &'a str,
}

/// Size-bounded splitter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_unit_size: usize,
    unit: ChunkUnit,
}

impl Chunker {
    /// Create a chunker producing chunks of at most `max_unit_size` units.
    pub fn new(max_unit_size: usize, unit: ChunkUnit) -> Result<Self, ChunkingError> {
        if max_unit_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            max_unit_size,
            unit,
        })
    }

    /// Maximum number of units per chunk.
    pub fn max_unit_size(&self) -> usize {
        self.max_unit_size
    }

    /// Unit used to measure chunk sizes.
    pub fn unit(&self) -> ChunkUnit {
        self.unit
    }

    /// Lazily split `text` into chunks. Call again to restart from the beginning.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            position: 0,
            ordinal: 0,
            max_unit_size: self.max_unit_size,
            unit: self.unit,
        }
    }
}

/// Iterator over the chunks of one text, in order.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    position: usize,
    ordinal: usize,
    max_unit_size: usize,
    unit: ChunkUnit,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.position..];
        if rest.is_empty() {
            return None;
        }

        let len = match self.unit {
            ChunkUnit::Characters => character_chunk_len(rest, self.max_unit_size),
            ChunkUnit::Words => word_chunk_len(rest, self.max_unit_size),
        };
        let chunk = Chunk {
            ordinal: self.ordinal,
            text: &rest[..len],
        };
        self.position += len;
        self.ordinal += 1;
        Some(chunk)
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Byte length of the first `max_chars` characters of `rest`.
fn character_chunk_len(rest: &str, max_chars: usize) -> usize {
    rest.char_indices()
        .nth(max_chars)
        .map(|(offset, _)| offset)
        .unwrap_or(rest.len())
}

/// Byte offset where word number `max_words + 1` starts, or the end of `rest`.
fn word_chunk_len(rest: &str, max_words: usize) -> usize {
    let mut words = 0;
    let mut previous_is_space = true;
    for (offset, c) in rest.char_indices() {
        let is_space = c.is_whitespace();
        if !is_space && previous_is_space {
            if words == max_words {
                return offset;
            }
            words += 1;
        }
        previous_is_space = is_space;
    }
    rest.len()
}

/// Count the units of `text` the way the chunker measures them.
pub fn count_units(text: &str, unit: ChunkUnit) -> usize {
    match unit {
        ChunkUnit::Characters => text.chars().count(),
        ChunkUnit::Words => text.split_whitespace().count(),
    }
}
