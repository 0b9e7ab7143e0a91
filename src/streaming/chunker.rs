//! Stateful re-blocking of an arbitrary-length stream into fixed windows.
//!
//! The chunker's one guarantee is streaming equivalence: however the caller
//! splits the input across `process` calls, the concatenated chunk sequence
//! is identical to what a single call over the whole stream would emit. The
//! tail that does not yet fill a window is carried in `remainder`; no sample
//! is ever dropped.

use crate::error::{Result, WakestreamError};

/// Remainder-carrying chunker with optional window overlap.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    remainder: Vec<f32>,
}

impl Chunker {
    /// Creates a chunker emitting `chunk_size`-sample windows whose starts
    /// advance by `chunk_size - overlap`.
    ///
    /// Rejects `chunk_size == 0` and `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Self::validate(chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
            remainder: Vec::new(),
        })
    }

    fn validate(chunk_size: usize, overlap: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(WakestreamError::ChunkerConfig {
                message: "chunk size must be non-zero".to_string(),
            });
        }
        if overlap >= chunk_size {
            return Err(WakestreamError::ChunkerConfig {
                message: format!("overlap {} >= chunk size {}", overlap, chunk_size),
            });
        }
        Ok(())
    }

    /// Appends `input` to the carried remainder and emits every complete
    /// window, keeping the unconsumed tail for the next call.
    pub fn process(&mut self, input: &[f32]) -> Vec<Vec<f32>> {
        let mut buf = std::mem::take(&mut self.remainder);
        buf.extend_from_slice(input);

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start + self.chunk_size <= buf.len() {
            chunks.push(buf[start..start + self.chunk_size].to_vec());
            start += step;
        }

        self.remainder = buf.split_off(start);
        chunks
    }

    /// Drops the carried remainder.
    pub fn reset(&mut self) {
        self.remainder.clear();
    }

    /// Changes the window geometry mid-stream.
    ///
    /// With `preserve_remainder` the carried tail is reinterpreted under the
    /// new size on the next `process` call; otherwise it is discarded.
    pub fn set_chunk_size(&mut self, chunk_size: usize, preserve_remainder: bool) -> Result<()> {
        Self::validate(chunk_size, self.overlap)?;
        self.chunk_size = chunk_size;
        if !preserve_remainder {
            self.remainder.clear();
        }
        Ok(())
    }

    /// Window size in samples.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Samples shared between consecutive windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Samples currently carried toward the next window.
    pub fn remainder_len(&self) -> usize {
        self.remainder.len()
    }
}
