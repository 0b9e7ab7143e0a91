//! Fan-out of one audio stream to several consumers with different window
//! sizes.
//!
//! A single capture callback typically feeds a 512-sample VAD and a
//! 1280-sample wake-word detector at once. Each registered channel owns an
//! independent [`Chunker`], so remainders evolve separately and one channel's
//! geometry never affects another's.

use crate::error::{Result, WakestreamError};
use crate::streaming::chunker::Chunker;
use std::collections::BTreeMap;

/// Named per-consumer chunkers fed from a single `process` call.
#[derive(Debug, Clone, Default)]
pub struct MultiChannelChunker {
    channels: BTreeMap<String, Chunker>,
}

impl MultiChannelChunker {
    /// Creates an empty fan-out with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a consumer with its own window geometry.
    ///
    /// Returns an error for a duplicate name or invalid geometry.
    pub fn register_channel(&mut self, name: &str, chunk_size: usize, overlap: usize) -> Result<()> {
        if self.channels.contains_key(name) {
            return Err(WakestreamError::DuplicateChannel {
                name: name.to_string(),
            });
        }
        self.channels
            .insert(name.to_string(), Chunker::new(chunk_size, overlap)?);
        Ok(())
    }

    /// Runs the same input through every registered channel.
    ///
    /// Returns the complete windows each channel emitted, keyed by channel
    /// name. Channels without a complete window map to an empty list.
    pub fn process(&mut self, input: &[f32]) -> BTreeMap<String, Vec<Vec<f32>>> {
        self.channels
            .iter_mut()
            .map(|(name, chunker)| (name.clone(), chunker.process(input)))
            .collect()
    }

    /// Borrows a channel's chunker.
    pub fn channel(&self, name: &str) -> Option<&Chunker> {
        self.channels.get(name)
    }

    /// Mutably borrows a channel's chunker.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Chunker> {
        self.channels.get_mut(name)
    }

    /// Clears one channel's remainder.
    pub fn reset_channel(&mut self, name: &str) -> Result<()> {
        match self.channels.get_mut(name) {
            Some(chunker) => {
                chunker.reset();
                Ok(())
            }
            None => Err(WakestreamError::UnknownChannel {
                name: name.to_string(),
            }),
        }
    }

    /// Clears every channel's remainder.
    pub fn reset_all(&mut self) {
        for chunker in self.channels.values_mut() {
            chunker.reset();
        }
    }

    /// Registered channel names, in iteration order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }
}
