//! Streaming buffer layer: lossless re-chunking of microphone-rate audio.
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────────┐     ┌──────────────────┐
//! │ audio source │────▶│     RingBuffer      │────▶│ MultiChannel     │
//! │ (any batch   │     │ (overwrite-oldest,  │     │ Chunker          │
//! │  size)       │     │  bulk drain)        │     │  "vad"      @512 │
//! └──────────────┘     └─────────────────────┘     │  "wakeword" @1280│
//!                                                  └──────────────────┘
//! ```
//!
//! Everything here is a plain data structure: no threads, no timers, no
//! locks. One producer and one consumer per buffer instance; callers wanting
//! concurrent detectors give each its own buffer and chunker channel.

pub mod chunker;
pub mod multi_chunker;
pub mod ring_buffer;

pub use chunker::Chunker;
pub use multi_chunker::MultiChannelChunker;
pub use ring_buffer::{RingBuffer, RingBufferStats};
