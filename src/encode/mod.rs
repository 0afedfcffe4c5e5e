//! Encoding sinks.
//!
//! Sinks consume composited frames and live audio in submission order while a recording session
//! is active, and hand back the encoded container when it stops.

/// WebM codec negotiation.
pub mod codec;
/// `ffmpeg`-based sink (WebM output via system `ffmpeg`).
pub mod ffmpeg;
/// Sink traits and the in-memory sink.
pub mod sink;
