//! Live camera and microphone inputs.

/// Device lifecycle owner shared by the controller and the draw task.
pub mod adapter;
/// `ffmpeg`-backed devices.
pub mod ffmpeg;
/// Device traits and capture data types.
pub mod source;
/// Synthetic devices.
pub mod synthetic;
