//! Recording sessions.
//!
//! A [`controller::Recorder`] drives the compositor on a timer while a session is active and
//! hands the finished container to an [`persist::ArtifactStore`].

/// The recorder state machine.
pub mod controller;
/// Where finished recordings are saved.
pub mod persist;
/// Quality presets and their fixed geometry.
pub mod quality;
/// Session-scoped cancellation.
pub mod ticker;
