//! Slidecast records live presentations.
//!
//! A presentation slide, a webcam feed and animated overlays are composited on the CPU into a
//! fixed-resolution canvas at a steady frame rate and streamed into an encoder while a session is
//! active:
//!
//! - Load a document into the stage ([`Recorder::load_document`])
//! - Toggle the camera and microphone ([`capture::adapter::CaptureAdapter`])
//! - [`Recorder::start`] at a [`Quality`], then [`Recorder::stop`] to save the recording
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Camera and microphone inputs.
pub mod capture;
/// Recorder configuration.
pub mod config;
/// Encoding sinks.
pub mod encode;
/// Frame composition.
pub mod render;
/// Recording sessions.
pub mod session;
/// Document pages.
pub mod slides;

pub use crate::foundation::color::Rgb8;
pub use crate::foundation::core::{
    Affine, BezPath, Canvas, Fps, FrameIndex, Point, Rect, RoundedRect,
};
pub use crate::foundation::error::{DeviceFailure, SlidecastError, SlidecastResult};

pub use crate::capture::adapter::CaptureAdapter;
pub use crate::capture::source::{CaptureKind, VideoFrame};
pub use crate::config::RecorderConfig;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{EncoderSink, InMemorySink, SinkConfig, SinkFactory, SinkProbe};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::compositor::{CompositeState, Compositor, CompositorOpts};
pub use crate::render::theme::Theme;
pub use crate::session::controller::{
    Phase, Recorder, RecorderEvent, RecorderOpts, StartReport, StopReport,
};
pub use crate::session::persist::{ArtifactStore, DirectoryStore, MemoryStore};
pub use crate::session::quality::{Geometry, Quality};
pub use crate::slides::store::{Document, Page, SlideStore};
