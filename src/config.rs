//! Recorder configuration.
//!
//! Read from a JSON file where every field is optional, then overridden by `SLIDECAST_FONT` and
//! `SLIDECAST_OUTPUT_DIR`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::capture::adapter::CaptureAdapter;
use crate::capture::ffmpeg::{CaptureInput, FfmpegCamera, FfmpegMicrophone};
use crate::capture::source::{AudioDevice, AudioFormat, VideoDevice};
use crate::capture::synthetic::{TestPatternCamera, ToneMicrophone};
use crate::foundation::core::Fps;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::compositor::CompositorOpts;
use crate::render::theme::Theme;
use crate::session::controller::RecorderOpts;
use crate::session::quality::Quality;

/// Environment variable overriding [`RecorderConfig::font`].
pub const FONT_ENV: &str = "SLIDECAST_FONT";
/// Environment variable overriding [`RecorderConfig::output_dir`].
pub const OUTPUT_DIR_ENV: &str = "SLIDECAST_OUTPUT_DIR";

/// Top-level recorder configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Preset used when none is given on the command line.
    #[serde(default)]
    pub quality: Quality,

    /// Draw tick period in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Frame rate announced to the encoder.
    #[serde(default)]
    pub fps: Fps,

    /// How long `start` waits for the encoder, in milliseconds.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Directory finished recordings are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Font for labels; system fonts are probed when unset.
    #[serde(default)]
    pub font: Option<PathBuf>,

    /// Initial background theme.
    #[serde(default)]
    pub theme: Theme,

    /// Stamp per-frame uniqueness marks while recording.
    #[serde(default = "default_true")]
    pub frame_marks: bool,

    /// Camera settings.
    #[serde(default)]
    pub camera: CameraConfig,

    /// Microphone settings.
    #[serde(default)]
    pub microphone: MicrophoneConfig,

    /// `ffmpeg` executable used for capture and encoding.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
}

/// Which implementation backs a capture device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceBackend {
    /// No device; enabling fails as unavailable.
    None,
    /// Generated test pattern or tone.
    #[default]
    Synthetic,
    /// Live capture through `ffmpeg`.
    Ffmpeg,
}

/// Camera settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device implementation.
    #[serde(default)]
    pub backend: DeviceBackend,
    /// `ffmpeg` input; platform default when unset.
    #[serde(default)]
    pub input: Option<CaptureInput>,
    /// Frame width.
    #[serde(default = "default_camera_width")]
    pub width: u32,
    /// Frame height.
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// Capture rate.
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
    /// Enable the camera at startup.
    #[serde(default)]
    pub enabled: bool,
}

/// Microphone settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrophoneConfig {
    /// Device implementation.
    #[serde(default)]
    pub backend: DeviceBackend,
    /// `ffmpeg` input; platform default when unset.
    #[serde(default)]
    pub input: Option<CaptureInput>,
    /// Sample layout.
    #[serde(default)]
    pub format: AudioFormat,
    /// Enable the microphone at startup.
    #[serde(default)]
    pub enabled: bool,
}

fn default_frame_interval_ms() -> u64 {
    33
}

fn default_ready_timeout_ms() -> u64 {
    2_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("recordings")
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_camera_width() -> u32 {
    1280
}

fn default_camera_height() -> u32 {
    720
}

fn default_camera_fps() -> u32 {
    30
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: DeviceBackend::default(),
            input: None,
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
            enabled: false,
        }
    }
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            backend: DeviceBackend::default(),
            input: None,
            format: AudioFormat::default(),
            enabled: false,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            frame_interval_ms: default_frame_interval_ms(),
            fps: Fps::default(),
            ready_timeout_ms: default_ready_timeout_ms(),
            output_dir: default_output_dir(),
            font: None,
            theme: Theme::default(),
            frame_marks: true,
            camera: CameraConfig::default(),
            microphone: MicrophoneConfig::default(),
            ffmpeg: default_ffmpeg(),
        }
    }
}

impl RecorderConfig {
    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> SlidecastResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| SlidecastError::validation(format!("invalid config: {e}")))
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: &Path) -> SlidecastResult<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_json_str(&contents)
    }

    /// Load `path` when given (defaults otherwise), apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> SlidecastResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var_os(key).map(PathBuf::from));
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `SLIDECAST_FONT` and `SLIDECAST_OUTPUT_DIR` as returned by `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if let Some(font) = lookup(FONT_ENV).filter(|p| !p.as_os_str().is_empty()) {
            self.font = Some(font);
        }
        if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|p| !p.as_os_str().is_empty()) {
            self.output_dir = dir;
        }
    }

    /// Reject settings the recorder cannot run with.
    pub fn validate(&self) -> SlidecastResult<()> {
        if self.frame_interval_ms == 0 {
            return Err(SlidecastError::validation("frame_interval_ms must be > 0"));
        }
        if self.ready_timeout_ms == 0 {
            return Err(SlidecastError::validation("ready_timeout_ms must be > 0"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.camera.width == 0 || self.camera.height == 0 || self.camera.fps == 0 {
            return Err(SlidecastError::validation(
                "camera width, height and fps must be > 0",
            ));
        }
        if self.microphone.format.sample_rate == 0 || self.microphone.format.channels == 0 {
            return Err(SlidecastError::validation(
                "microphone sample_rate and channels must be > 0",
            ));
        }
        Ok(())
    }

    /// Recorder options derived from this configuration.
    pub fn recorder_opts(&self) -> RecorderOpts {
        RecorderOpts {
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            fps: self.fps,
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            compositor: CompositorOpts {
                font_path: self.font.clone(),
                frame_marks: self.frame_marks,
            },
            ..RecorderOpts::default()
        }
    }

    /// Camera device selected by [`CameraConfig::backend`].
    pub fn camera_device(&self) -> Option<Box<dyn VideoDevice>> {
        let c = &self.camera;
        match c.backend {
            DeviceBackend::None => None,
            DeviceBackend::Synthetic => Some(Box::new(TestPatternCamera {
                width: c.width,
                height: c.height,
                fps: c.fps,
            })),
            DeviceBackend::Ffmpeg => Some(Box::new(FfmpegCamera {
                input: c.input.clone().unwrap_or_else(CaptureInput::default_camera),
                width: c.width,
                height: c.height,
                fps: c.fps,
                program: self.ffmpeg.clone(),
                ..FfmpegCamera::default()
            })),
        }
    }

    /// Microphone device selected by [`MicrophoneConfig::backend`].
    pub fn microphone_device(&self) -> Option<Box<dyn AudioDevice>> {
        let m = &self.microphone;
        match m.backend {
            DeviceBackend::None => None,
            DeviceBackend::Synthetic => Some(Box::new(ToneMicrophone {
                format: m.format,
                ..ToneMicrophone::default()
            })),
            DeviceBackend::Ffmpeg => Some(Box::new(FfmpegMicrophone {
                input: m
                    .input
                    .clone()
                    .unwrap_or_else(CaptureInput::default_microphone),
                format: m.format,
                program: self.ffmpeg.clone(),
                ..FfmpegMicrophone::default()
            })),
        }
    }

    /// Capture adapter over the configured devices.
    pub fn capture_adapter(&self) -> Arc<CaptureAdapter> {
        Arc::new(CaptureAdapter::new(
            self.camera_device(),
            self.microphone_device(),
        ))
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
