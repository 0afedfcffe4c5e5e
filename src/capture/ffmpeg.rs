//! Camera and microphone capture through the system `ffmpeg` binary.
//!
//! Each feed owns one child process writing raw data to stdout. A reader thread publishes the
//! data; a second thread keeps the tail of stderr for startup diagnostics.

use std::collections::VecDeque;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::capture::source::{
    AudioDevice, AudioFeed, AudioFormat, VideoDevice, VideoFeed, VideoFrame,
};
use crate::foundation::error::{DeviceFailure, SlidecastError, SlidecastResult};

const STDERR_TAIL_BYTES: usize = 8 * 1024;
/// Microphone samples kept when nobody drains them.
const MAX_BUFFERED_AUDIO_SECS: usize = 10;

/// An `ffmpeg` input: demuxer name plus device specifier.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureInput {
    /// Input format passed to `-f` (e.g. `v4l2`, `avfoundation`, `dshow`, `pulse`).
    pub format: String,
    /// Device passed to `-i` (e.g. `/dev/video0`, `0`, `video=Integrated Camera`, `default`).
    pub device: String,
}

impl CaptureInput {
    /// Platform default camera input.
    pub fn default_camera() -> Self {
        let (format, device) = if cfg!(target_os = "macos") {
            ("avfoundation", "0")
        } else if cfg!(target_os = "windows") {
            ("dshow", "video=Integrated Camera")
        } else {
            ("v4l2", "/dev/video0")
        };
        Self {
            format: format.to_owned(),
            device: device.to_owned(),
        }
    }

    /// Platform default microphone input.
    pub fn default_microphone() -> Self {
        let (format, device) = if cfg!(target_os = "macos") {
            ("avfoundation", ":0")
        } else if cfg!(target_os = "windows") {
            ("dshow", "audio=Microphone")
        } else {
            ("pulse", "default")
        };
        Self {
            format: format.to_owned(),
            device: device.to_owned(),
        }
    }

    fn missing_device_node(&self) -> bool {
        self.format == "v4l2" && !std::path::Path::new(&self.device).exists()
    }
}

/// Map `ffmpeg` startup stderr to a device failure class.
pub fn classify_startup_failure(stderr: &str) -> DeviceFailure {
    let lower = stderr.to_ascii_lowercase();
    let denied = [
        "permission denied",
        "operation not permitted",
        "not authorized",
        "access denied",
    ];
    if denied.iter().any(|needle| lower.contains(needle)) {
        DeviceFailure::PermissionDenied
    } else {
        DeviceFailure::Unavailable
    }
}

fn device_error(failure: DeviceFailure, reason: String) -> SlidecastError {
    match failure {
        DeviceFailure::PermissionDenied => SlidecastError::permission_denied(reason),
        DeviceFailure::Unavailable => SlidecastError::device_unavailable(reason),
    }
}

/// Camera captured by `ffmpeg` and converted to RGBA8 at a fixed size.
#[derive(Clone, Debug)]
pub struct FfmpegCamera {
    /// Capture input.
    pub input: CaptureInput,
    /// Requested and delivered frame width.
    pub width: u32,
    /// Requested and delivered frame height.
    pub height: u32,
    /// Requested capture rate.
    pub fps: u32,
    /// How long the process must survive before the device counts as acquired.
    pub startup_grace: Duration,
    /// Program to invoke.
    pub program: PathBuf,
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self {
            input: CaptureInput::default_camera(),
            width: 1280,
            height: 720,
            fps: 30,
            startup_grace: Duration::from_millis(300),
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegCamera {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-hide_banner", "-loglevel", "error", "-f", &self.input.format]);
        if self.input.format != "dshow" {
            cmd.args(["-framerate", &self.fps.to_string()]);
        }
        cmd.args(["-i", &self.input.device])
            .args([
                "-an",
                "-vf",
                &format!(
                    "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
                    w = self.width,
                    h = self.height
                ),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ]);
        cmd
    }
}

#[async_trait]
impl VideoDevice for FfmpegCamera {
    fn name(&self) -> &str {
        &self.input.device
    }

    async fn open(&self) -> SlidecastResult<Box<dyn VideoFeed>> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::validation("camera size must be non-zero"));
        }
        if self.input.missing_device_node() {
            return Err(SlidecastError::device_unavailable(format!(
                "camera device '{}' does not exist",
                self.input.device
            )));
        }

        let mut process = CaptureProcess::spawn(self.command(), "camera")?;
        let stdout = process.take_stdout()?;
        let latest = Arc::new(Mutex::new(None::<Arc<VideoFrame>>));
        let (w, h) = (self.width, self.height);
        let sink = latest.clone();
        let reader = std::thread::spawn(move || read_video_frames(stdout, w, h, &sink));
        process.reader = Some(reader);

        process.await_startup(self.startup_grace).await?;
        tracing::debug!(device = %self.input.device, "ffmpeg camera started");
        Ok(Box::new(FfmpegVideoFeed {
            latest,
            _process: process,
        }))
    }
}

fn read_video_frames(
    mut stdout: std::process::ChildStdout,
    width: u32,
    height: u32,
    latest: &Mutex<Option<Arc<VideoFrame>>>,
) {
    let len = (width as usize) * (height as usize) * 4;
    let mut sequence = 0u64;
    loop {
        let mut buf = vec![0u8; len];
        if stdout.read_exact(&mut buf).is_err() {
            return;
        }
        // rawvideo rgba from a camera is opaque, so the bytes are already premultiplied.
        *latest.lock() = Some(Arc::new(VideoFrame::new(width, height, buf, sequence)));
        sequence += 1;
    }
}

struct FfmpegVideoFeed {
    latest: Arc<Mutex<Option<Arc<VideoFrame>>>>,
    _process: CaptureProcess,
}

impl VideoFeed for FfmpegVideoFeed {
    fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.latest.lock().clone()
    }
}

/// Microphone captured by `ffmpeg` as interleaved `f32le`.
#[derive(Clone, Debug)]
pub struct FfmpegMicrophone {
    /// Capture input.
    pub input: CaptureInput,
    /// Delivered sample layout.
    pub format: AudioFormat,
    /// How long the process must survive before the device counts as acquired.
    pub startup_grace: Duration,
    /// Program to invoke.
    pub program: PathBuf,
}

impl Default for FfmpegMicrophone {
    fn default() -> Self {
        Self {
            input: CaptureInput::default_microphone(),
            format: AudioFormat::default(),
            startup_grace: Duration::from_millis(300),
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegMicrophone {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            &self.input.format,
            "-i",
            &self.input.device,
            "-vn",
            "-ac",
            &self.format.channels.to_string(),
            "-ar",
            &self.format.sample_rate.to_string(),
            "-f",
            "f32le",
            "pipe:1",
        ]);
        cmd
    }
}

#[async_trait]
impl AudioDevice for FfmpegMicrophone {
    fn name(&self) -> &str {
        &self.input.device
    }

    async fn open(&self) -> SlidecastResult<Box<dyn AudioFeed>> {
        if self.format.sample_rate == 0 || self.format.channels == 0 {
            return Err(SlidecastError::validation(
                "microphone sample rate and channels must be non-zero",
            ));
        }

        let mut process = CaptureProcess::spawn(self.command(), "microphone")?;
        let stdout = process.take_stdout()?;
        let cap = (self.format.sample_rate as usize)
            * usize::from(self.format.channels)
            * MAX_BUFFERED_AUDIO_SECS;
        let samples = Arc::new(Mutex::new(VecDeque::<f32>::new()));
        let sink = samples.clone();
        let reader = std::thread::spawn(move || read_audio_samples(stdout, cap, &sink));
        process.reader = Some(reader);

        process.await_startup(self.startup_grace).await?;
        tracing::debug!(device = %self.input.device, "ffmpeg microphone started");
        Ok(Box::new(FfmpegAudioFeed {
            format: self.format,
            samples,
            _process: process,
        }))
    }
}

fn read_audio_samples(
    mut stdout: std::process::ChildStdout,
    cap: usize,
    samples: &Mutex<VecDeque<f32>>,
) {
    let mut buf = [0u8; 4096];
    let mut carry: Vec<u8> = Vec::with_capacity(4);
    loop {
        let n = match stdout.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        carry.extend_from_slice(&buf[..n]);
        let whole = carry.len() / 4 * 4;
        let mut q = samples.lock();
        for b in carry[..whole].chunks_exact(4) {
            q.push_back(f32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        }
        while q.len() > cap {
            q.pop_front();
        }
        drop(q);
        carry.drain(..whole);
    }
}

struct FfmpegAudioFeed {
    format: AudioFormat,
    samples: Arc<Mutex<VecDeque<f32>>>,
    _process: CaptureProcess,
}

impl AudioFeed for FfmpegAudioFeed {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn drain_samples(&self, out: &mut Vec<f32>) -> usize {
        let mut q = self.samples.lock();
        let n = q.len();
        out.extend(q.drain(..));
        n
    }
}

/// A capture child process with its helper threads. Killing and reaping happen on drop.
struct CaptureProcess {
    label: &'static str,
    child: Child,
    stderr_tail: Arc<Mutex<Vec<u8>>>,
    stderr_drain: Option<std::thread::JoinHandle<()>>,
    reader: Option<std::thread::JoinHandle<()>>,
}

impl CaptureProcess {
    fn spawn(mut cmd: Command, label: &'static str) -> SlidecastResult<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::device_unavailable(format!(
                "failed to spawn ffmpeg for {label} (is it installed and on PATH?): {e}"
            ))
        })?;

        let mut stderr = child.stderr.take().ok_or_else(|| {
            SlidecastError::device_unavailable("failed to open ffmpeg stderr (unexpected)")
        })?;
        let stderr_tail = Arc::new(Mutex::new(Vec::new()));
        let tail = stderr_tail.clone();
        let stderr_drain = std::thread::spawn(move || {
            let mut buf = [0u8; 1024];
            while let Ok(n) = stderr.read(&mut buf) {
                if n == 0 {
                    break;
                }
                let mut t = tail.lock();
                t.extend_from_slice(&buf[..n]);
                if t.len() > STDERR_TAIL_BYTES {
                    let excess = t.len() - STDERR_TAIL_BYTES;
                    t.drain(..excess);
                }
            }
        });

        Ok(Self {
            label,
            child,
            stderr_tail,
            stderr_drain: Some(stderr_drain),
            reader: None,
        })
    }

    fn take_stdout(&mut self) -> SlidecastResult<std::process::ChildStdout> {
        self.child.stdout.take().ok_or_else(|| {
            SlidecastError::device_unavailable("failed to open ffmpeg stdout (unexpected)")
        })
    }

    /// Fail if the process exits within `grace`.
    async fn await_startup(&mut self, grace: Duration) -> SlidecastResult<()> {
        let step = Duration::from_millis(25);
        let mut waited = Duration::ZERO;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    // Give the stderr thread a moment to collect the final message.
                    if let Some(handle) = self.stderr_drain.take() {
                        let _ = handle.join();
                    }
                    let stderr = String::from_utf8_lossy(&self.stderr_tail.lock()).into_owned();
                    let failure = classify_startup_failure(&stderr);
                    return Err(device_error(
                        failure,
                        format!(
                            "ffmpeg {} exited during startup with status {status}: {}",
                            self.label,
                            stderr.trim()
                        ),
                    ));
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(SlidecastError::device_unavailable(format!(
                        "failed to poll ffmpeg {}: {e}",
                        self.label
                    )));
                }
            }
            if waited >= grace {
                return Ok(());
            }
            tokio::time::sleep(step).await;
            waited += step;
        }
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        tracing::debug!(label = self.label, "ffmpeg capture released");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/ffmpeg.rs"]
mod tests;
