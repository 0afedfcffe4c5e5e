use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::encode::codec::{self, CodecChoice};
use crate::encode::sink::{AudioAttachment, BeginReport, EncoderSink, EncoderState, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::flatten_premul_over_bg;
use crate::render::backend::FrameRGBA;

const STDOUT_CHUNK_BYTES: usize = 64 * 1024;
/// Silence written ahead of live audio so `ffmpeg` can open the audio input before frames flow.
const AUDIO_PRIMER_MS: u64 = 100;

/// Options for [`FfmpegSink`] WebM output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// `ffmpeg` executable.
    pub program: PathBuf,
    /// Background color used to flatten alpha.
    pub bg_rgb: [u8; 3],
    /// How long a freshly spawned encoder must stay alive before it counts as recording.
    pub settle: Duration,
    /// Encoders known to be available; probed from `program` when `None`.
    pub available_encoders: Option<HashSet<String>>,
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            bg_rgb: [0, 0, 0],
            settle: Duration::from_millis(150),
            available_encoders: None,
        }
    }
}

struct Running {
    child: Child,
    stdin: Option<ChildStdin>,
    audio_tx: Option<mpsc::Sender<Vec<f32>>>,
    stdout_reader: Option<std::thread::JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    audio_writer: Option<std::thread::JoinHandle<()>>,
    spawned_at: Instant,
}

/// Sink that spawns the system `ffmpeg`, streams raw frames to stdin and live audio over a
/// loopback TCP input, and collects the WebM stream from stdout.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    cfg: Option<SinkConfig>,
    running: Option<Running>,
    scratch: Vec<u8>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new, unstarted sink.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            cfg: None,
            running: None,
            scratch: Vec::new(),
            last_idx: None,
        }
    }

    /// Arguments for one `ffmpeg` invocation. `audio_port` is the loopback port carrying `f32le`
    /// samples, when audio is attached.
    pub fn build_args(cfg: &SinkConfig, choice: &CodecChoice, audio_port: Option<u16>) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
        args.push(format!("{}x{}", cfg.width, cfg.height));
        args.extend(input_fps_args(cfg.fps));
        args.extend(["-i".to_owned(), "pipe:0".to_owned()]);

        let audio = match (audio_port, cfg.audio, choice.audio) {
            (Some(port), Some(format), Some(codec)) => Some((port, format, codec)),
            _ => None,
        };
        if let Some((port, format, _)) = audio {
            args.extend([
                "-f".to_owned(),
                "f32le".to_owned(),
                "-ar".to_owned(),
                format.sample_rate.to_string(),
                "-ac".to_owned(),
                format.channels.to_string(),
                "-i".to_owned(),
                format!("tcp://127.0.0.1:{port}"),
            ]);
        }

        args.extend(["-map".to_owned(), "0:v".to_owned()]);
        if audio.is_some() {
            args.extend(["-map".to_owned(), "1:a".to_owned()]);
        }
        args.extend([
            "-c:v".to_owned(),
            choice.video.encoder().to_owned(),
            "-b:v".to_owned(),
            cfg.bitrate.to_string(),
            "-deadline".to_owned(),
            "realtime".to_owned(),
            "-cpu-used".to_owned(),
            "8".to_owned(),
            "-pix_fmt".to_owned(),
            "yuv420p".to_owned(),
        ]);
        match audio {
            Some((_, _, codec)) => args.extend([
                "-c:a".to_owned(),
                codec.encoder().to_owned(),
                "-b:a".to_owned(),
                "128k".to_owned(),
            ]),
            None => args.push("-an".to_owned()),
        }
        args.extend(["-f".to_owned(), "webm".to_owned(), "pipe:1".to_owned()]);
        args
    }

    fn running_mut(&mut self) -> SlidecastResult<&mut Running> {
        self.running
            .as_mut()
            .ok_or_else(|| SlidecastError::encoder("ffmpeg sink not started"))
    }
}

impl EncoderSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<BeginReport> {
        if self.running.is_some() {
            return Err(SlidecastError::encoder("ffmpeg sink already started"));
        }
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(SlidecastError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SlidecastError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if !is_ffmpeg_on_path(&self.opts.program) {
            return Err(SlidecastError::encoder(format!(
                "'{}' is required for WebM encoding, but could not be run",
                self.opts.program.display()
            )));
        }

        let available = match self.opts.available_encoders.clone() {
            Some(set) => set,
            None => codec::probe_encoders(&self.opts.program)?,
        };
        let choice = codec::negotiate(&available, cfg.audio.is_some())?;

        let audio_listener = match (cfg.audio, choice.audio) {
            (Some(_), Some(_)) => match TcpListener::bind("127.0.0.1:0") {
                Ok(l) => Some(l),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to open loopback audio input");
                    None
                }
            },
            _ => None,
        };
        let audio_port = audio_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|a| a.port());

        let audio = match (cfg.audio, choice.audio, audio_port) {
            (None, _, _) => AudioAttachment::NotRequested,
            (Some(_), Some(codec), Some(_)) => AudioAttachment::Attached {
                codec: codec.encoder().to_owned(),
            },
            (Some(_), None, _) => AudioAttachment::Skipped {
                reason: "no WebM audio encoder (libopus or libvorbis) available".to_owned(),
            },
            (Some(_), Some(_), None) => AudioAttachment::Skipped {
                reason: "loopback audio input could not be opened".to_owned(),
            },
        };

        let mut cmd = Command::new(&self.opts.program);
        cmd.args(Self::build_args(&cfg, &choice, audio_port))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::encoder(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecastError::encoder("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| SlidecastError::encoder("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlidecastError::encoder("failed to open ffmpeg stderr (unexpected)"))?;

        let stdout_reader = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; STDOUT_CHUNK_BYTES];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    return Ok(chunks);
                }
                chunks.push(buf[..n].to_vec());
            }
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let (audio_tx, audio_writer) = match (audio_listener, cfg.audio) {
            (Some(listener), Some(format)) if matches!(audio, AudioAttachment::Attached { .. }) => {
                let (tx, rx) = mpsc::channel::<Vec<f32>>();
                let primer = (u64::from(format.sample_rate) * AUDIO_PRIMER_MS / 1000) as usize
                    * usize::from(format.channels);
                let handle = std::thread::spawn(move || forward_audio(listener, rx, primer));
                (Some(tx), Some(handle))
            }
            _ => (None, None),
        };

        tracing::info!(
            width = cfg.width,
            height = cfg.height,
            bitrate = cfg.bitrate,
            mime = %choice.mime_type(),
            "ffmpeg encoder spawned"
        );

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.running = Some(Running {
            child,
            stdin: Some(stdin),
            audio_tx,
            stdout_reader: Some(stdout_reader),
            stderr_drain: Some(stderr_drain),
            audio_writer,
            spawned_at: Instant::now(),
        });
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(BeginReport {
            video_codec: choice.video.encoder().to_owned(),
            audio,
        })
    }

    fn poll_state(&mut self) -> SlidecastResult<EncoderState> {
        let settle = self.opts.settle;
        let running = self.running_mut()?;
        match running.child.try_wait() {
            Ok(Some(status)) => {
                let stderr = running
                    .stderr_drain
                    .take()
                    .and_then(|h| h.join().ok())
                    .and_then(Result::ok)
                    .unwrap_or_default();
                Err(SlidecastError::encoder(format!(
                    "ffmpeg exited with status {status}: {}",
                    String::from_utf8_lossy(&stderr).trim()
                )))
            }
            Ok(None) if running.spawned_at.elapsed() >= settle => Ok(EncoderState::Recording),
            Ok(None) => Ok(EncoderState::Starting),
            Err(e) => Err(SlidecastError::encoder(format!("failed to poll ffmpeg: {e}"))),
        }
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SlidecastError::encoder("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(SlidecastError::encoder(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SlidecastError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(SlidecastError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }
        self.last_idx = Some(idx);

        if frame.premultiplied {
            flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgb);
        } else {
            self.scratch.copy_from_slice(&frame.data);
        }

        let Some(running) = self.running.as_mut() else {
            return Err(SlidecastError::encoder("ffmpeg sink not started"));
        };
        let Some(stdin) = running.stdin.as_mut() else {
            return Err(SlidecastError::encoder("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            SlidecastError::encoder(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn push_audio(&mut self, samples: &[f32]) -> SlidecastResult<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let running = self.running_mut()?;
        if let Some(tx) = running.audio_tx.as_ref()
            && tx.send(samples.to_vec()).is_err()
        {
            tracing::warn!("ffmpeg audio input closed; further audio is dropped");
            running.audio_tx = None;
        }
        Ok(())
    }

    fn finish(&mut self) -> SlidecastResult<Vec<Vec<u8>>> {
        let mut running = self
            .running
            .take()
            .ok_or_else(|| SlidecastError::encoder("ffmpeg sink not started"))?;
        self.cfg = None;

        drop(running.stdin.take());
        drop(running.audio_tx.take());
        if let Some(handle) = running.audio_writer.take() {
            let _ = handle.join();
        }

        let status = running.child.wait().map_err(|e| {
            SlidecastError::encoder(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let chunks = match running.stdout_reader.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SlidecastError::encoder("ffmpeg stdout reader thread panicked"))?
                .map_err(|e| SlidecastError::encoder(format!("ffmpeg stdout read failed: {e}")))?,
            None => Vec::new(),
        };
        let stderr_bytes = match running.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SlidecastError::encoder("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| SlidecastError::encoder(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(SlidecastError::encoder(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(chunks)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            drop(running.stdin.take());
            drop(running.audio_tx.take());
            let _ = running.child.kill();
            let _ = running.child.wait();
            if let Some(handle) = running.audio_writer.take() {
                let _ = handle.join();
            }
            tracing::debug!("ffmpeg encoder released without finalizing");
        }
    }
}

fn input_fps_args(fps: Fps) -> [String; 2] {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    ["-r".to_owned(), format!("{}/{}", fps.num, fps.den)]
}

/// Accept the encoder's connection, then forward sample batches until the sender hangs up.
fn forward_audio(listener: TcpListener, rx: mpsc::Receiver<Vec<f32>>, primer_samples: usize) {
    let mut pending: Vec<f32> = vec![0.0; primer_samples];
    let Some(mut stream) = accept_while_buffering(&listener, &rx, &mut pending) else {
        return;
    };
    if write_samples(&mut stream, &pending).is_err() {
        return;
    }
    drop(pending);
    while let Ok(batch) = rx.recv() {
        if let Err(e) = write_samples(&mut stream, &batch) {
            tracing::debug!(error = %e, "audio input write failed");
            return;
        }
    }
}

fn accept_while_buffering(
    listener: &TcpListener,
    rx: &mpsc::Receiver<Vec<f32>>,
    pending: &mut Vec<f32>,
) -> Option<TcpStream> {
    if listener.set_nonblocking(true).is_err() {
        return None;
    }
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                return stream.set_nonblocking(false).ok().map(|_| stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                tracing::debug!(error = %e, "audio input accept failed");
                return None;
            }
        }
        match rx.recv_timeout(Duration::from_millis(20)) {
            Ok(batch) => pending.extend_from_slice(&batch),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn write_samples(stream: &mut TcpStream, samples: &[f32]) -> std::io::Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    stream.write_all(&bytes)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `program -version` runs successfully.
pub fn is_ffmpeg_on_path(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
