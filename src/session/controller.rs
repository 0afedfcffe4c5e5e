use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::capture::adapter::CaptureAdapter;
use crate::capture::source::CaptureKind;
use crate::encode::sink::{AudioAttachment, EncoderSink, EncoderState, SinkConfig, SinkFactory};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;
use crate::render::compositor::{CompositeState, Compositor, CompositorOpts, RecordingOverlay};
use crate::render::theme::Theme;
use crate::session::persist::{ArtifactStore, suggested_filename};
use crate::session::quality::{Geometry, Quality};
use crate::session::ticker::{CancelToken, Canceller};
use crate::slides::raster::Rasterizer;
use crate::slides::store::{Page, SlideStore};

const EVENT_CAPACITY: usize = 16;

/// Options controlling [`Recorder`] timing and drawing.
#[derive(Clone, Debug)]
pub struct RecorderOpts {
    /// Period of the draw tick.
    pub frame_interval: Duration,
    /// Frame rate announced to the encoder.
    pub fps: Fps,
    /// How long `start` waits for the encoder to report [`EncoderState::Recording`].
    pub ready_timeout: Duration,
    /// Poll period while waiting for encoder readiness.
    pub ready_poll: Duration,
    /// Compositor options.
    pub compositor: CompositorOpts,
}

impl Default for RecorderOpts {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(33),
            fps: Fps::default(),
            ready_timeout: Duration::from_secs(2),
            ready_poll: Duration::from_millis(20),
            compositor: CompositorOpts::default(),
        }
    }
}

/// Lifecycle phase of a [`Recorder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No session.
    Idle,
    /// `start` is negotiating with the encoder.
    Starting,
    /// Frames are flowing into the encoder.
    Active,
    /// `stop` is finalizing the encoder.
    Stopping,
}

/// Notifications for UI layers.
#[derive(Clone, Debug, PartialEq)]
pub enum RecorderEvent {
    /// A session became active.
    Started {
        /// Selected preset.
        quality: Quality,
        /// Fixed output geometry.
        geometry: Geometry,
    },
    /// A session finished and its artifact was saved.
    Stopped {
        /// Saved location.
        path: PathBuf,
        /// Artifact size.
        bytes: usize,
    },
    /// A recoverable problem.
    Warning(String),
    /// A start or stop attempt failed.
    Error(String),
    /// Whole seconds of active recording.
    Elapsed(u64),
}

/// Result of a successful [`Recorder::start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartReport {
    /// Selected preset.
    pub quality: Quality,
    /// Fixed output geometry.
    pub geometry: Geometry,
    /// Video encoder in use.
    pub video_codec: String,
    /// Audio track outcome.
    pub audio: AudioAttachment,
    /// Non-fatal problems met while starting.
    pub warnings: Vec<String>,
}

/// Result of a successful [`Recorder::stop`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopReport {
    /// Where the artifact was saved.
    pub path: PathBuf,
    /// Artifact size.
    pub bytes: usize,
    /// Whole seconds the session was active.
    pub elapsed_secs: u64,
    /// Preset the session ran at.
    pub quality: Quality,
    /// Geometry the session ran at.
    pub geometry: Geometry,
    /// Frames accepted by the encoder.
    pub frames_submitted: u64,
    /// Ticks that produced no frame.
    pub frames_skipped: u64,
}

struct Stage {
    slides: SlideStore,
    theme: Theme,
}

/// The session's encoder, locked by one blocking draw tick at a time.
type SharedSink = Arc<Mutex<Box<dyn EncoderSink>>>;

struct ActiveSession {
    quality: Quality,
    geometry: Geometry,
    canceller: Canceller,
    elapsed: Arc<AtomicU64>,
    sink: SharedSink,
    draw_task: JoinHandle<DrawOutcome>,
    elapsed_task: JoinHandle<()>,
}

struct Control {
    phase: Phase,
    quality: Quality,
    session: Option<ActiveSession>,
}

struct DrawOutcome {
    submitted: u64,
    skipped: u64,
}

/// Wall-clock milliseconds that advance with the tokio clock.
#[derive(Clone, Copy, Debug)]
struct SessionClock {
    wall_ms_at_start: u64,
    started: Instant,
}

impl SessionClock {
    fn start() -> Self {
        Self {
            wall_ms_at_start: wall_clock_ms(),
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.wall_ms_at_start + self.started.elapsed().as_millis() as u64
    }
}

fn wall_clock_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Everything one draw tick reads.
#[derive(Clone)]
struct Pipeline {
    stage: Arc<Mutex<Stage>>,
    capture: Arc<CaptureAdapter>,
    compositor: Arc<Mutex<Compositor>>,
}

impl Pipeline {
    /// Snapshot the stage and camera, then composite. The camera frame is released on return.
    fn with_frame<R>(
        &self,
        canvas: Canvas,
        recording: Option<RecordingOverlay>,
        now_ms: u64,
        f: impl FnOnce(&FrameRGBA) -> SlidecastResult<R>,
    ) -> SlidecastResult<R> {
        let (document, page_index, theme) = {
            let stage = self.stage.lock();
            (stage.slides.document(), stage.slides.active_index(), stage.theme)
        };
        let camera = self.capture.latest_frame();
        let state = CompositeState {
            document: document.as_deref(),
            page_index,
            camera: camera.as_deref(),
            recording,
            theme,
            now_ms,
        };
        let mut compositor = self.compositor.lock();
        let frame = compositor.composite(canvas.width, canvas.height, &state)?;
        f(frame)
    }
}

/// Recording session controller.
///
/// Owns the stage (slides and theme), the compositor, and at most one active session. The
/// output geometry of a session is fixed by `start` and never changes until `stop`.
pub struct Recorder {
    pipeline: Pipeline,
    sinks: Arc<dyn SinkFactory>,
    store: Arc<dyn ArtifactStore>,
    opts: RecorderOpts,
    control: Mutex<Control>,
    events: broadcast::Sender<RecorderEvent>,
}

impl Recorder {
    /// Create an idle recorder.
    pub fn new(
        capture: Arc<CaptureAdapter>,
        sinks: Arc<dyn SinkFactory>,
        store: Arc<dyn ArtifactStore>,
        opts: RecorderOpts,
    ) -> SlidecastResult<Self> {
        if opts.frame_interval.is_zero() {
            return Err(SlidecastError::validation("frame interval must be > 0"));
        }
        if opts.ready_poll.is_zero() {
            return Err(SlidecastError::validation("ready poll interval must be > 0"));
        }
        let compositor = Compositor::new(opts.compositor.clone())?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            pipeline: Pipeline {
                stage: Arc::new(Mutex::new(Stage {
                    slides: SlideStore::new(),
                    theme: Theme::default(),
                })),
                capture,
                compositor: Arc::new(Mutex::new(compositor)),
            },
            sinks,
            store,
            opts,
            control: Mutex::new(Control {
                phase: Phase::Idle,
                quality: Quality::default(),
                session: None,
            }),
            events,
        })
    }

    /// Subscribe to lifecycle, warning and elapsed-time events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.control.lock().phase
    }

    /// Selected quality preset.
    pub fn quality(&self) -> Quality {
        self.control.lock().quality
    }

    /// Select the preset used by the next `start`. Rejected unless idle.
    pub fn set_quality(&self, quality: Quality) -> SlidecastResult<()> {
        let mut control = self.control.lock();
        if control.phase != Phase::Idle {
            return Err(SlidecastError::busy(
                "quality can only be changed while idle",
            ));
        }
        control.quality = quality;
        Ok(())
    }

    /// Geometry of the running session, if any.
    pub fn session_geometry(&self) -> Option<Geometry> {
        self.control.lock().session.as_ref().map(|s| s.geometry)
    }

    /// Whole seconds the running session has been active; 0 when idle.
    pub fn elapsed_secs(&self) -> u64 {
        self.control
            .lock()
            .session
            .as_ref()
            .map_or(0, |s| s.elapsed.load(Ordering::Relaxed))
    }

    /// Camera and microphone adapter.
    pub fn capture(&self) -> &Arc<CaptureAdapter> {
        &self.pipeline.capture
    }

    /// Acquire the camera.
    pub async fn enable_camera(&self) -> SlidecastResult<()> {
        self.pipeline.capture.enable(CaptureKind::Video).await
    }

    /// Release the camera; the compositor falls back to the placeholder on the next tick.
    pub fn disable_camera(&self) -> bool {
        self.pipeline.capture.disable(CaptureKind::Video)
    }

    /// Acquire the microphone. Audio joins a recording only if enabled before `start`.
    pub async fn enable_microphone(&self) -> SlidecastResult<()> {
        self.pipeline.capture.enable(CaptureKind::Audio).await
    }

    /// Release the microphone.
    pub fn disable_microphone(&self) -> bool {
        self.pipeline.capture.disable(CaptureKind::Audio)
    }

    /// Rasterize and load a document; the previous one is kept on failure.
    ///
    /// Rasterization runs without the stage lock, so draw ticks keep flowing meanwhile.
    pub fn load_document(&self, bytes: &[u8], rasterizer: &dyn Rasterizer) -> SlidecastResult<usize> {
        let pages = rasterizer.rasterize(bytes)?;
        self.pipeline.stage.lock().slides.replace(pages)
    }

    /// Load already-rasterized pages.
    pub fn replace_pages(&self, pages: Vec<Page>) -> SlidecastResult<usize> {
        self.pipeline.stage.lock().slides.replace(pages)
    }

    /// Drop the loaded document.
    pub fn clear_document(&self) {
        self.pipeline.stage.lock().slides.clear();
    }

    /// Number of pages in the loaded document.
    pub fn page_count(&self) -> usize {
        self.pipeline.stage.lock().slides.page_count()
    }

    /// Active page index.
    pub fn active_slide(&self) -> usize {
        self.pipeline.stage.lock().slides.active_index()
    }

    /// Advance one page, saturating at the last.
    pub fn next_slide(&self) -> usize {
        self.pipeline.stage.lock().slides.next()
    }

    /// Go back one page, saturating at the first.
    pub fn prev_slide(&self) -> usize {
        self.pipeline.stage.lock().slides.prev()
    }

    /// Jump to `index`.
    pub fn select_slide(&self, index: usize) -> SlidecastResult<()> {
        self.pipeline.stage.lock().slides.select(index)
    }

    /// Current theme.
    pub fn theme(&self) -> Theme {
        self.pipeline.stage.lock().theme
    }

    /// Replace the theme.
    pub fn set_theme(&self, theme: Theme) {
        self.pipeline.stage.lock().theme = theme;
    }

    /// Switch between the dark and light defaults.
    pub fn set_dark(&self, dark: bool) {
        self.pipeline.stage.lock().theme.dark = dark;
    }

    /// Override the background with a `#RRGGBB` color.
    pub fn set_background_hex(&self, hex: &str) -> SlidecastResult<()> {
        self.pipeline.stage.lock().theme.set_background_hex(hex)
    }

    /// Return to the theme's default background.
    pub fn reset_background(&self) {
        self.pipeline.stage.lock().theme.reset_background();
    }

    /// Composite one frame without the recording overlay.
    pub fn preview(&self, width: u32, height: u32) -> SlidecastResult<FrameRGBA> {
        let canvas = Canvas::new(width, height)?;
        self.pipeline
            .with_frame(canvas, None, wall_clock_ms(), |frame| Ok(frame.clone()))
    }

    /// Start recording at `quality`.
    ///
    /// Fails with [`SlidecastError::AlreadyRecording`] unless idle. Any other failure leaves the
    /// recorder idle.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, quality: Quality) -> SlidecastResult<StartReport> {
        {
            let mut control = self.control.lock();
            if control.phase != Phase::Idle {
                return Err(SlidecastError::AlreadyRecording);
            }
            control.phase = Phase::Starting;
            control.quality = quality;
        }

        match self.begin_session(quality).await {
            Ok((session, report)) => {
                let mut control = self.control.lock();
                control.session = Some(session);
                control.phase = Phase::Active;
                drop(control);
                tracing::info!(
                    width = report.geometry.width,
                    height = report.geometry.height,
                    codec = %report.video_codec,
                    "recording started"
                );
                for w in &report.warnings {
                    let _ = self.events.send(RecorderEvent::Warning(w.clone()));
                }
                let _ = self.events.send(RecorderEvent::Started {
                    quality,
                    geometry: report.geometry,
                });
                Ok(report)
            }
            Err(e) => {
                self.control.lock().phase = Phase::Idle;
                tracing::warn!(error = %e, "recording failed to start");
                let _ = self.events.send(RecorderEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn begin_session(&self, quality: Quality) -> SlidecastResult<(ActiveSession, StartReport)> {
        let geometry = quality.geometry();
        let canvas = Canvas::new(geometry.width, geometry.height)?;
        let clock = SessionClock::start();

        // One synchronous frame proves the pipeline works at this geometry.
        self.pipeline.with_frame(
            canvas,
            Some(RecordingOverlay { elapsed_secs: 0 }),
            clock.now_ms(),
            |_| Ok(()),
        )?;

        let mut sink = self.sinks.create()?;
        let audio_format = self.pipeline.capture.audio_format();
        let begin = sink.begin(SinkConfig {
            width: geometry.width,
            height: geometry.height,
            fps: self.opts.fps,
            bitrate: geometry.bitrate,
            audio: audio_format,
        })?;

        let mut warnings = Vec::new();
        if let AudioAttachment::Skipped { reason } = &begin.audio {
            tracing::warn!(%reason, "recording without audio");
            warnings.push(format!("recording without audio: {reason}"));
        }

        self.await_ready(sink.as_mut()).await?;

        let canceller = Canceller::new();
        let elapsed = Arc::new(AtomicU64::new(0));
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let draw_task = tokio::spawn(draw_loop(
            Arc::new(DrawTask {
                pipeline: self.pipeline.clone(),
                canvas,
                clock,
                elapsed: elapsed.clone(),
                interval: self.opts.frame_interval,
                audio_attached: matches!(begin.audio, AudioAttachment::Attached { .. }),
                events: self.events.clone(),
            }),
            sink.clone(),
            canceller.token(),
        ));
        let elapsed_task = tokio::spawn(elapsed_loop(
            elapsed.clone(),
            self.events.clone(),
            canceller.token(),
        ));

        let session = ActiveSession {
            quality,
            geometry,
            canceller,
            elapsed,
            sink,
            draw_task,
            elapsed_task,
        };
        let report = StartReport {
            quality,
            geometry,
            video_codec: begin.video_codec,
            audio: begin.audio,
            warnings,
        };
        Ok((session, report))
    }

    async fn await_ready(&self, sink: &mut dyn EncoderSink) -> SlidecastResult<()> {
        let poll = async {
            loop {
                match sink.poll_state()? {
                    EncoderState::Recording => return Ok(()),
                    EncoderState::Starting => tokio::time::sleep(self.opts.ready_poll).await,
                }
            }
        };
        match tokio::time::timeout(self.opts.ready_timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(SlidecastError::encoder(format!(
                "encoder did not start recording within {} ms",
                self.opts.ready_timeout.as_millis()
            ))),
        }
    }

    /// Stop recording, finalize the encoder and save the artifact.
    ///
    /// Returns `Ok(None)` when no session is active. The recorder is idle afterwards on every
    /// path.
    pub async fn stop(&self) -> SlidecastResult<Option<StopReport>> {
        let session = {
            let mut control = self.control.lock();
            if control.phase != Phase::Active {
                return Ok(None);
            }
            control.phase = Phase::Stopping;
            control.session.take()
        };
        let Some(session) = session else {
            self.control.lock().phase = Phase::Idle;
            return Ok(None);
        };

        let result = self.finish_session(session).await;
        self.control.lock().phase = Phase::Idle;
        match &result {
            Ok(report) => {
                tracing::info!(
                    path = %report.path.display(),
                    bytes = report.bytes,
                    elapsed_secs = report.elapsed_secs,
                    frames = report.frames_submitted,
                    skipped = report.frames_skipped,
                    "recording stopped"
                );
                let _ = self.events.send(RecorderEvent::Stopped {
                    path: report.path.clone(),
                    bytes: report.bytes,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "recording failed to finalize");
                let _ = self.events.send(RecorderEvent::Error(e.to_string()));
            }
        }
        result.map(Some)
    }

    async fn finish_session(&self, session: ActiveSession) -> SlidecastResult<StopReport> {
        session.canceller.cancel();
        let outcome = session
            .draw_task
            .await
            .map_err(|e| SlidecastError::encoder(format!("draw task failed: {e}")))?;
        if let Err(e) = session.elapsed_task.await {
            tracing::warn!(error = %e, "elapsed task failed");
        }
        let elapsed_secs = session.elapsed.load(Ordering::Relaxed);

        let DrawOutcome { submitted, skipped } = outcome;
        let sink = session.sink;
        let extension = sink.lock().extension();
        let chunks = tokio::task::spawn_blocking(move || {
            let mut sink = sink.lock();
            sink.finish()
        })
            .await
            .map_err(|e| SlidecastError::encoder(format!("encoder finalize task failed: {e}")))??;

        let bytes = chunks.concat();
        if bytes.is_empty() {
            return Err(SlidecastError::EmptyOutput);
        }

        let name = suggested_filename(session.quality, chrono::Utc::now(), extension);
        let store = self.store.clone();
        let size = bytes.len();
        let path = tokio::task::spawn_blocking(move || store.save(&bytes, &name))
            .await
            .map_err(|e| SlidecastError::Other(anyhow::anyhow!("save task failed: {e}")))??;

        Ok(StopReport {
            path,
            bytes: size,
            elapsed_secs,
            quality: session.quality,
            geometry: session.geometry,
            frames_submitted: submitted,
            frames_skipped: skipped,
        })
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(session) = self.control.get_mut().session.take() {
            session.canceller.cancel();
        }
    }
}

struct DrawTask {
    pipeline: Pipeline,
    canvas: Canvas,
    clock: SessionClock,
    elapsed: Arc<AtomicU64>,
    interval: Duration,
    audio_attached: bool,
    events: broadcast::Sender<RecorderEvent>,
}

/// What one draw tick did.
struct TickReport {
    /// `push_frame` was called, so its frame index is spent.
    index_used: bool,
    frame: SlidecastResult<()>,
    audio: SlidecastResult<()>,
}

impl TickReport {
    fn aborted(err: tokio::task::JoinError) -> Self {
        Self {
            index_used: true,
            frame: Err(SlidecastError::composite(format!("draw tick aborted: {err}"))),
            audio: Ok(()),
        }
    }
}

impl DrawTask {
    /// Composite and submit one frame, then forward pending microphone samples.
    ///
    /// Blocking: runs on the blocking pool so a full encoder pipe never stalls the runtime.
    fn tick(
        &self,
        sink: &mut dyn EncoderSink,
        idx: FrameIndex,
        audio_attached: bool,
    ) -> TickReport {
        let overlay = RecordingOverlay {
            elapsed_secs: self.elapsed.load(Ordering::Relaxed),
        };
        let mut index_used = false;
        let frame = self
            .pipeline
            .with_frame(self.canvas, Some(overlay), self.clock.now_ms(), |frame| {
                index_used = true;
                sink.push_frame(idx, frame)
            });

        // Always drain so samples never pile up in the adapter.
        let mut samples = Vec::new();
        let audio = if self.pipeline.capture.drain_audio(&mut samples) > 0 && audio_attached {
            sink.push_audio(&samples)
        } else {
            Ok(())
        };
        TickReport {
            index_used,
            frame,
            audio,
        }
    }
}

async fn draw_loop(
    task: Arc<DrawTask>,
    sink: SharedSink,
    mut cancel: CancelToken,
) -> DrawOutcome {
    let mut ticker = tokio::time::interval(task.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Indices spent on failed pushes are not reused; sinks only require them to increase.
    let mut next_index = 0u64;
    let mut submitted = 0u64;
    let mut skipped = 0u64;
    let mut failing = false;
    let mut audio_attached = task.audio_attached;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let idx = FrameIndex(next_index);
        let report = {
            let task = task.clone();
            let sink = sink.clone();
            tokio::task::spawn_blocking(move || {
                let mut sink = sink.lock();
                task.tick(sink.as_mut(), idx, audio_attached)
            })
            .await
            .unwrap_or_else(TickReport::aborted)
        };

        if report.index_used {
            next_index += 1;
        }
        match report.frame {
            Ok(()) => {
                submitted += 1;
                failing = false;
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "draw tick skipped");
                if !failing {
                    let _ = task
                        .events
                        .send(RecorderEvent::Warning(format!("frame skipped: {e}")));
                }
                failing = true;
            }
        }
        if let Err(e) = report.audio {
            audio_attached = false;
            tracing::warn!(error = %e, "audio track dropped");
            let _ = task
                .events
                .send(RecorderEvent::Warning(format!("audio dropped: {e}")));
        }
    }
    DrawOutcome { submitted, skipped }
}

async fn elapsed_loop(
    elapsed: Arc<AtomicU64>,
    events: broadcast::Sender<RecorderEvent>,
    mut cancel: CancelToken,
) {
    let second = Duration::from_secs(1);
    // `interval_at` delays the first tick by a full second.
    let mut ticker = tokio::time::interval_at(Instant::now() + second, second);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let secs = elapsed.fetch_add(1, Ordering::Relaxed) + 1;
                let _ = events.send(RecorderEvent::Elapsed(secs));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/controller.rs"]
mod tests;
