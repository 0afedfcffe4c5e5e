use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use slidecast::config::DeviceBackend;
use slidecast::slides::raster::AutoRasterizer;
use slidecast::{
    DirectoryStore, EncoderSink, FfmpegSink, FfmpegSinkOpts, Quality, Recorder, RecorderConfig,
    RecorderEvent, SinkFactory, SlidecastResult,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one composited frame as a PNG.
    Preview(PreviewArgs),
    /// Record a timed session (requires `ffmpeg` on PATH).
    Record(RecordArgs),
    /// Print the quality presets.
    Qualities,
}

#[derive(Parser, Debug)]
struct StageArgs {
    /// Document to present (PDF or raster image).
    #[arg(long)]
    slides: Option<PathBuf>,

    /// 0-based page to show first.
    #[arg(long, default_value_t = 0)]
    page: usize,

    /// Show the camera.
    #[arg(long)]
    camera: bool,

    /// Camera implementation, overriding the config file.
    #[arg(long, value_enum)]
    camera_backend: Option<DeviceBackend>,

    /// Use the light palette.
    #[arg(long)]
    light: bool,

    /// Background color override as `#RRGGBB`.
    #[arg(long)]
    background: Option<String>,

    /// Output quality preset.
    #[arg(long, value_enum)]
    quality: Option<Quality>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RecordArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Recording length in seconds.
    #[arg(long, default_value_t = 5)]
    duration: u64,

    /// Advance to the next page every N seconds.
    #[arg(long)]
    advance_every: Option<u64>,

    /// Record the microphone.
    #[arg(long)]
    mic: bool,

    /// Microphone implementation, overriding the config file.
    #[arg(long, value_enum)]
    mic_backend: Option<DeviceBackend>,

    /// Output directory, overriding the config file.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = RecorderConfig::load(cli.config.as_deref())?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    match cli.cmd {
        Command::Preview(args) => rt.block_on(cmd_preview(cfg, args)),
        Command::Record(args) => rt.block_on(cmd_record(cfg, args)),
        Command::Qualities => {
            cmd_qualities();
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_qualities() {
    println!("{:<8}{:>8}{:>8}{:>14}", "quality", "width", "height", "bitrate");
    for q in Quality::ALL {
        let g = q.geometry();
        println!("{:<8}{:>8}{:>8}{:>14}", q.label(), g.width, g.height, g.bitrate);
    }
}

fn ffmpeg_sinks(cfg: &RecorderConfig) -> Arc<dyn SinkFactory> {
    let program = cfg.ffmpeg.clone();
    Arc::new(move || -> SlidecastResult<Box<dyn EncoderSink>> {
        Ok(Box::new(FfmpegSink::new(FfmpegSinkOpts {
            program: program.clone(),
            ..FfmpegSinkOpts::default()
        })))
    })
}

/// Build a recorder and load the stage described by `args`.
async fn stage(cfg: &RecorderConfig, args: &StageArgs) -> anyhow::Result<Recorder> {
    let store = Arc::new(DirectoryStore::new(cfg.output_dir.clone()));
    let recorder = Recorder::new(
        cfg.capture_adapter(),
        ffmpeg_sinks(cfg),
        store,
        cfg.recorder_opts(),
    )?;
    recorder.set_theme(cfg.theme);
    recorder.set_quality(args.quality.unwrap_or(cfg.quality))?;

    if args.light {
        recorder.set_dark(false);
    }
    if let Some(hex) = &args.background {
        recorder.set_background_hex(hex)?;
    }
    if let Some(path) = &args.slides {
        let bytes =
            std::fs::read(path).with_context(|| format!("read slides '{}'", path.display()))?;
        let pages = recorder.load_document(&bytes, &AutoRasterizer::default())?;
        tracing::info!(pages, path = %path.display(), "document loaded");
        if args.page > 0 {
            recorder.select_slide(args.page)?;
        }
    }
    if args.camera {
        recorder.enable_camera().await?;
        wait_for_camera(&recorder).await;
    }
    Ok(recorder)
}

async fn wait_for_camera(recorder: &Recorder) {
    for _ in 0..100 {
        if recorder.capture().latest_frame().is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tracing::warn!("camera produced no frame yet; the placeholder will be shown");
}

fn with_backends(
    mut cfg: RecorderConfig,
    camera: Option<DeviceBackend>,
    mic: Option<DeviceBackend>,
) -> RecorderConfig {
    if let Some(b) = camera {
        cfg.camera.backend = b;
    }
    if let Some(b) = mic {
        cfg.microphone.backend = b;
    }
    cfg
}

async fn cmd_preview(cfg: RecorderConfig, args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = with_backends(cfg, args.stage.camera_backend, None);
    let recorder = stage(&cfg, &args.stage).await?;
    let g = recorder.quality().geometry();
    let frame = recorder.preview(g.width, g.height)?;
    frame.write_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_record(cfg: RecorderConfig, args: RecordArgs) -> anyhow::Result<()> {
    let mut cfg = with_backends(cfg, args.stage.camera_backend, args.mic_backend);
    if let Some(dir) = &args.out_dir {
        cfg.output_dir = dir.clone();
    }
    let recorder = stage(&cfg, &args.stage).await?;
    if args.mic {
        recorder.enable_microphone().await?;
    }

    let mut events = recorder.subscribe();
    let report = recorder.start(recorder.quality()).await?;
    for w in &report.warnings {
        eprintln!("warning: {w}");
    }
    eprintln!(
        "recording {} ({}x{}, {}) for {}s",
        report.quality, report.geometry.width, report.geometry.height, report.video_codec,
        args.duration
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.duration);
    let mut advance = args.advance_every.filter(|s| *s > 0).map(|s| {
        let every = Duration::from_secs(s);
        tokio::time::interval_at(tokio::time::Instant::now() + every, every)
    });
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted");
                break;
            }
            _ = async {
                match advance.as_mut() {
                    Some(i) => { i.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                let page = recorder.next_slide();
                tracing::info!(page, "advanced slide");
            }
            ev = events.recv() => log_event(ev),
        }
    }

    match recorder.stop().await? {
        Some(report) => {
            eprintln!(
                "saved {} ({} bytes, {}s, {} frames, {} skipped)",
                report.path.display(),
                report.bytes,
                report.elapsed_secs,
                report.frames_submitted,
                report.frames_skipped
            );
            print_path(&report.path);
        }
        None => eprintln!("no session was active"),
    }
    Ok(())
}

fn log_event(ev: Result<RecorderEvent, tokio::sync::broadcast::error::RecvError>) {
    match ev {
        Ok(RecorderEvent::Elapsed(secs)) => tracing::debug!(secs, "elapsed"),
        Ok(RecorderEvent::Warning(w)) => eprintln!("warning: {w}"),
        Ok(other) => tracing::debug!(event = ?other, "recorder event"),
        Err(e) => tracing::debug!(error = %e, "event stream lagged"),
    }
}

fn print_path(path: &Path) {
    println!("{}", path.display());
}
