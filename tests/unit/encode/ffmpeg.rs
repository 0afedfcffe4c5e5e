use super::*;
use crate::capture::source::AudioFormat;
use crate::encode::codec::{AudioCodec, VideoCodec};

fn cfg(width: u32, height: u32, audio: Option<AudioFormat>) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: Fps::default(),
        bitrate: 5_000_000,
        audio,
    }
}

fn has_pair(args: &[String], a: &str, b: &str) -> bool {
    args.windows(2).any(|w| w[0] == a && w[1] == b)
}

#[test]
fn video_only_args_disable_audio() {
    let choice = CodecChoice {
        video: VideoCodec::Vp9,
        audio: None,
    };
    let args = FfmpegSink::build_args(&cfg(1920, 1080, None), &choice, None);
    assert!(has_pair(&args, "-s", "1920x1080"));
    assert!(has_pair(&args, "-r", "30/1"));
    assert!(has_pair(&args, "-c:v", "libvpx-vp9"));
    assert!(has_pair(&args, "-b:v", "5000000"));
    assert!(args.iter().any(|a| a == "-an"));
    assert!(!args.iter().any(|a| a.starts_with("tcp://")));
    assert!(has_pair(&args, "-f", "webm"));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
}

#[test]
fn audio_args_reference_loopback_port() {
    let choice = CodecChoice {
        video: VideoCodec::Vp8,
        audio: Some(AudioCodec::Opus),
    };
    let format = AudioFormat {
        sample_rate: 44_100,
        channels: 1,
    };
    let args = FfmpegSink::build_args(&cfg(1280, 720, Some(format)), &choice, Some(40123));
    assert!(has_pair(&args, "-i", "tcp://127.0.0.1:40123"));
    assert!(has_pair(&args, "-ar", "44100"));
    assert!(has_pair(&args, "-ac", "1"));
    assert!(has_pair(&args, "-map", "1:a"));
    assert!(has_pair(&args, "-c:a", "libopus"));
    assert!(!args.iter().any(|a| a == "-an"));
}

#[test]
fn odd_geometry_is_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::default());
    let err = sink.begin(cfg(641, 480, None)).unwrap_err();
    assert!(matches!(err, SlidecastError::Validation(_)));
}

#[test]
fn missing_program_is_an_encoder_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        program: PathBuf::from("definitely-not-ffmpeg"),
        ..FfmpegSinkOpts::default()
    });
    let err = sink.begin(cfg(640, 480, None)).unwrap_err();
    assert!(matches!(err, SlidecastError::Encoder(_)));
    assert!(sink.poll_state().is_err());
    assert!(sink.finish().is_err());
}

#[test]
fn audio_forwarder_primes_then_streams_samples() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    tx.send(vec![0.5f32, -0.5]).unwrap();
    let handle = std::thread::spawn(move || forward_audio(listener, rx, 4));

    let mut client = TcpStream::connect(addr).unwrap();
    tx.send(vec![0.25f32]).unwrap();
    drop(tx);

    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).unwrap();
    handle.join().unwrap();

    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    assert_eq!(samples, vec![0.0, 0.0, 0.0, 0.0, 0.5, -0.5, 0.25]);
}

#[test]
fn audio_forwarder_exits_when_nobody_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let (tx, rx) = mpsc::channel::<Vec<f32>>();
    let handle = std::thread::spawn(move || forward_audio(listener, rx, 0));
    drop(tx);
    handle.join().unwrap();
}

#[test]
fn ensure_parent_dir_creates_missing_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a").join("b").join("out.webm");
    ensure_parent_dir(&out).unwrap();
    assert!(out.parent().unwrap().is_dir());
}
