use super::*;

#[test]
fn empty_document_yields_defaults() {
    let cfg = RecorderConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, RecorderConfig::default());
    assert_eq!(cfg.frame_interval_ms, 33);
    assert_eq!(cfg.ready_timeout_ms, 2_000);
    assert!(cfg.frame_marks);
    assert_eq!(cfg.quality, Quality::Fhd);
    assert_eq!(cfg.camera.backend, DeviceBackend::Synthetic);
}

#[test]
fn partial_document_keeps_other_defaults() {
    let cfg = RecorderConfig::from_json_str(
        r##"{
            "quality": "4k",
            "frame_marks": false,
            "theme": { "dark": false, "background": "#112233" },
            "camera": { "backend": "ffmpeg", "input": { "format": "v4l2", "device": "/dev/video2" } },
            "microphone": { "backend": "none" }
        }"##,
    )
    .unwrap();
    assert_eq!(cfg.quality, Quality::Uhd4k);
    assert!(!cfg.frame_marks);
    assert!(!cfg.theme.dark);
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.input.as_ref().unwrap().device, "/dev/video2");
    assert!(cfg.microphone_device().is_none());
    assert_eq!(cfg.camera_device().unwrap().name(), "/dev/video2");
}

#[test]
fn environment_overrides_file_values() {
    let mut cfg = RecorderConfig::default();
    cfg.apply_env_overrides(|key| match key {
        FONT_ENV => Some(PathBuf::from("/fonts/a.ttf")),
        OUTPUT_DIR_ENV => Some(PathBuf::from("/tmp/out")),
        _ => None,
    });
    assert_eq!(cfg.font, Some(PathBuf::from("/fonts/a.ttf")));
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));

    cfg.apply_env_overrides(|_| Some(PathBuf::new()));
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
}

#[test]
fn validation_rejects_zero_rates() {
    let mut cfg = RecorderConfig {
        frame_interval_ms: 0,
        ..RecorderConfig::default()
    };
    assert!(cfg.validate().is_err());
    cfg.frame_interval_ms = 33;
    cfg.fps = Fps { num: 30, den: 0 };
    assert!(cfg.validate().is_err());
    cfg.fps = Fps::default();
    cfg.microphone.format.channels = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn malformed_json_is_a_validation_error() {
    let err = RecorderConfig::from_json_str("{ nope").unwrap_err();
    assert!(matches!(err, SlidecastError::Validation(_)));
}

#[test]
fn recorder_opts_carry_timing_and_marks() {
    let cfg = RecorderConfig {
        frame_interval_ms: 50,
        ready_timeout_ms: 500,
        frame_marks: false,
        ..RecorderConfig::default()
    };
    let opts = cfg.recorder_opts();
    assert_eq!(opts.frame_interval, Duration::from_millis(50));
    assert_eq!(opts.ready_timeout, Duration::from_millis(500));
    assert!(!opts.compositor.frame_marks);
}
