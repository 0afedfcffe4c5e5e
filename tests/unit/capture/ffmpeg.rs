use super::*;

#[test]
fn startup_failures_are_classified() {
    assert_eq!(
        classify_startup_failure("/dev/video0: Permission denied"),
        DeviceFailure::PermissionDenied
    );
    assert_eq!(
        classify_startup_failure("Operation not permitted"),
        DeviceFailure::PermissionDenied
    );
    assert_eq!(
        classify_startup_failure("Failed to authorize: not authorized to capture video"),
        DeviceFailure::PermissionDenied
    );
    assert_eq!(
        classify_startup_failure("/dev/video9: No such file or directory"),
        DeviceFailure::Unavailable
    );
    assert_eq!(classify_startup_failure(""), DeviceFailure::Unavailable);
}

#[tokio::test]
async fn missing_v4l2_node_is_unavailable_without_spawning() {
    let cam = FfmpegCamera {
        input: CaptureInput {
            format: "v4l2".into(),
            device: "/dev/definitely-not-a-camera".into(),
        },
        program: PathBuf::from("definitely-not-ffmpeg"),
        ..FfmpegCamera::default()
    };
    let err = cam.open().await.err().unwrap();
    assert_eq!(err.device_failure(), Some(DeviceFailure::Unavailable));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn missing_program_is_unavailable() {
    let mic = FfmpegMicrophone {
        program: PathBuf::from("definitely-not-ffmpeg"),
        ..FfmpegMicrophone::default()
    };
    let err = mic.open().await.err().unwrap();
    assert_eq!(err.device_failure(), Some(DeviceFailure::Unavailable));
}

#[test]
fn camera_command_requests_rgba_at_fixed_size() {
    let cam = FfmpegCamera {
        width: 320,
        height: 240,
        ..FfmpegCamera::default()
    };
    let cmd = cam.command();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "rgba"));
    assert!(args.iter().any(|a| a.contains("crop=320:240")));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
}
