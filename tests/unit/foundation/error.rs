use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SlidecastError::decode("x")
            .to_string()
            .contains("decode error:")
    );
    assert!(
        SlidecastError::encoder("x")
            .to_string()
            .contains("encoder error:")
    );
    assert!(
        SlidecastError::composite("x")
            .to_string()
            .contains("composite error:")
    );
    assert!(
        SlidecastError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert_eq!(
        SlidecastError::EmptyOutput.to_string(),
        "encoder error: no data generated"
    );
}

#[test]
fn device_errors_carry_failure_class() {
    let e = SlidecastError::permission_denied("camera blocked");
    assert_eq!(e.device_failure(), Some(DeviceFailure::PermissionDenied));
    assert!(e.to_string().contains("permission denied"));

    let e = SlidecastError::device_unavailable("no /dev/video0");
    assert_eq!(e.device_failure(), Some(DeviceFailure::Unavailable));
    assert!(e.to_string().contains("no /dev/video0"));

    assert_eq!(SlidecastError::AlreadyRecording.device_failure(), None);
}

#[test]
fn unsupported_format_is_a_decode_error() {
    let e = SlidecastError::unsupported_format("text/plain");
    assert!(matches!(e, SlidecastError::Decode(_)));
    assert!(e.to_string().contains("unsupported format: text/plain"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SlidecastError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
