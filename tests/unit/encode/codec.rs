use super::*;

const LISTING: &str = "Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC (codec h264)
 V....D libvpx               libvpx VP8 (codec vp8)
 A....D libvorbis            libvorbis (codec vorbis)
 A....D aac                  AAC (Advanced Audio Coding)
";

fn set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn listing_is_parsed_after_separator() {
    let encoders = parse_encoders(LISTING);
    assert!(encoders.contains("libvpx"));
    assert!(encoders.contains("libvorbis"));
    assert!(!encoders.contains("="));
    assert_eq!(encoders.len(), 4);
}

#[test]
fn vp9_and_opus_are_preferred() {
    let choice = negotiate(
        &set(&["libvpx", "libvpx-vp9", "libvorbis", "libopus"]),
        true,
    )
    .unwrap();
    assert_eq!(choice.video, VideoCodec::Vp9);
    assert_eq!(choice.audio, Some(AudioCodec::Opus));
    assert_eq!(choice.mime_type(), "video/webm;codecs=vp9,opus");
}

#[test]
fn falls_back_to_baseline_codecs() {
    let choice = negotiate(&parse_encoders(LISTING), true).unwrap();
    assert_eq!(choice.video, VideoCodec::Vp8);
    assert_eq!(choice.audio, Some(AudioCodec::Vorbis));
}

#[test]
fn missing_audio_encoder_is_not_fatal() {
    let choice = negotiate(&set(&["libvpx-vp9"]), true).unwrap();
    assert_eq!(choice.audio, None);
    assert_eq!(choice.mime_type(), "video/webm;codecs=vp9");
}

#[test]
fn audio_is_not_chosen_unless_requested() {
    let choice = negotiate(&set(&["libvpx-vp9", "libopus"]), false).unwrap();
    assert_eq!(choice.audio, None);
}

#[test]
fn no_video_encoder_is_an_encoder_error() {
    let err = negotiate(&set(&["libx264", "libopus"]), true).unwrap_err();
    assert!(matches!(err, SlidecastError::Encoder(_)));
}
