use super::*;

fn cfg(audio: Option<AudioFormat>) -> SinkConfig {
    SinkConfig {
        width: 4,
        height: 2,
        fps: Fps::default(),
        bitrate: 1_000,
        audio,
    }
}

#[test]
fn frames_become_ordered_chunks() {
    let mut sink = InMemorySink::new();
    let probe = sink.probe();
    let report = sink.begin(cfg(None)).unwrap();
    assert_eq!(report.audio, AudioAttachment::NotRequested);
    assert_eq!(sink.poll_state().unwrap(), EncoderState::Recording);

    let frame = FrameRGBA::transparent(4, 2);
    sink.push_frame(FrameIndex(0), &frame).unwrap();
    sink.push_frame(FrameIndex(3), &frame).unwrap();
    let chunks = sink.finish().unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(&chunks[1][..8], &3u64.to_le_bytes());
    assert_eq!(probe.frame_indices(), vec![FrameIndex(0), FrameIndex(3)]);
    assert!(probe.finished());
    assert_eq!(probe.config().unwrap().width, 4);
}

#[test]
fn out_of_order_frames_are_rejected() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(None)).unwrap();
    let frame = FrameRGBA::transparent(4, 2);
    sink.push_frame(FrameIndex(5), &frame).unwrap();
    assert!(sink.push_frame(FrameIndex(5), &frame).is_err());
    assert!(sink.push_frame(FrameIndex(2), &frame).is_err());
    assert_eq!(sink.probe().frame_count(), 1);
}

#[test]
fn no_frames_means_no_chunks() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(None)).unwrap();
    assert!(sink.finish().unwrap().is_empty());
}

#[test]
fn unstarted_sink_refuses_work() {
    let mut sink = InMemorySink::new();
    assert!(sink.poll_state().is_err());
    assert!(
        sink.push_frame(FrameIndex(0), &FrameRGBA::transparent(1, 1))
            .is_err()
    );
    assert!(sink.finish().is_err());
}

#[test]
fn audio_attachment_reflects_support() {
    let mut with_audio = InMemorySink::new();
    let probe = with_audio.probe();
    let report = with_audio.begin(cfg(Some(AudioFormat::default()))).unwrap();
    assert!(matches!(report.audio, AudioAttachment::Attached { .. }));
    with_audio.push_audio(&[0.0; 96]).unwrap();
    assert_eq!(probe.audio_samples(), 96);

    let mut video_only = InMemorySink::video_only();
    let report = video_only.begin(cfg(Some(AudioFormat::default()))).unwrap();
    assert!(matches!(report.audio, AudioAttachment::Skipped { .. }));
    video_only.push_audio(&[0.0; 96]).unwrap();
    assert_eq!(video_only.probe().audio_samples(), 0);
}

#[test]
fn closures_are_sink_factories() {
    let factory = || -> SlidecastResult<Box<dyn EncoderSink>> { Ok(Box::new(InMemorySink::new())) };
    let sink = SinkFactory::create(&factory).unwrap();
    assert_eq!(sink.extension(), "webm");
}
