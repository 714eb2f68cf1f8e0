use std::sync::Arc;

use bytes::Bytes;

use event_recorder::codecs::{EncoderConfig, FrameRate, SourceParams};
use event_recorder::core::{ComponentLogger, FrameBus, LogContext};
use event_recorder::frame::{Frame, PixelFormat, VideoPayload};
use event_recorder::recorder::{EventController, EventTiming, NotificationEmitter};
use event_recorder::testing::mocks::{MockBus, MockEncoder};

fn controller() -> EventController {
    EventController::new(
        "porch",
        "/events",
        EventTiming::default(),
        Box::new(MockEncoder::new()),
        EncoderConfig {
            format: "evr".into(),
            video: Default::default(),
            audio: Default::default(),
            metadata: Default::default(),
        },
        SourceParams {
            width: 1,
            height: 1,
            pixel_format: PixelFormat::Gray8,
            frame_rate: FrameRate::new(1, 1),
            has_video: true,
            has_audio: false,
        },
        NotificationEmitter::new("porch", Arc::new(MockBus::new())),
    )
}

#[test]
fn test_controller_context_tracks_open_event() {
    let mut ctrl = controller();
    let idle = ctrl.log_context();
    assert_eq!(idle.component, "EventController");
    assert_eq!(idle.instance_id, "porch");
    assert!(idle.event_seq.is_none());

    let frame = Frame::video(
        "porch",
        0,
        Some(true),
        VideoPayload {
            width: 1,
            height: 1,
            pixel_format: PixelFormat::Gray8,
            data: Bytes::from_static(&[7]),
        },
    )
    .into_ptr();
    ctrl.process(&frame, 0).unwrap();

    let recording = ctrl.log_context();
    assert_eq!(recording.event_seq, Some(1));
    assert!(recording.format("INFO", "x").contains("[EventController:porch event=1]"));

    ctrl.finish(1).unwrap();
    assert!(ctrl.log_context().event_seq.is_none());
}

#[test]
fn test_sequence_increases_across_components() {
    let bus = FrameBus::new("notifications");
    let first = bus.log_context();
    let second = controller().log_context();
    assert!(second.sequence > first.sequence);
    assert_eq!(first.component, "FrameBus");
}

#[test]
fn test_default_methods_do_not_panic_without_logger() {
    struct Quiet;
    impl ComponentLogger for Quiet {
        fn log_context(&self) -> LogContext {
            LogContext::new("Quiet", "0")
        }
    }

    let q = Quiet;
    q.debug("d");
    q.info("i");
    q.warn("w");
    q.error("e");
}
