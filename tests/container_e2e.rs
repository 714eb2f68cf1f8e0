use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;

use event_recorder::RecorderError;
use event_recorder::codecs::{
    AudioParams, ContainerEncoder, EncoderConfig, FrameRate, Metadata, SourceParams, VideoParams,
};
use event_recorder::frame::{
    AudioPayload, DiskIoPhase, Frame, FramePtr, Notification, PixelFormat, VideoPayload,
};
use event_recorder::recorder::{AlarmState, EventController, EventTiming, NotificationEmitter};
use event_recorder::testing::mocks::MockBus;

const SEC: u64 = 1_000_000;

fn temp_location(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("evr-e2e-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp location");
    dir
}

fn controller(
    location: &Path,
    format: &str,
    video: VideoParams,
    source: SourceParams,
) -> (EventController, Arc<MockBus>) {
    let bus = Arc::new(MockBus::new());
    let ctrl = EventController::new(
        "cam",
        location,
        EventTiming::default(),
        Box::new(ContainerEncoder::new()),
        EncoderConfig {
            format: format.to_string(),
            video,
            audio: AudioParams::default(),
            metadata: Metadata::default(),
        },
        source,
        NotificationEmitter::new("cam", bus.clone()),
    );
    (ctrl, bus)
}

fn gray_source(has_audio: bool) -> SourceParams {
    SourceParams {
        width: 4,
        height: 4,
        pixel_format: PixelFormat::Gray8,
        frame_rate: FrameRate::new(10, 1),
        has_video: true,
        has_audio,
    }
}

fn gray_params(width: u32, height: u32) -> VideoParams {
    VideoParams {
        width,
        height,
        pixel_format: PixelFormat::Gray8,
        frame_rate: FrameRate::new(10, 1),
        ..VideoParams::default()
    }
}

fn video(secs: u64, alarmed: bool) -> FramePtr {
    Frame::video(
        "cam",
        secs * SEC,
        Some(alarmed),
        VideoPayload {
            width: 4,
            height: 4,
            pixel_format: PixelFormat::Gray8,
            data: Bytes::from((0u8..16).collect::<Vec<u8>>()),
        },
    )
    .into_ptr()
}

fn audio(secs: u64, alarmed: bool) -> FramePtr {
    Frame::audio(
        "cam",
        secs * SEC,
        Some(alarmed),
        AudioPayload {
            sample_rate: 8_000,
            channels: 1,
            samples: Arc::new(vec![secs as i16; 800]),
        },
    )
    .into_ptr()
}

fn write_end_size(bus: &MockBus) -> Option<u64> {
    bus.notifications().iter().find_map(|n| match n {
        Notification::DiskIo {
            phase: DiskIoPhase::End { size_bytes, .. },
            ..
        } => Some(*size_bytes),
        _ => None,
    })
}

#[test]
fn test_native_event_file_layout() -> anyhow::Result<()> {
    let location = temp_location("native");
    let (mut ctrl, bus) = controller(&location, "evr", gray_params(4, 4), gray_source(false));

    for (t, alarmed) in [(0, false), (1, false), (2, true), (3, false), (10, false)] {
        ctrl.process(&video(t, alarmed), t * SEC)?;
    }
    assert_eq!(ctrl.state(), AlarmState::Idle);

    let path = location.join("cam-1.evr");
    let bytes = std::fs::read(&path)?;
    assert_eq!(&bytes[..4], b"EVR1");

    // pre-roll (t=0,1), onset (t=2) and t=3; the closing frame stays out
    let mut trailer = Cursor::new(&bytes[bytes.len() - 20..]);
    let mut magic = [0u8; 4];
    trailer.read_exact(&mut magic)?;
    assert_eq!(&magic, b"EVRE");
    assert_eq!(trailer.read_u64::<LittleEndian>()?, 4);
    assert_eq!(trailer.read_u64::<LittleEndian>()?, 0);

    assert_eq!(write_end_size(&bus), Some(bytes.len() as u64));

    std::fs::remove_dir_all(&location)?;
    Ok(())
}

#[test]
fn test_native_rescales_to_target_resolution() -> anyhow::Result<()> {
    let location = temp_location("rescale");
    let (mut ctrl, _bus) = controller(&location, "evr", gray_params(8, 8), gray_source(false));

    ctrl.process(&video(0, true), 0)?;
    ctrl.finish(SEC)?;

    let bytes = std::fs::read(location.join("cam-1.evr"))?;
    // record: stream u8 | pts u64 | ts u64 | len u32 | data; last before trailer
    let record_len_at = bytes.len() - 20 - 64 - 4;
    let mut cur = Cursor::new(&bytes[record_len_at..]);
    assert_eq!(cur.read_u32::<LittleEndian>()?, 64);

    std::fs::remove_dir_all(&location)?;
    Ok(())
}

#[test]
fn test_wav_event_holds_audio_only() -> anyhow::Result<()> {
    let location = temp_location("wav");
    let (mut ctrl, bus) = controller(&location, "wav", gray_params(4, 4), gray_source(true));

    ctrl.process(&audio(0, true), 0)?;
    ctrl.process(&video(0, true), 0)?;
    ctrl.process(&audio(1, true), SEC)?;
    ctrl.finish(2 * SEC)?;

    let path = location.join("cam-1.wav");
    let reader = hound::WavReader::open(&path)?;
    assert_eq!(reader.spec().sample_rate, 8_000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 1_600);

    let size = std::fs::metadata(&path)?.len();
    assert_eq!(write_end_size(&bus), Some(size));

    std::fs::remove_dir_all(&location)?;
    Ok(())
}

#[test]
fn test_unknown_format_is_fatal_at_onset() {
    let location = temp_location("unknown");
    let (mut ctrl, bus) = controller(&location, "mkv", gray_params(4, 4), gray_source(false));

    ctrl.process(&video(0, false), 0).unwrap();
    let err = ctrl.process(&video(1, true), SEC).unwrap_err();
    assert!(matches!(err, RecorderError::UnknownFormat { ref format } if format == "mkv"));

    // BEGIN is out, no file was ever announced
    assert_eq!(bus.event_notifications().len(), 1);
    assert!(
        bus.notifications()
            .iter()
            .all(|n| !matches!(n, Notification::DiskIo { .. }))
    );
    assert!(!location.join("cam-1.mkv").exists());

    let _ = std::fs::remove_dir_all(&location);
}

#[test]
fn test_wav_without_audio_stream_fails_to_open() {
    let location = temp_location("wav-noaudio");
    let (mut ctrl, _bus) = controller(&location, "wav", gray_params(4, 4), gray_source(false));

    let err = ctrl.process(&video(0, true), 0).unwrap_err();
    assert!(matches!(err, RecorderError::OutputContext { .. }));

    let _ = std::fs::remove_dir_all(&location);
}

#[test]
fn test_pixel_format_change_rejected_at_open() {
    let location = temp_location("pixfmt");
    let params = VideoParams {
        pixel_format: PixelFormat::Rgb24,
        ..gray_params(4, 4)
    };
    let (mut ctrl, _bus) = controller(&location, "evr", params, gray_source(false));

    let err = ctrl.process(&video(0, true), 0).unwrap_err();
    assert!(matches!(err, RecorderError::Conversion { .. }));

    let _ = std::fs::remove_dir_all(&location);
}

#[test]
fn test_missing_location_fails_open() {
    let location = std::env::temp_dir().join(format!("evr-e2e-missing-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&location);
    let (mut ctrl, _bus) = controller(&location, "evr", gray_params(4, 4), gray_source(false));

    let err = ctrl.process(&video(0, true), 0).unwrap_err();
    assert!(matches!(err, RecorderError::OpenTarget { .. }));
}
