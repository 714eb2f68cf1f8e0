// src/recorder/notify.rs
use std::path::Path;
use std::sync::Arc;

use crate::core::bus::DistributionBus;
use crate::frame::notification::DiskIoPhase;
use crate::frame::{EventPhase, Frame, Notification};

/// Wraps lifecycle notifications into frames and hands them to the bus.
/// Holds no state beyond where to send them.
#[derive(Clone)]
pub struct NotificationEmitter {
    source_id: String,
    bus: Arc<dyn DistributionBus>,
}

impl NotificationEmitter {
    pub fn new(source_id: &str, bus: Arc<dyn DistributionBus>) -> Self {
        Self {
            source_id: source_id.to_string(),
            bus,
        }
    }

    fn emit(&self, now_us: u64, notification: Notification) {
        let frame = Frame::notification(&self.source_id, now_us, notification);
        self.bus.publish(frame.into_ptr());
    }

    pub fn event_begin(&self, event_seq: u64, alarm_source_id: u64, now_us: u64) {
        self.emit(
            now_us,
            Notification::event(event_seq, alarm_source_id, EventPhase::Begin),
        );
    }

    pub fn event_end(&self, event_seq: u64, alarm_source_id: u64, duration_secs: f64, now_us: u64) {
        self.emit(
            now_us,
            Notification::event(event_seq, alarm_source_id, EventPhase::End { duration_secs }),
        );
    }

    pub fn write_begin(&self, path: &Path, now_us: u64) {
        self.emit(
            now_us,
            Notification::disk_write(DiskIoPhase::Begin {
                path: path.to_path_buf(),
            }),
        );
    }

    pub fn write_end(&self, path: &Path, size_bytes: u64, now_us: u64) {
        self.emit(
            now_us,
            Notification::disk_write(DiskIoPhase::End {
                path: path.to_path_buf(),
                size_bytes,
            }),
        );
    }
}
