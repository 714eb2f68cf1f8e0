// src/frame/notification.rs
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NOTIFICATION_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide id for disk I/O notifications, starting at 1.
pub fn next_notification_id() -> u64 {
    NOTIFICATION_ID.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum EventPhase {
    Begin,
    End { duration_secs: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskIoDirection {
    Write,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum DiskIoPhase {
    Begin { path: PathBuf },
    End { path: PathBuf, size_bytes: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notification {
    Event {
        event_seq: u64,
        alarm_source_id: u64,
        #[serde(flatten)]
        phase: EventPhase,
    },
    DiskIo {
        notification_id: u64,
        direction: DiskIoDirection,
        #[serde(flatten)]
        phase: DiskIoPhase,
    },
}

impl Notification {
    pub fn event(event_seq: u64, alarm_source_id: u64, phase: EventPhase) -> Self {
        Notification::Event {
            event_seq,
            alarm_source_id,
            phase,
        }
    }

    pub fn disk_write(phase: DiskIoPhase) -> Self {
        Notification::DiskIo {
            notification_id: next_notification_id(),
            direction: DiskIoDirection::Write,
            phase,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
