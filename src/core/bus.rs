// src/core/bus.rs
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, unbounded};

use super::lock::lock_mutex;
use super::logging::{ComponentLogger, LogContext};
use crate::frame::FramePtr;

/// Fire-and-forget fan-out of frames to other consumers.
pub trait DistributionBus: Send + Sync {
    fn publish(&self, frame: FramePtr);
}

/// Channel based bus: every subscriber gets its own unbounded receiver.
pub struct FrameBus {
    name: String,
    subscribers: Mutex<Vec<Sender<FramePtr>>>,
    published: AtomicU64,
}

impl FrameBus {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Mutex::new(Vec::new()),
            published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> Receiver<FramePtr> {
        let (tx, rx) = unbounded();
        let mut subs = lock_mutex(&self.subscribers, "FrameBus::subscribe");
        subs.push(tx);
        self.debug(&format!("subscriber added (total: {})", subs.len()));
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        lock_mutex(&self.subscribers, "FrameBus::subscriber_count").len()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl DistributionBus for FrameBus {
    fn publish(&self, frame: FramePtr) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let mut subs = lock_mutex(&self.subscribers, "FrameBus::publish");
        let before = subs.len();
        subs.retain(|tx| tx.send(frame.clone()).is_ok());
        if subs.len() < before {
            self.debug(&format!("pruned {} disconnected subscriber(s)", before - subs.len()));
        }
    }
}

impl ComponentLogger for FrameBus {
    fn log_context(&self) -> LogContext {
        LogContext::new("FrameBus", &self.name)
    }
}

/// Bus subscriber that logs every notification and optionally appends it
/// as a JSON line to a file. Runs until the bus side disconnects.
pub struct NotificationLog {
    handle: Option<JoinHandle<()>>,
}

impl NotificationLog {
    pub fn spawn(rx: Receiver<FramePtr>, jsonl_path: Option<PathBuf>) -> Result<Self> {
        let mut writer = match &jsonl_path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(BufWriter::new(file))
            }
            None => None,
        };

        let handle = std::thread::Builder::new()
            .name("notification-log".into())
            .spawn(move || {
                for frame in rx.iter() {
                    let Some(notification) = frame.as_notification() else {
                        continue;
                    };
                    let line = notification.to_json();
                    log::info!("[notify] {} {}", frame.source_id, line);

                    if let Some(w) = writer.as_mut() {
                        if let Err(e) = writeln!(w, "{}", line).and_then(|_| w.flush()) {
                            log::error!("[notify] failed to append notification: {}", e);
                        }
                    }
                }
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the subscriber thread; returns once every sender is gone.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("[notify] log thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{EventPhase, Frame, Notification};

    fn note(seq: u64) -> FramePtr {
        Frame::notification("bus-test", 0, Notification::event(seq, 1, EventPhase::Begin)).into_ptr()
    }

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let bus = FrameBus::new("test");
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(note(1));

        assert_eq!(a.try_recv().unwrap().as_notification(), note(1).as_notification());
        assert!(b.try_recv().is_ok());
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn test_disconnected_subscriber_pruned() {
        let bus = FrameBus::new("test");
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(note(1));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn test_notification_log_writes_json_lines() -> Result<()> {
        let path = std::env::temp_dir().join(format!("event-recorder-notify-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let bus = FrameBus::new("test");
        let log = NotificationLog::spawn(bus.subscribe(), Some(path.clone()))?;
        bus.publish(note(1));
        bus.publish(note(2));
        drop(bus);
        log.join();

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"event_seq\":2"));
        Ok(())
    }
}
