use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const US_PER_SEC: u64 = 1_000_000;

pub fn utc_us_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

pub fn format_utc_us(utc_us: u64) -> String {
    match chrono::DateTime::from_timestamp_micros(utc_us as i64) {
        Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        None => format!("{}.{:06}", utc_us / US_PER_SEC, utc_us % US_PER_SEC),
    }
}

/// Seconds between two microsecond timestamps, as reported in event END notifications.
pub fn span_secs(from_us: u64, to_us: u64) -> f64 {
    (to_us as f64 - from_us as f64) / US_PER_SEC as f64
}

/// Source of "now" for the recording loop.
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        utc_us_now()
    }
}

/// Hand-driven clock for replaying recorded frame sequences.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_us)),
        }
    }

    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_us: u64) -> u64 {
        self.now.fetch_add(delta_us, Ordering::SeqCst) + delta_us
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
