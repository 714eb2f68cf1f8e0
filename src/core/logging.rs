// src/core/logging.rs
use std::sync::atomic::{AtomicU64, Ordering};

use super::timestamp::utc_us_now;

// Global sequence number for correlating lines across threads
static LOG_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub instance_id: String,
    pub event_seq: Option<u64>,
    pub sequence: u64,
    pub timestamp_us: u64,
}

impl LogContext {
    pub fn new(component: &str, instance_id: &str) -> Self {
        Self {
            component: component.to_string(),
            instance_id: instance_id.to_string(),
            event_seq: None,
            sequence: LOG_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            timestamp_us: utc_us_now(),
        }
    }

    pub fn with_event(mut self, event_seq: u64) -> Self {
        self.event_seq = Some(event_seq);
        self
    }

    pub fn format(&self, level: &str, message: &str) -> String {
        let event_info = match self.event_seq {
            Some(seq) => format!(" event={}", seq),
            None => String::new(),
        };

        format!(
            "[{}][seq={:06}][{}:{}{}] {}",
            level, self.sequence, self.component, self.instance_id, event_info, message
        )
    }
}

pub trait ComponentLogger {
    fn log_context(&self) -> LogContext;

    fn debug(&self, message: &str) {
        let ctx = self.log_context();
        log::debug!("{}", ctx.format("DEBUG", message));
    }

    fn info(&self, message: &str) {
        let ctx = self.log_context();
        log::info!("{}", ctx.format("INFO", message));
    }

    fn warn(&self, message: &str) {
        let ctx = self.log_context();
        log::warn!("{}", ctx.format("WARN", message));
    }

    fn error(&self, message: &str) {
        let ctx = self.log_context();
        log::error!("{}", ctx.format("ERROR", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_creation() {
        let ctx = LogContext::new("VideoRecorder", "front-door");

        assert_eq!(ctx.component, "VideoRecorder");
        assert_eq!(ctx.instance_id, "front-door");
        assert!(ctx.timestamp_us > 0);
        assert!(ctx.event_seq.is_none());
    }

    #[test]
    fn test_log_formatting() {
        let ctx = LogContext::new("Test", "001");
        let formatted = ctx.format("INFO", "Starting up");

        assert!(formatted.contains("[INFO]"));
        assert!(formatted.contains("[Test:001]"));
        assert!(formatted.contains("Starting up"));

        let with_event = ctx.with_event(7);
        let formatted = with_event.format("DEBUG", "Flushing");
        assert!(formatted.contains("[Test:001 event=7]"));
    }

    #[test]
    fn test_component_logger_trait() {
        struct MockComponent {
            id: String,
        }

        impl ComponentLogger for MockComponent {
            fn log_context(&self) -> LogContext {
                LogContext::new("Mock", &self.id)
            }
        }

        let component = MockComponent {
            id: "test_001".to_string(),
        };
        let ctx = component.log_context();
        assert_eq!(ctx.component, "Mock");
        assert_eq!(ctx.instance_id, "test_001");
        component.info("smoke");
    }
}
