// src/lib.rs
pub mod codecs;
pub mod config;
pub mod core;
pub mod frame;
pub mod producers;
pub mod recorder;
pub mod ring;
pub mod testing;

// Re-export the main types
pub use crate::core::timestamp::utc_us_now;
pub use crate::core::{Consumer, ConsumerStatus, RecorderError, RecorderResult};
pub use frame::{Frame, FramePtr, Notification};
pub use recorder::{AlarmState, EventController, EventTiming, RecorderSettings, VideoRecorder};
pub use ring::{FrameQueue, FrameStore};
