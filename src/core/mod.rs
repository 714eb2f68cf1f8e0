pub mod bus;
pub mod consumer;
pub mod error;
pub mod lock;
pub mod logging;
pub mod timestamp;
pub mod wait;

pub use bus::{DistributionBus, FrameBus, NotificationLog};
pub use consumer::{Consumer, ConsumerStatus};
pub use error::{ConfigError, RecorderError, RecorderResult};
pub use logging::{ComponentLogger, LogContext};
pub use timestamp::{Clock, ManualClock, SystemClock};
