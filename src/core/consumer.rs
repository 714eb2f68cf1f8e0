use anyhow::Result;

/// Lifecycle shared by the long-running frame consumers.
pub trait Consumer: Send {
    fn name(&self) -> &str;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn status(&self) -> ConsumerStatus;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerStatus {
    pub running: bool,
    pub connected: bool,
    pub recording: bool,
    pub frames_processed: u64,
    pub frames_encoded: u64,
    pub events_recorded: u64,
    pub errors: u64,
}
