// src/producers/mod.rs
pub mod synthetic;

pub use synthetic::{AlarmSchedule, SyntheticProducer, SyntheticProvider};

pub trait Producer: Send {
    fn name(&self) -> &str;
    fn start(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self) -> anyhow::Result<()>;
    fn status(&self) -> ProducerStatus;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProducerStatus {
    pub running: bool,
    pub frames_produced: u64,
    pub alarmed_frames: u64,
}
