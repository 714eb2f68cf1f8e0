// src/ring/mod.rs
pub mod frame_store;
pub mod queue;

pub use frame_store::FrameStore;
pub use queue::FrameQueue;
