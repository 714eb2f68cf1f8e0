// src/testing/mod.rs
pub mod mocks;
