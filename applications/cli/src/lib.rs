//! Cadence CLI - headless player around the playback service

pub mod console;
pub mod display;
pub mod scan;
