//! Tubeproxy - YouTube-backed music player backend
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod resolver;
pub mod server;
pub mod streaming;
pub mod upstream;
