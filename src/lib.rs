// ABOUTME: Library root for dockstream - streaming transport for container engine APIs.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod error;
pub mod output;
pub mod runtime;
pub mod stream;
pub mod types;
