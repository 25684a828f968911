//! Shared filesystem and network plumbing used across pipeline stages.

pub mod fs;
pub mod http;
