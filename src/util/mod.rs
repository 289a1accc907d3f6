//! Shared utility functions.

pub mod redis;
pub mod timestamp;
