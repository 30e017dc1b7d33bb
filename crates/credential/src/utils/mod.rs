//! Utility functions

pub mod time;

pub use time::{now_millis, remaining};
