//! Log Watcher Module
//!
//! Recovers discrete events (burner announcement, heartbeats) from the
//! guardian node's unstructured output:
//! - [`LogStream`]: non-blocking handle on a live output stream
//! - [`LineMatcher`] / [`PatternSet`]: ordered, swappable line matching
//! - [`LogWatcher`]: deadline-bounded scan returning the first match

pub mod log_watcher;
pub mod patterns;
pub mod stream;

pub use log_watcher::{LogMatch, LogWatcher, WatchError};
pub use patterns::{BURNER_PATTERN, HEARTBEAT_PATTERNS, LineMatch, LineMatcher, PatternSet};
pub use stream::{LogStream, NextLine};
