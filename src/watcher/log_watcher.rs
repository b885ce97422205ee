//! Log Watcher
//!
//! Scans a live log stream for the first line accepted by a [`LineMatcher`],
//! under a wall-clock deadline.
//!
//! Reads are non-blocking with a short sleep between empty reads, so the
//! deadline holds even when the producer stalls: a watch that never matches
//! returns no earlier than `timeout` and no later than `timeout` plus one
//! poll interval.

use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::patterns::LineMatcher;
use super::stream::{LogStream, NextLine};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_TAIL_CAPACITY: usize = 12;

/// First matching line of a watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMatch {
    pub pattern_index: usize,
    pub line: String,
    pub captures: Vec<Option<String>>,
    /// Most recent lines read, ending with the matching one
    pub tail: Vec<String>,
    pub elapsed: Duration,
}

impl LogMatch {
    /// Capture group `index` (1-based, as in the regex)
    pub fn capture(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.captures.get(i))
            .and_then(|c| c.as_deref())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchError {
    #[error("No matching log line within {timeout:?}")]
    TimedOut {
        timeout: Duration,
        tail: Vec<String>,
    },

    #[error("Log watch cancelled after {elapsed:?}")]
    Cancelled {
        elapsed: Duration,
        tail: Vec<String>,
    },
}

impl WatchError {
    pub fn tail(&self) -> &[String] {
        match self {
            WatchError::TimedOut { tail, .. } | WatchError::Cancelled { tail, .. } => tail,
        }
    }

    pub fn into_tail(self) -> Vec<String> {
        match self {
            WatchError::TimedOut { tail, .. } | WatchError::Cancelled { tail, .. } => tail,
        }
    }
}

/// Bounded ring of the last N lines
#[derive(Debug)]
struct Tail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Tail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_vec(self) -> Vec<String> {
        self.lines.into()
    }
}

#[derive(Debug, Clone)]
pub struct LogWatcher {
    poll_interval: Duration,
    tail_capacity: usize,
    cancel: CancellationToken,
}

impl Default for LogWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_TAIL_CAPACITY)
    }
}

impl LogWatcher {
    pub fn new(poll_interval: Duration, tail_capacity: usize) -> Self {
        Self {
            poll_interval,
            tail_capacity,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Watch `stream` until `matcher` accepts a line or `timeout` elapses.
    ///
    /// The stream is consumed and released on every exit path. Every line
    /// read is echoed under the `NODE` log target.
    pub async fn watch(
        &self,
        mut stream: LogStream,
        matcher: &dyn LineMatcher,
        timeout: Duration,
    ) -> Result<LogMatch, WatchError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut tail = Tail::new(self.tail_capacity);
        let mut closed = false;

        loop {
            if self.cancel.is_cancelled() {
                return Err(WatchError::Cancelled {
                    elapsed: started.elapsed(),
                    tail: tail.into_vec(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WatchError::TimedOut {
                    timeout,
                    tail: tail.into_vec(),
                });
            }

            match stream.try_next() {
                NextLine::Line(line) => {
                    let line = line.trim_end().to_string();
                    info!(target: "NODE", "{}", line);
                    tail.push(line.clone());

                    if let Some(hit) = matcher.match_line(&line) {
                        return Ok(LogMatch {
                            pattern_index: hit.pattern_index,
                            line,
                            captures: hit.captures,
                            tail: tail.into_vec(),
                            elapsed: started.elapsed(),
                        });
                    }
                }
                idle @ (NextLine::Pending | NextLine::Closed) => {
                    if idle == NextLine::Closed && !closed {
                        debug!("Log stream closed, waiting out the deadline");
                        closed = true;
                    }

                    let nap = self.poll_interval.min(deadline - now);
                    tokio::select! {
                        _ = tokio::time::sleep(nap) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
            }
        }
    }
}
