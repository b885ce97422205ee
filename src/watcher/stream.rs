use tokio::sync::mpsc;

/// Result of a non-blocking read
#[derive(Debug, PartialEq, Eq)]
pub enum NextLine {
    Line(String),
    /// Nothing buffered right now
    Pending,
    /// The producer is gone; no more lines will arrive
    Closed,
}

/// Live handle on a process's combined output.
///
/// Dropping the stream releases its reader resources (e.g. a `docker logs -f`
/// child). The process being read is never touched.
pub struct LogStream {
    lines: mpsc::Receiver<String>,
    _reader: Option<Box<dyn Send>>,
}

impl LogStream {
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines,
            _reader: None,
        }
    }

    /// Tie reader resources to the stream's lifetime
    pub fn with_reader(lines: mpsc::Receiver<String>, reader: impl Send + 'static) -> Self {
        Self {
            lines,
            _reader: Some(Box::new(reader)),
        }
    }

    /// In-process stream, mostly for tests and replay
    pub fn channel(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub fn try_next(&mut self) -> NextLine {
        match self.lines.try_recv() {
            Ok(line) => NextLine::Line(line),
            Err(mpsc::error::TryRecvError::Empty) => NextLine::Pending,
            Err(mpsc::error::TryRecvError::Disconnected) => NextLine::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_try_next_states() {
        let (tx, mut stream) = LogStream::channel(4);
        assert_eq!(stream.try_next(), NextLine::Pending);

        tx.send("hello".to_string()).await.unwrap();
        assert_eq!(stream.try_next(), NextLine::Line("hello".to_string()));

        drop(tx);
        assert_eq!(stream.try_next(), NextLine::Closed);
    }

    #[test]
    fn test_reader_released_on_drop() {
        let released = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = mpsc::channel::<String>(1);
        let stream = LogStream::with_reader(rx, DropFlag(released.clone()));

        assert!(!released.load(Ordering::SeqCst));
        drop(stream);
        assert!(released.load(Ordering::SeqCst));
    }
}
