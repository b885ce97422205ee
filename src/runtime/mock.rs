//! In-memory container runtime
//!
//! Tracks named instances like a container engine would (a name can only be
//! taken once) and serves scripted log output on virtual or real time.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use super::error::RuntimeError;
use super::{ContainerRuntime, LaunchSpec};
use crate::watcher::LogStream;

#[derive(Debug, Default)]
struct MockState {
    /// name -> (instance id, spec)
    instances: HashMap<String, (String, LaunchSpec)>,
    launches: u64,
    streams_opened: usize,
}

/// Scripted [`ContainerRuntime`].
///
/// Every `stream_output` call replays the same script: `(delay, line)` pairs
/// relative to when the stream was opened. The sender stays open afterwards,
/// like a live `docker logs -f`.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
    script: Vec<(Duration, String)>,
    fail_start: bool,
    /// Streams opened beyond this count fail
    stream_limit: Option<usize>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_script(mut self, script: Vec<(Duration, String)>) -> Self {
        self.script = script;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Every `stream_output` call fails
    pub fn failing_streams(self) -> Self {
        self.failing_streams_after(0)
    }

    /// The first `opened` streams work, later ones fail
    pub fn failing_streams_after(mut self, opened: usize) -> Self {
        self.stream_limit = Some(opened);
        self
    }

    /// Names of live instances, sorted
    pub fn instances(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .map(|s| s.instances.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn launched_spec(&self, name: &str) -> Option<LaunchSpec> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.instances.get(name).map(|(_, spec)| spec.clone()))
    }

    pub fn streams_opened(&self) -> usize {
        self.state.lock().map(|s| s.streams_opened).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|_| RuntimeError::NotRunning("mock state poisoned".to_string()))
    }
}

async fn replay(tx: mpsc::Sender<String>, script: Vec<(Duration, String)>) {
    for (delay, line) in script {
        tokio::time::sleep(delay).await;
        if tx.send(line).await.is_err() {
            return;
        }
    }
    tx.closed().await;
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn remove_if_exists(&self, name: &str) -> Result<(), RuntimeError> {
        self.lock()?.instances.remove(name);
        Ok(())
    }

    async fn start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        if self.fail_start {
            return Err(RuntimeError::CommandFailed {
                command: format!("run {}", spec.image),
                status: "exit status: 125".to_string(),
                output: "Unable to find image".to_string(),
            });
        }

        let mut state = self.lock()?;
        if state.instances.contains_key(&spec.name) {
            return Err(RuntimeError::NameConflict(spec.name.clone()));
        }
        state.launches += 1;
        let id = format!("mock-{:04}", state.launches);
        state
            .instances
            .insert(spec.name.clone(), (id.clone(), spec.clone()));
        Ok(id)
    }

    async fn stream_output(
        &self,
        name: &str,
        _tail_lines: usize,
    ) -> Result<LogStream, RuntimeError> {
        {
            let mut state = self.lock()?;
            if !state.instances.contains_key(name) {
                return Err(RuntimeError::NotRunning(name.to_string()));
            }
            if self
                .stream_limit
                .is_some_and(|limit| state.streams_opened >= limit)
            {
                return Err(RuntimeError::CommandFailed {
                    command: format!("logs -f {}", name),
                    status: "exit status: 1".to_string(),
                    output: "error from daemon".to_string(),
                });
            }
            state.streams_opened += 1;
        }

        let (tx, rx) = mpsc::channel(256);
        let feeder = tokio::spawn(replay(tx, self.script.clone()));
        // Aborting the feeder on drop mirrors killing `docker logs -f`
        Ok(LogStream::with_reader(rx, AbortOnDrop(feeder)))
    }
}

struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RestartPolicy;

    fn spec(name: &str) -> LaunchSpec {
        LaunchSpec {
            image: "guardian:test".to_string(),
            name: name.to_string(),
            volumes: vec![],
            env: vec![],
            restart: RestartPolicy::UnlessStopped,
            pull_always: false,
        }
    }

    #[tokio::test]
    async fn test_name_can_only_be_taken_once() {
        let runtime = MockRuntime::new();
        runtime.start(&spec("mawari_worker1")).await.unwrap();
        let second = runtime.start(&spec("mawari_worker1")).await;
        assert!(matches!(second, Err(RuntimeError::NameConflict(_))));

        runtime.remove_if_exists("mawari_worker1").await.unwrap();
        runtime.start(&spec("mawari_worker1")).await.unwrap();
        assert_eq!(runtime.instances(), vec!["mawari_worker1".to_string()]);
    }

    #[tokio::test]
    async fn test_streams_fail_after_limit() {
        let runtime = MockRuntime::new().failing_streams_after(1);
        runtime.start(&spec("mawari_worker1")).await.unwrap();

        assert!(runtime.stream_output("mawari_worker1", 200).await.is_ok());
        let second = runtime.stream_output("mawari_worker1", 200).await;
        assert!(matches!(second, Err(RuntimeError::CommandFailed { .. })));
        assert_eq!(runtime.streams_opened(), 1);
    }

    #[tokio::test]
    async fn test_stream_requires_running_instance() {
        let runtime = MockRuntime::new();
        let result = runtime.stream_output("mawari_worker1", 200).await;
        assert!(matches!(result, Err(RuntimeError::NotRunning(_))));
    }
}
