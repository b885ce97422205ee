//! Docker CLI runtime
//!
//! Shells out to the `docker` binary with `tokio::process`. Log streaming
//! runs `docker logs -f` as a child whose lifetime is bound to the returned
//! [`LogStream`]; dropping the stream kills the follower, never the container.

use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::error::RuntimeError;
use super::{ContainerRuntime, LaunchSpec};
use crate::watcher::LogStream;

const LOG_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Use another docker-compatible binary (e.g. `podman`)
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    async fn output(&self, args: &[String]) -> Result<Output, RuntimeError> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(args),
                source,
            })
    }
}

/// Arguments for `docker run` in detached mode
pub fn run_args(spec: &LaunchSpec) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if spec.pull_always {
        args.extend(["--pull".to_string(), "always".to_string()]);
    }
    args.extend(["--name".to_string(), spec.name.clone()]);
    for volume in &spec.volumes {
        args.push("-v".to_string());
        args.push(format!("{}:{}", volume.host.display(), volume.container));
    }
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(format!("--restart={}", spec.restart));
    args.push("-d".to_string());
    args.push(spec.image.clone());
    args
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    text
}

/// Owns the `docker logs -f` child and its pump tasks
struct LogFollower {
    _child: Child,
    pumps: Vec<JoinHandle<()>>,
}

impl Drop for LogFollower {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

/// Forward lines from `reader` until EOF or until the stream is dropped
async fn pump<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn remove_if_exists(&self, name: &str) -> Result<(), RuntimeError> {
        let args = vec!["rm".to_string(), "-f".to_string(), name.to_string()];
        let output = self.output(&args).await?;

        if output.status.success() {
            debug!(container = name, "Removed previous instance");
            return Ok(());
        }

        let text = combined_output(&output);
        if text.contains("No such container") {
            debug!(container = name, "No previous instance");
            return Ok(());
        }

        Err(RuntimeError::CommandFailed {
            command: self.describe(&args),
            status: output.status.to_string(),
            output: text,
        })
    }

    async fn start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        let args = run_args(spec);
        info!("{}", self.describe(&args));

        let output = self.output(&args).await?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: self.describe(&args),
                status: output.status.to_string(),
                output: combined_output(&output),
            });
        }

        // Pull progress may precede the id on stdout
        let stdout = String::from_utf8_lossy(&output.stdout);
        let id = stdout.lines().last().unwrap_or_default().trim().to_string();
        debug!(container = %spec.name, id = %id, "docker run returned");
        Ok(id)
    }

    async fn stream_output(
        &self,
        name: &str,
        tail_lines: usize,
    ) -> Result<LogStream, RuntimeError> {
        let args = vec![
            "logs".to_string(),
            "-f".to_string(),
            format!("--tail={}", tail_lines),
            name.to_string(),
        ];

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(&args),
                source,
            })?;

        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(stderr, tx)));
        }

        debug!(container = name, tail_lines, "Following container output");
        Ok(LogStream::with_reader(
            rx,
            LogFollower {
                _child: child,
                pumps,
            },
        ))
    }
}
