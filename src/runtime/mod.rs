//! Container Runtime Module
//!
//! Lifecycle of the guardian node container: forced replacement, launch,
//! and live log streaming. The keeper only ever talks to [`ContainerRuntime`];
//! [`DockerCli`] drives the local `docker` binary and [`MockRuntime`] keeps
//! everything in memory.

pub mod docker;
pub mod error;
pub mod mock;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::watcher::LogStream;

pub use docker::DockerCli;
pub use error::RuntimeError;
pub use mock::MockRuntime;

/// Container restart behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    Always,
    #[default]
    UnlessStopped,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::Always => "always",
            RestartPolicy::UnlessStopped => "unless-stopped",
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host directory bind-mounted into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host: PathBuf,
    pub container: String,
}

/// Everything needed to launch one node instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub image: String,
    pub name: String,
    pub volumes: Vec<VolumeMount>,
    pub env: Vec<(String, String)>,
    pub restart: RestartPolicy,
    pub pull_always: bool,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Remove the named instance, running or not. Absent is not an error.
    async fn remove_if_exists(&self, name: &str) -> Result<(), RuntimeError>;

    /// Launch a detached instance and return its id
    async fn start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError>;

    /// Combined stdout/stderr: the last `tail_lines` lines, then live output
    async fn stream_output(&self, name: &str, tail_lines: usize)
    -> Result<LogStream, RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_policy_from_yaml() {
        let policy: RestartPolicy = serde_yaml::from_str("always").unwrap();
        assert_eq!(policy, RestartPolicy::Always);
        let policy: RestartPolicy = serde_yaml::from_str("unless-stopped").unwrap();
        assert_eq!(policy, RestartPolicy::UnlessStopped);
        assert_eq!(RestartPolicy::default().to_string(), "unless-stopped");
    }
}
