//! Contract required from the workload container supervisor.

use std::collections::HashMap;

use failure::Fail;
use serde_derive::{Deserialize, Serialize};

/// Errors surfaced by the container supervisor.
#[derive(Debug, Clone, Fail)]
pub enum ContainerError {
    #[fail(display = "no such path: {}", _0)]
    NotFound(String),

    #[fail(display = "protocol error: {}", _0)]
    Protocol(String),

    #[fail(display = "change error: {}", _0)]
    Change(String),
}

/// Output of a finished process execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run state of a supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Active,
    Inactive,
    Error,
}

impl ServiceStatus {
    pub fn is_running(self) -> bool {
        self == ServiceStatus::Active
    }
}

/// One service entry in a supervision layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    /// How this entry combines with a previous definition of the same
    /// service (`replace` or `merge`).
    #[serde(rename = "override")]
    pub override_policy: String,
    pub summary: String,
    pub command: String,
    pub startup: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

/// A supervision layer declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Layer {
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub services: HashMap<String, Service>,
}

/// Interface to the supervisor managing the workload container.
///
/// An unreachable container is an expected state, reported via
/// [`can_connect`](Container::can_connect) and never as an error. All calls
/// are synchronous; timeouts are owned by the implementation.
pub trait Container {
    fn can_connect(&self) -> bool;

    fn exec(&self, argv: &[&str]) -> Result<ExecOutput, ContainerError>;

    fn pull(&self, path: &str) -> Result<Vec<u8>, ContainerError>;

    fn push(&self, path: &str, data: &[u8], make_dirs: bool) -> Result<(), ContainerError>;

    fn remove_path(&self, path: &str, recursive: bool) -> Result<(), ContainerError>;

    fn get_service_status(&self, name: &str) -> Result<ServiceStatus, ContainerError>;

    fn start(&self, name: &str) -> Result<(), ContainerError>;

    fn stop(&self, name: &str) -> Result<(), ContainerError>;

    fn restart(&self, name: &str) -> Result<(), ContainerError>;

    fn install_layer(&self, name: &str, layer: &Layer, combine: bool)
        -> Result<(), ContainerError>;

    /// The currently installed service declarations.
    fn plan(&self) -> Result<Layer, ContainerError>;

    /// Whether a path exists in the workload filesystem.
    fn exists(&self, path: &str) -> bool {
        self.pull(path).is_ok()
    }
}
