use serde_derive::{Deserialize, Serialize};

use crate::role::LokiRole;

/// Declared configuration of a loki worker unit.
///
/// One boolean per role; the active role set is derived from these on every
/// evaluation, never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkerConfig {
    pub read: bool,
    pub write: bool,
    pub backend: bool,
    pub all: bool,

    /// Tracing endpoint injected into the workload environment, if any.
    pub tracing_endpoint: Option<String>,
}

impl WorkerConfig {
    /// The set of roles this worker should take on.
    pub fn roles(&self) -> Vec<LokiRole> {
        let flags = [
            (self.read, LokiRole::Read),
            (self.write, LokiRole::Write),
            (self.backend, LokiRole::Backend),
            (self.all, LokiRole::All),
        ];

        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, role)| *role)
            .collect()
    }
}
