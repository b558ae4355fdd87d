use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::error::WorkerError;

/// Operational mode of a loki worker.
///
/// Meta roles matching the simple-scalable deployment targets the loki
/// binary accepts via `-target`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LokiRole {
    Read,
    Write,
    Backend,
    All,
}

impl LokiRole {
    pub fn as_str(self) -> &'static str {
        match self {
            LokiRole::Read => "read",
            LokiRole::Write => "write",
            LokiRole::Backend => "backend",
            LokiRole::All => "all",
        }
    }
}

impl fmt::Display for LokiRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LokiRole> for &'static str {
    fn from(role: LokiRole) -> &'static str {
        role.as_str()
    }
}

impl FromStr for LokiRole {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(LokiRole::Read),
            "write" => Ok(LokiRole::Write),
            "backend" => Ok(LokiRole::Backend),
            "all" => Ok(LokiRole::All),
            other => Err(WorkerError::DataValidation(format!(
                "unknown role `{}`",
                other
            ))),
        }
    }
}
