//! Unit status aggregation.

use std::fmt;

/// Externally visible unit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Active(String),
    Waiting(String),
    Blocked(String),
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active(_))
    }

    fn severity(&self) -> u8 {
        match self {
            Status::Active(_) => 0,
            Status::Waiting(_) => 1,
            Status::Blocked(_) => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Active(msg) => write!(f, "active: {}", msg),
            Status::Waiting(msg) => write!(f, "waiting: {}", msg),
            Status::Blocked(msg) => write!(f, "blocked: {}", msg),
        }
    }
}

/// Everything status aggregation needs to know, captured once per trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusSnapshot {
    pub container_reachable: bool,
    pub relation_present: bool,
    pub relation_ready: bool,
    pub config_received: bool,
    pub roles_configured: bool,
}

/// All applicable status candidates, in priority order, terminated by
/// `Active`. Pure function, no side effects.
pub fn collect(snapshot: &StatusSnapshot) -> Vec<Status> {
    let mut statuses = Vec::new();

    if !snapshot.container_reachable {
        statuses.push(Status::Waiting("Waiting for `loki` container".to_string()));
    }

    if !snapshot.relation_present {
        statuses.push(Status::Blocked(
            "Missing loki-cluster relation to a loki-coordinator charm".to_string(),
        ));
    } else if !snapshot.relation_ready {
        statuses.push(Status::Waiting("Loki-Cluster relation not ready".to_string()));
    }

    if !snapshot.config_received {
        statuses.push(Status::Waiting(
            "Waiting for coordinator to publish a loki config".to_string(),
        ));
    }

    if !snapshot.roles_configured {
        statuses.push(Status::Blocked(
            "No roles assigned: please configure some roles".to_string(),
        ));
    }

    statuses.push(Status::Active(String::new()));
    statuses
}

/// The single externally visible status: the most severe candidate wins,
/// earlier candidates win ties.
pub fn aggregate(snapshot: &StatusSnapshot) -> Status {
    let mut result = Status::Active(String::new());
    for candidate in collect(snapshot) {
        if candidate.severity() > result.severity() {
            result = candidate;
        }
    }
    result
}
