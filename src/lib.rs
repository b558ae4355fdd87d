//! Operator core for a containerized loki worker.
//!
//! Coordinates with a loki coordinator over the `loki-cluster` relation:
//! publishes this unit's role and address, validates the configuration and
//! certificate pointers the coordinator publishes back, and drives the
//! workload container accordingly. The hosting platform delivers triggers
//! one at a time via [`charm::LokiWorkerCharm::handle`]; process
//! supervision, secret storage and the relation transport are external
//! collaborators behind the traits in [`container`] and [`secrets`].

pub mod charm;
pub mod cluster;
pub mod config;
pub mod container;
pub mod error;
pub mod role;
pub mod secrets;
pub mod status;
pub mod worker;

pub use charm::{LokiWorkerCharm, WorkerEvent};
pub use cluster::{ClusterEvent, LokiClusterRequirer, Relation};
pub use config::WorkerConfig;
pub use error::WorkerError;
pub use role::LokiRole;
pub use status::Status;
