//! Requirer side of the `loki-cluster` relation.
//!
//! This relation is cluster-internal: its only provider is the loki
//! coordinator, so the endpoint wrapper lives here rather than in a shared
//! library. The requirer publishes this unit's facts into the exchange,
//! validates whatever the coordinator publishes back, and derives the
//! lifecycle events the rest of the operator reacts to.

pub mod data;
pub mod databag;

pub use data::{
    CertSecretIds, JujuTopology, ProviderAppData, RequirerAppData, RequirerUnitData,
};
pub use databag::{Databag, DatabagModel, BUILTIN_JUJU_KEYS};

use std::collections::HashMap;

use log::info;
use serde_json::{Map, Value};
use url::Url;

use crate::error::WorkerError;
use crate::role::LokiRole;

pub const DEFAULT_ENDPOINT_NAME: &str = "loki-cluster";

/// Snapshot of one relation instance as seen by this unit.
///
/// Captured once per trigger; writes mutate the snapshot and the hosting
/// platform persists it when the trigger completes.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    /// Name of the remote application, once the platform has resolved it.
    pub remote_app: Option<String>,
    pub local_unit_data: Databag,
    pub local_app_data: Databag,
    pub remote_app_data: Databag,
}

/// Lifecycle events derived from relation triggers.
///
/// These are semantic transitions, not raw databag writes: consumers react
/// to "config is now usable" rather than to every partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEvent {
    /// A relation instance appeared.
    Created,
    /// The coordinator shared a new, valid loki config.
    ConfigReceived(Map<String, Value>),
    /// The relation is gone, or the coordinator wiped its data.
    Removed,
}

/// `loki-cluster` requirer endpoint wrapper.
pub struct LokiClusterRequirer {
    topology: JujuTopology,
    leader: bool,
    relation: Option<Relation>,
}

impl LokiClusterRequirer {
    pub fn new(topology: JujuTopology, leader: bool, relation: Option<Relation>) -> Self {
        LokiClusterRequirer {
            topology,
            leader,
            relation,
        }
    }

    /// The relation, filtered for common unhappy states: an instance whose
    /// remote application identity is not yet resolvable counts as absent.
    fn connected(&self) -> Option<&Relation> {
        self.relation.as_ref().filter(|r| r.remote_app.is_some())
    }

    fn connected_mut(&mut self) -> Option<&mut Relation> {
        self.relation.as_mut().filter(|r| r.remote_app.is_some())
    }

    /// Whether any relation instance exists, healthy or not.
    pub fn has_relation(&self) -> bool {
        self.relation.is_some()
    }

    /// Whether a healthy relation instance is present.
    pub fn is_connected(&self) -> bool {
        self.connected().is_some()
    }

    pub fn is_leader(&self) -> bool {
        self.leader
    }

    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    /// Publish this unit's address via the unit databag.
    ///
    /// The address is validated before any write; a disconnected relation
    /// makes this a no-op.
    pub fn publish_unit_address(&mut self, address: &str) -> Result<(), WorkerError> {
        validate_address(address)?;

        let record = RequirerUnitData {
            juju_topology: self.topology.clone(),
            address: address.to_string(),
        };

        if let Some(relation) = self.connected_mut() {
            record.dump(&mut relation.local_unit_data, true)?;
        }
        Ok(())
    }

    /// Publish this application's roles via the application databag.
    ///
    /// Leader-only: every app-data write goes through this single guarded
    /// entry point.
    pub fn publish_app_roles(&mut self, roles: &[LokiRole]) -> Result<(), WorkerError> {
        if !self.leader {
            return Err(WorkerError::PermissionDenied(
                "only the leader unit can publish roles".to_string(),
            ));
        }

        if let Some(relation) = self.connected_mut() {
            let record = RequirerAppData {
                roles: roles.to_vec(),
            };
            record.dump(&mut relation.local_app_data, true)?;
        }
        Ok(())
    }

    /// Whether the local side has published everything it needs to:
    /// the unit address and the application roles both decode back.
    pub fn is_published(&self) -> bool {
        let relation = match self.connected() {
            Some(relation) => relation,
            None => return false,
        };

        if let Err(err) = RequirerUnitData::load(&relation.local_unit_data) {
            info!("invalid unit databag contents: {}", err);
            return false;
        }
        if let Err(err) = RequirerAppData::load(&relation.local_app_data) {
            info!("invalid app databag contents: {}", err);
            return false;
        }
        true
    }

    /// The coordinator's databag, if it validates in full.
    fn coordinator_data(&self) -> Option<ProviderAppData> {
        let relation = self.connected()?;

        match ProviderAppData::load(&relation.remote_app_data) {
            Ok(data) => Some(data),
            Err(err) => {
                info!("invalid coordinator databag contents: {}", err);
                None
            }
        }
    }

    /// The loki config from the coordinator databag, empty if absent or
    /// invalid.
    pub fn get_loki_config(&self) -> Map<String, Value> {
        self.coordinator_data()
            .map(|data| data.loki_config)
            .unwrap_or_default()
    }

    /// The loki endpoints from the coordinator databag, empty if absent.
    pub fn get_loki_endpoints(&self) -> HashMap<String, String> {
        self.coordinator_data()
            .and_then(|data| data.loki_endpoints)
            .unwrap_or_default()
    }

    /// Raw certificate secret pointers, undecoded.
    pub fn get_cert_secret_ids(&self) -> Option<String> {
        self.connected()
            .and_then(|relation| relation.remote_app_data.get("secrets").cloned())
    }

    pub fn on_relation_created(&self) -> ClusterEvent {
        ClusterEvent::Created
    }

    pub fn on_relation_changed(&self) -> Option<ClusterEvent> {
        // no event while the relation is in an unhealthy state (breaking...)
        if !self.is_connected() {
            return None;
        }

        let config = self.get_loki_config();
        if !config.is_empty() {
            return Some(ClusterEvent::ConfigReceived(config));
        }

        // we published our data but the config is now empty/invalid: the
        // remote end must have removed it
        if self.is_published() {
            return Some(ClusterEvent::Removed);
        }

        None
    }

    pub fn on_relation_broken(&self) -> ClusterEvent {
        ClusterEvent::Removed
    }
}

fn validate_address(address: &str) -> Result<(), WorkerError> {
    if Url::parse(address).is_ok() {
        return Ok(());
    }

    // unit addresses are usually bare fqdns; accept anything that still
    // forms a URL once given a scheme
    Url::parse(&format!("http://{}", address))
        .map(|_| ())
        .map_err(|err| WorkerError::InvalidAddress(address.to_string(), err.to_string()))
}
