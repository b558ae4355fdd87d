//! Event wiring for the loki worker operator.

use log::info;

use crate::cluster::{ClusterEvent, JujuTopology, LokiClusterRequirer, Relation};
use crate::config::WorkerConfig;
use crate::container::Container;
use crate::error::WorkerError;
use crate::secrets::SecretStore;
use crate::status::{self, Status, StatusSnapshot};
use crate::worker::Loki;

/// External lifecycle triggers, delivered one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
    WorkloadReady,
    ConfigChanged,
    UpgradeCharm,
    ClusterCreated,
    ClusterChanged,
    ClusterBroken,
}

/// Operator for a single loki worker unit.
///
/// Rebuilt from an external state snapshot for every trigger; holds no
/// state of its own across invocations.
pub struct LokiWorkerCharm<'a, C: Container, S: SecretStore> {
    container: &'a C,
    config: WorkerConfig,
    address: String,
    cluster: LokiClusterRequirer,
    worker: Loki<'a, C, S>,
}

impl<'a, C: Container, S: SecretStore> LokiWorkerCharm<'a, C, S> {
    pub fn new(
        container: &'a C,
        secrets: &'a S,
        config: WorkerConfig,
        topology: JujuTopology,
        leader: bool,
        address: impl Into<String>,
        relation: Option<Relation>,
    ) -> Self {
        let worker = Loki::new(
            container,
            secrets,
            config.roles(),
            config.tracing_endpoint.clone(),
        );

        LokiWorkerCharm {
            container,
            worker,
            cluster: LokiClusterRequirer::new(topology, leader, relation),
            config,
            address: address.into(),
        }
    }

    pub fn handle(&mut self, event: WorkerEvent) -> Result<(), WorkerError> {
        match event {
            WorkerEvent::WorkloadReady => {
                if let Some(version) = self.worker.version() {
                    info!("loki workload version: {}", version);
                }
                self.update_config()
            }
            WorkerEvent::ConfigChanged => {
                // the role set may have changed; let the coordinator know
                self.update_cluster()?;

                // with a config in hand, decide whether a restart is due
                if !self.cluster.get_loki_config().is_empty() {
                    self.update_config()?;
                }
                Ok(())
            }
            WorkerEvent::UpgradeCharm => self.update_cluster(),
            WorkerEvent::ClusterCreated => {
                let event = self.cluster.on_relation_created();
                self.handle_cluster_event(event)
            }
            WorkerEvent::ClusterChanged => match self.cluster.on_relation_changed() {
                Some(event) => self.handle_cluster_event(event),
                None => Ok(()),
            },
            WorkerEvent::ClusterBroken => {
                let event = self.cluster.on_relation_broken();
                self.handle_cluster_event(event)
            }
        }
    }

    fn handle_cluster_event(&mut self, event: ClusterEvent) -> Result<(), WorkerError> {
        match event {
            ClusterEvent::Created => self.update_cluster(),
            ClusterEvent::ConfigReceived(_) => self.update_config(),
            ClusterEvent::Removed => {
                info!("cluster relation removed");
                Ok(())
            }
        }
    }

    /// Share everything we need to publish over the cluster relation.
    fn update_cluster(&mut self) -> Result<(), WorkerError> {
        self.cluster.publish_unit_address(&self.address)?;

        let roles = self.config.roles();
        if self.cluster.is_leader() && !roles.is_empty() {
            info!("publishing loki roles: {:?}", roles);
            self.cluster.publish_app_roles(&roles)?;
        }
        Ok(())
    }

    /// Sync certificates, config and the service layer; restart the
    /// workload if anything changed.
    fn update_config(&mut self) -> Result<(), WorkerError> {
        let cert_secret_ids = self.cluster.get_cert_secret_ids();
        let config = self.cluster.get_loki_config();

        // every step runs; any change warrants a single restart at the end
        let changes = [
            self.worker
                .update_tls_certificates(cert_secret_ids.as_deref())?,
            self.worker.update_config(&config)?,
            self.worker.set_pebble_layer()?,
        ];

        if changes.iter().any(|&changed| changed) {
            self.worker.restart();
        }
        Ok(())
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            container_reachable: self.container.can_connect(),
            relation_present: self.cluster.has_relation(),
            relation_ready: self.cluster.is_connected(),
            config_received: !self.cluster.get_loki_config().is_empty(),
            roles_configured: !self.config.roles().is_empty(),
        }
    }

    /// All applicable status candidates, in priority order.
    pub fn collect_status(&self) -> Vec<Status> {
        status::collect(&self.snapshot())
    }

    /// The single externally visible unit status.
    pub fn status(&self) -> Status {
        status::aggregate(&self.snapshot())
    }

    pub fn cluster(&self) -> &LokiClusterRequirer {
        &self.cluster
    }

    pub fn worker(&self) -> &Loki<'a, C, S> {
        &self.worker
    }
}
