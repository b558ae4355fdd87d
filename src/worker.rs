//! Loki workload container facade.
//!
//! Translates coordination outcomes into concrete actions on the managed
//! workload: config file sync, certificate installation, supervision layer
//! management and restart policy. Never reads the relation exchange
//! directly; it receives already-validated values.

use std::collections::HashMap;

use log::{debug, error, info, warn};
use nom::bytes::complete::{tag, tag_no_case, take_till1};
use nom::character::complete::space0;
use nom::combinator::opt;
use nom::sequence::{preceded, tuple};
use nom::IResult;
use serde_json::{Map, Value};

use crate::cluster::CertSecretIds;
use crate::container::{Container, ContainerError, Layer, Service, ServiceStatus};
use crate::error::WorkerError;
use crate::role::LokiRole;
use crate::secrets::SecretStore;

pub const CONTAINER_NAME: &str = "loki";
pub const LOKI_PORT: u16 = 3100;
pub const LOKI_CONFIG_FILE: &str = "/etc/loki/loki-config.yaml";
pub const LOKI_CERT_FILE: &str = "/etc/loki/server.cert";
pub const LOKI_KEY_FILE: &str = "/etc/loki/private.key";
pub const LOKI_CLIENT_CA_FILE: &str = "/etc/loki/ca.cert";
pub const CA_CERT_PATH: &str = "/usr/local/share/ca-certificates/ca.crt";

/// Loki workload container facade.
pub struct Loki<'a, C: Container, S: SecretStore> {
    container: &'a C,
    secrets: &'a S,
    roles: Vec<LokiRole>,
    tracing_endpoint: Option<String>,
}

impl<'a, C: Container, S: SecretStore> Loki<'a, C, S> {
    pub fn new(
        container: &'a C,
        secrets: &'a S,
        roles: Vec<LokiRole>,
        tracing_endpoint: Option<String>,
    ) -> Self {
        Loki {
            container,
            secrets,
            roles,
            tracing_endpoint,
        }
    }

    /// The desired supervision layer for the current role set.
    pub fn pebble_layer(&self) -> Layer {
        let mut targets: Vec<&str> = self.roles.iter().map(|role| role.as_str()).collect();
        targets.sort_unstable();
        targets.dedup();

        let mut environment = HashMap::new();
        if let Some(endpoint) = &self.tracing_endpoint {
            environment.insert("JAEGER_ENDPOINT".to_string(), endpoint.clone());
        }

        let mut services = HashMap::new();
        services.insert(
            CONTAINER_NAME.to_string(),
            Service {
                override_policy: "replace".to_string(),
                summary: "loki worker daemon".to_string(),
                command: format!(
                    "/bin/loki --config.file={} -target {} -auth.multitenancy-enabled=false",
                    LOKI_CONFIG_FILE,
                    targets.join(",")
                ),
                startup: "enabled".to_string(),
                environment,
            },
        );

        Layer {
            summary: "loki worker layer".to_string(),
            description: "pebble config layer for loki worker".to_string(),
            services,
        }
    }

    /// Version reported by the workload binary, if reachable.
    pub fn version(&self) -> Option<String> {
        if !self.container.can_connect() {
            return None;
        }

        let output = self.container.exec(&["/bin/loki", "-version"]).ok()?;
        // Output looks like this:
        // Loki, version 2.4.0 (branch: HEAD, revision 32137ee)
        parse_version(&output.stdout).or_else(|| parse_version(&output.stderr))
    }

    /// The config currently persisted in the workload filesystem, if
    /// readable.
    pub fn running_config(&self) -> Option<Value> {
        if !self.container.can_connect() {
            debug!("could not connect to the loki container");
            return None;
        }

        match self.container.pull(LOKI_CONFIG_FILE) {
            Ok(raw) => serde_yaml::from_slice(&raw).ok(),
            Err(err) => {
                warn!(
                    "could not check the current loki configuration due to \
                     a failure in retrieving the file: {}",
                    err
                );
                None
            }
        }
    }

    /// Sync the loki config file; reports whether it changed.
    ///
    /// An unreadable running config counts as different.
    pub fn update_config(&self, config: &Map<String, Value>) -> Result<bool, WorkerError> {
        if !self.container.can_connect() {
            debug!("could not connect to the loki container");
            return Ok(false);
        }

        if config.is_empty() {
            warn!("cannot update loki config: coordinator hasn't published one yet.");
            return Ok(false);
        }

        let desired = Value::Object(config.clone());
        if self.running_config().as_ref() != Some(&desired) {
            let rendered = serde_yaml::to_vec(&desired)?;
            self.container.push(LOKI_CONFIG_FILE, &rendered, true)?;
            info!("pushed new loki configuration");
            return Ok(true);
        }

        Ok(false)
    }

    /// Install or remove the workload TLS material; reports whether it
    /// changed.
    ///
    /// Secret resolution failures propagate before any file is written.
    /// Removal always reports a change: certificate presence transitions
    /// explicitly.
    pub fn update_tls_certificates(
        &self,
        cert_secret_ids: Option<&str>,
    ) -> Result<bool, WorkerError> {
        if !self.container.can_connect() {
            return Ok(false);
        }

        match cert_secret_ids {
            Some(raw) => {
                let ids: CertSecretIds = serde_json::from_str(raw)
                    .map_err(|err| WorkerError::CertificateUnavailable(err.to_string()))?;

                let private_key = self
                    .resolve_secret_field(&ids.private_key_secret_id, "private-key")?;
                let ca_server = self
                    .secrets
                    .get_secret(&ids.ca_server_cert_secret_id)
                    .map_err(|err| WorkerError::CertificateUnavailable(err.to_string()))?;
                let ca_cert = ca_server.get("ca-cert").cloned().unwrap_or_default();
                let server_cert = ca_server.get("server-cert").cloned().unwrap_or_default();

                self.container
                    .push(LOKI_CERT_FILE, server_cert.as_bytes(), true)?;
                self.container
                    .push(LOKI_KEY_FILE, private_key.as_bytes(), true)?;
                self.container
                    .push(LOKI_CLIENT_CA_FILE, ca_cert.as_bytes(), true)?;
                self.container.push(CA_CERT_PATH, ca_cert.as_bytes(), true)?;

                self.refresh_ca_certificates()?;
                Ok(true)
            }
            None => {
                let paths = [
                    LOKI_CERT_FILE,
                    LOKI_KEY_FILE,
                    LOKI_CLIENT_CA_FILE,
                    CA_CERT_PATH,
                ];
                for path in &paths {
                    match self.container.remove_path(path, true) {
                        Ok(()) | Err(ContainerError::NotFound(_)) => {}
                        Err(err) => return Err(err.into()),
                    }
                }

                self.refresh_ca_certificates()?;
                Ok(true)
            }
        }
    }

    fn resolve_secret_field(&self, id: &str, field: &str) -> Result<String, WorkerError> {
        let content = self
            .secrets
            .get_secret(id)
            .map_err(|err| WorkerError::CertificateUnavailable(err.to_string()))?;
        Ok(content.get(field).cloned().unwrap_or_default())
    }

    fn refresh_ca_certificates(&self) -> Result<(), WorkerError> {
        self.container.exec(&["update-ca-certificates", "--fresh"])?;
        Ok(())
    }

    /// Install the supervision layer if it differs from the current plan;
    /// reports whether it changed.
    pub fn set_pebble_layer(&self) -> Result<bool, WorkerError> {
        if !self.container.can_connect() {
            return Ok(false);
        }
        if self.roles.is_empty() {
            return Ok(false);
        }

        let desired = self.pebble_layer();
        let current = self.container.plan().unwrap_or_default();

        if current.services != desired.services {
            self.container.install_layer(CONTAINER_NAME, &desired, true)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Restart the service, or start it if not yet running.
    ///
    /// Supervision failures are logged, not propagated: they surface
    /// through the next status pass instead.
    pub fn restart(&self) {
        if !self.container.exists(LOKI_CONFIG_FILE) {
            error!("cannot restart loki: config file doesn't exist (yet).");
        }

        if self.roles.is_empty() {
            debug!("cannot restart loki: no roles have been configured.");
            return;
        }

        let result = match self.container.get_service_status(CONTAINER_NAME) {
            Ok(ServiceStatus::Active) => self.container.restart(CONTAINER_NAME),
            Ok(_) => self.container.start(CONTAINER_NAME),
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            error!("failed to (re)start the loki job: {}", err);
        }
    }
}

fn version_fragment(input: &str) -> IResult<&str, &str> {
    preceded(
        tuple((tag_no_case("version"), opt(tag(":")), space0)),
        take_till1(|ch: char| ch.is_whitespace()),
    )(input)
}

/// Extract the first `version[:] <token>` occurrence from command output.
pub fn parse_version(output: &str) -> Option<String> {
    output
        .char_indices()
        .filter(|&(_, ch)| ch == 'v' || ch == 'V')
        .find_map(|(at, _)| {
            version_fragment(&output[at..])
                .ok()
                .map(|(_, version)| version.to_string())
        })
}
