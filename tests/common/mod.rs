//! In-memory doubles for the container supervisor and the secret store.

use std::cell::RefCell;
use std::collections::HashMap;

use loki_worker::container::{Container, ContainerError, ExecOutput, Layer, ServiceStatus};
use loki_worker::secrets::{SecretContent, SecretError, SecretStore};

#[derive(Default)]
struct ContainerState {
    files: HashMap<String, Vec<u8>>,
    plan: Layer,
    services: HashMap<String, ServiceStatus>,
    exec_log: Vec<Vec<String>>,
}

/// Workload container double backed by in-memory state.
pub struct MockContainer {
    connectable: bool,
    exec_results: HashMap<Vec<String>, ExecOutput>,
    state: RefCell<ContainerState>,
}

impl MockContainer {
    pub fn new(connectable: bool) -> Self {
        MockContainer {
            connectable,
            exec_results: HashMap::new(),
            state: RefCell::new(ContainerState::default()),
        }
    }

    /// Register a canned result for an exec invocation.
    pub fn with_exec(mut self, argv: &[&str], output: ExecOutput) -> Self {
        let key = argv.iter().map(|arg| arg.to_string()).collect();
        self.exec_results.insert(key, output);
        self
    }

    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), data.to_vec());
        self
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path).cloned()
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.state.borrow().files.contains_key(path)
    }

    pub fn plan_snapshot(&self) -> Layer {
        self.state.borrow().plan.clone()
    }

    pub fn service_running(&self, name: &str) -> bool {
        self.state.borrow().services.get(name) == Some(&ServiceStatus::Active)
    }

    pub fn exec_calls(&self) -> Vec<Vec<String>> {
        self.state.borrow().exec_log.clone()
    }
}

impl Container for MockContainer {
    fn can_connect(&self) -> bool {
        self.connectable
    }

    fn exec(&self, argv: &[&str]) -> Result<ExecOutput, ContainerError> {
        let key: Vec<String> = argv.iter().map(|arg| arg.to_string()).collect();
        self.state.borrow_mut().exec_log.push(key.clone());

        self.exec_results
            .get(&key)
            .cloned()
            .ok_or_else(|| ContainerError::Change(format!("no handler for {:?}", argv)))
    }

    fn pull(&self, path: &str) -> Result<Vec<u8>, ContainerError> {
        self.state
            .borrow()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))
    }

    fn push(&self, path: &str, data: &[u8], _make_dirs: bool) -> Result<(), ContainerError> {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn remove_path(&self, path: &str, recursive: bool) -> Result<(), ContainerError> {
        let removed = self.state.borrow_mut().files.remove(path).is_some();
        if !removed && !recursive {
            return Err(ContainerError::NotFound(path.to_string()));
        }
        Ok(())
    }

    fn get_service_status(&self, name: &str) -> Result<ServiceStatus, ContainerError> {
        self.state
            .borrow()
            .services
            .get(name)
            .copied()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    fn start(&self, name: &str) -> Result<(), ContainerError> {
        self.state
            .borrow_mut()
            .services
            .insert(name.to_string(), ServiceStatus::Active);
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), ContainerError> {
        self.state
            .borrow_mut()
            .services
            .insert(name.to_string(), ServiceStatus::Inactive);
        Ok(())
    }

    fn restart(&self, name: &str) -> Result<(), ContainerError> {
        self.state
            .borrow_mut()
            .services
            .insert(name.to_string(), ServiceStatus::Active);
        Ok(())
    }

    fn install_layer(
        &self,
        _name: &str,
        layer: &Layer,
        combine: bool,
    ) -> Result<(), ContainerError> {
        let mut state = self.state.borrow_mut();

        if combine {
            for (name, service) in &layer.services {
                state.plan.services.insert(name.clone(), service.clone());
            }
        } else {
            state.plan = layer.clone();
        }

        for name in layer.services.keys() {
            state
                .services
                .entry(name.clone())
                .or_insert(ServiceStatus::Inactive);
        }
        Ok(())
    }

    fn plan(&self) -> Result<Layer, ContainerError> {
        Ok(self.state.borrow().plan.clone())
    }
}

/// Secret store double.
#[derive(Default)]
pub struct MockSecretStore {
    secrets: HashMap<String, SecretContent>,
    denied: bool,
}

impl MockSecretStore {
    pub fn new() -> Self {
        MockSecretStore::default()
    }

    pub fn with_secret(mut self, id: &str, fields: &[(&str, &str)]) -> Self {
        let content = fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        self.secrets.insert(id.to_string(), content);
        self
    }

    /// Make every lookup fail, as if access had been revoked.
    pub fn denied() -> Self {
        MockSecretStore {
            denied: true,
            ..MockSecretStore::default()
        }
    }
}

impl SecretStore for MockSecretStore {
    fn get_secret(&self, id: &str) -> Result<SecretContent, SecretError> {
        if self.denied {
            return Err(SecretError {
                id: id.to_string(),
                reason: "access denied".to_string(),
            });
        }

        self.secrets.get(id).cloned().ok_or_else(|| SecretError {
            id: id.to_string(),
            reason: "secret not granted".to_string(),
        })
    }
}
