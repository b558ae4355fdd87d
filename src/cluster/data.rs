use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::databag::DatabagModel;
use crate::role::LokiRole;

/// Identity of the unit publishing worker data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JujuTopology {
    pub model: String,
    pub unit: String,
}

/// Facts each worker unit publishes into its own unit databag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirerUnitData {
    pub juju_topology: JujuTopology,
    pub address: String,
}

impl DatabagModel for RequirerUnitData {}

/// Facts the leader unit publishes into the shared application databag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirerAppData {
    pub roles: Vec<LokiRole>,
}

impl DatabagModel for RequirerAppData {}

/// Facts the coordinator's leader publishes back to the workers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderAppData {
    pub loki_config: Map<String, Value>,
    #[serde(default)]
    pub loki_endpoints: Option<HashMap<String, String>>,
}

impl DatabagModel for ProviderAppData {}

/// Pointers to externally stored TLS material.
///
/// Published by the coordinator as one JSON blob under the `secrets` key,
/// next to the rest of its application data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertSecretIds {
    pub private_key_secret_id: String,
    pub ca_server_cert_secret_id: String,
}

impl DatabagModel for CertSecretIds {
    const NEST_UNDER: Option<&'static str> = Some("secrets");
}

#[cfg(test)]
mod tests {
    use super::super::databag::Databag;
    use super::*;

    fn unit_data() -> RequirerUnitData {
        RequirerUnitData {
            juju_topology: JujuTopology {
                model: "cos".to_string(),
                unit: "loki-worker/0".to_string(),
            },
            address: "loki-worker-0.cluster.local".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let mut databag = Databag::new();
        unit_data().dump(&mut databag, true).unwrap();

        assert_eq!(
            databag["address"],
            "\"loki-worker-0.cluster.local\"".to_string()
        );
        assert_eq!(
            databag["juju_topology"],
            "{\"model\":\"cos\",\"unit\":\"loki-worker/0\"}".to_string()
        );

        let loaded = RequirerUnitData::load(&databag).unwrap();
        assert_eq!(loaded, unit_data());
    }

    #[test]
    fn test_roles_round_trip() {
        let data = RequirerAppData {
            roles: vec![LokiRole::Read, LokiRole::Backend],
        };

        let mut databag = Databag::new();
        data.dump(&mut databag, true).unwrap();
        assert_eq!(databag["roles"], "[\"read\",\"backend\"]".to_string());

        assert_eq!(RequirerAppData::load(&databag).unwrap(), data);
    }

    #[test]
    fn test_builtin_keys_ignored() {
        let mut databag = Databag::new();
        unit_data().dump(&mut databag, true).unwrap();

        // the platform writes these unquoted; they must never break a decode
        databag.insert("ingress-address".to_string(), "10.1.166.92".to_string());
        databag.insert("private-address".to_string(), "10.1.166.92".to_string());
        databag.insert("egress-subnets".to_string(), "10.1.166.92/32".to_string());

        assert_eq!(RequirerUnitData::load(&databag).unwrap(), unit_data());
    }

    #[test]
    fn test_non_json_value_fails_whole_decode() {
        let mut databag = Databag::new();
        unit_data().dump(&mut databag, true).unwrap();
        databag.insert("address".to_string(), "not json".to_string());

        assert!(RequirerUnitData::load(&databag).is_err());
    }

    #[test]
    fn test_missing_field_fails() {
        let mut databag = Databag::new();
        unit_data().dump(&mut databag, true).unwrap();
        databag.remove("juju_topology");

        assert!(RequirerUnitData::load(&databag).is_err());
    }

    #[test]
    fn test_unknown_role_fails() {
        let mut databag = Databag::new();
        databag.insert("roles".to_string(), "[\"read\", \"ingester\"]".to_string());

        assert!(RequirerAppData::load(&databag).is_err());
    }

    #[test]
    fn test_dump_clears_stale_keys() {
        let mut databag = Databag::new();
        databag.insert("leftover".to_string(), "\"stale\"".to_string());

        unit_data().dump(&mut databag, true).unwrap();
        assert!(!databag.contains_key("leftover"));

        databag.insert("leftover".to_string(), "\"stale\"".to_string());
        unit_data().dump(&mut databag, false).unwrap();
        assert!(databag.contains_key("leftover"));
    }

    #[test]
    fn test_provider_data_tolerates_extra_keys() {
        let mut databag = Databag::new();
        databag.insert("loki_config".to_string(), "{\"alive\":\"beef\"}".to_string());
        databag.insert(
            "secrets".to_string(),
            "{\"private_key_secret_id\":\"secret:a\",\"ca_server_cert_secret_id\":\"secret:b\"}"
                .to_string(),
        );

        let data = ProviderAppData::load(&databag).unwrap();
        assert_eq!(data.loki_config["alive"], "beef");
        assert_eq!(data.loki_endpoints, None);
    }

    #[test]
    fn test_nested_model_round_trip() {
        let ids = CertSecretIds {
            private_key_secret_id: "secret:a".to_string(),
            ca_server_cert_secret_id: "secret:b".to_string(),
        };

        let mut databag = Databag::new();
        databag.insert("loki_config".to_string(), "{}".to_string());
        ids.dump(&mut databag, false).unwrap();

        // nested: a single JSON blob under the well-known key
        assert!(databag["secrets"].starts_with('{'));
        assert_eq!(CertSecretIds::load(&databag).unwrap(), ids);
    }

    #[test]
    fn test_nested_model_missing_key() {
        assert!(CertSecretIds::load(&Databag::new()).is_err());
    }

    #[test]
    fn test_endpoints_null_round_trip() {
        let data = ProviderAppData {
            loki_config: Map::new(),
            loki_endpoints: None,
        };

        let mut databag = Databag::new();
        data.dump(&mut databag, true).unwrap();
        assert_eq!(databag["loki_endpoints"], "null".to_string());

        assert_eq!(ProviderAppData::load(&databag).unwrap(), data);
    }
}
