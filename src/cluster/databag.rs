//! Typed, validated (de)serialization of relation databags.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::WorkerError;

/// Keys the platform injects into every databag; never part of a model.
pub const BUILTIN_JUJU_KEYS: [&str; 3] =
    ["ingress-address", "private-address", "egress-subnets"];

/// One side's view of a relation: string keys to string values.
pub type Databag = HashMap<String, String>;

/// A typed record stored in a relation databag.
///
/// In the default mode every field is JSON-encoded under its own wire key.
/// Decoding is total: either the full declared shape parses, or the whole
/// load fails; partially valid data is never observable. Unknown keys other
/// than the platform-reserved ones are tolerated, since unrelated records
/// may share the same databag.
///
/// A model with [`NEST_UNDER`](DatabagModel::NEST_UNDER) set is instead
/// stored as a single JSON blob under that key, for payloads that should
/// not be flattened field-by-field.
pub trait DatabagModel: Serialize + DeserializeOwned {
    /// Store the whole model under this key instead of one key per field.
    const NEST_UNDER: Option<&'static str> = None;

    /// Decode a model from a databag.
    fn load(databag: &Databag) -> Result<Self, WorkerError> {
        if let Some(key) = Self::NEST_UNDER {
            let raw = databag.get(key).ok_or_else(|| {
                WorkerError::DataValidation(format!("missing key `{}`", key))
            })?;

            return serde_json::from_str(raw)
                .map_err(|err| WorkerError::DataValidation(err.to_string()));
        }

        let mut fields = Map::new();
        for (key, raw) in databag {
            if BUILTIN_JUJU_KEYS.contains(&key.as_str()) {
                continue;
            }

            let value: Value = serde_json::from_str(raw).map_err(|err| {
                WorkerError::DataValidation(format!(
                    "expecting json under `{}`: {}",
                    key, err
                ))
            })?;
            fields.insert(key.clone(), value);
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|err| WorkerError::DataValidation(err.to_string()))
    }

    /// Encode this model into a databag.
    ///
    /// With `clear` set, pre-existing keys are dropped first so no stale
    /// fields from a previous shape survive the write.
    fn dump(&self, databag: &mut Databag, clear: bool) -> Result<(), WorkerError> {
        if clear {
            databag.clear();
        }

        if let Some(key) = Self::NEST_UNDER {
            databag.insert(key.to_string(), serde_json::to_string(self)?);
            return Ok(());
        }

        match serde_json::to_value(self)? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    databag.insert(key, value.to_string());
                }
                Ok(())
            }
            _ => Err(WorkerError::DataValidation(
                "model must serialize to a mapping".to_string(),
            )),
        }
    }
}
