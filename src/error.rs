use failure::Fail;
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;

use crate::container::ContainerError;

#[derive(Debug, Fail)]
pub enum WorkerError {
    #[fail(display = "invalid databag contents: {}", _0)]
    DataValidation(String),

    #[fail(display = "`{}` is not a valid address: {}", _0, _1)]
    InvalidAddress(String, String),

    #[fail(display = "permission denied: {}", _0)]
    PermissionDenied(String),

    #[fail(display = "certificates unavailable: {}", _0)]
    CertificateUnavailable(String),

    #[fail(display = "JSON error: {}", _0)]
    JsonError(JsonError),

    #[fail(display = "YAML error: {}", _0)]
    YamlError(YamlError),

    #[fail(display = "container error: {}", _0)]
    ContainerError(ContainerError),
}

impl From<JsonError> for WorkerError {
    fn from(err: JsonError) -> Self {
        WorkerError::JsonError(err)
    }
}

impl From<YamlError> for WorkerError {
    fn from(err: YamlError) -> Self {
        WorkerError::YamlError(err)
    }
}

impl From<ContainerError> for WorkerError {
    fn from(err: ContainerError) -> Self {
        WorkerError::ContainerError(err)
    }
}

impl From<WorkerError> for String {
    fn from(err: WorkerError) -> Self {
        format!("{}", err)
    }
}
