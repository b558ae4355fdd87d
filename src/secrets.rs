//! Contract required from the external secret store.

use std::collections::HashMap;

use failure::Fail;

/// Failure to resolve a secret by id.
#[derive(Debug, Fail)]
#[fail(display = "cannot resolve secret `{}`: {}", id, reason)]
pub struct SecretError {
    pub id: String,
    pub reason: String,
}

/// Named content fields of a resolved secret.
///
/// A field missing from the content reads as an empty string at the call
/// site, not as an error.
pub type SecretContent = HashMap<String, String>;

/// Store resolving secret ids to their content.
pub trait SecretStore {
    fn get_secret(&self, id: &str) -> Result<SecretContent, SecretError>;
}
