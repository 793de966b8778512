use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Attributes;

/// Stage a transaction is saved under while waiting for the user to enter an identifier
pub const INIT_STAGE: &str = "openid:init";
/// Stage a transaction is saved under while the user is at the provider
pub const AUTH_STAGE: &str = "openid:auth";

/// # Transaction
/// State of one login attempt, persisted by the host between requests.
///
/// Only the `openid:*` and `Attributes` fields belong to this crate. Everything else
/// is kept as-is in `transport` for the host (its state id, where to return to...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Id of the authentication source running the login
    #[serde(
        rename = "openid:AuthId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_id: Option<String>,
    /// Serialized associations, by provider server url then handle
    #[serde(rename = "openid:Assocs", default)]
    pub associations: BTreeMap<String, BTreeMap<String, String>>,
    /// Attributes released once the login succeeded
    #[serde(
        rename = "Attributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub attributes: Option<Attributes>,
    /// Host owned fields
    #[serde(flatten)]
    pub transport: Map<String, Value>,
}

impl Transaction {
    /// A transaction carrying only host owned fields
    pub fn new(transport: Map<String, Value>) -> Self {
        Self {
            transport,
            ..Default::default()
        }
    }

    /// String field of the host owned part
    pub fn transport_str(&self, key: &str) -> Option<&str> {
        self.transport.get(key).and_then(Value::as_str)
    }

    /// Sets a host owned field
    pub fn set_transport(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.transport.insert(key.into(), value.into());
    }
}
