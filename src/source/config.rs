use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consumer::Realm;
use crate::extensions::{AttrInfo, FetchRequest, SRegRequest};
use crate::types::{OpenIdError, OpenIdReturnType};

fn default_true() -> bool {
    true
}

/// # Consumer Config
/// Options of an OpenID authentication source, as found in the host configuration
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ConsumerConfig {
    /// Fixed identifier to authenticate with. The identifier form is skipped when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Realm sent to the provider, defaults to the scheme, host and port of the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    /// Simple registration fields the user must release
    #[serde(rename = "attributes.required", default)]
    pub required_attributes: Vec<String>,
    /// Simple registration fields the user may release
    #[serde(rename = "attributes.optional", default)]
    pub optional_attributes: Vec<String>,
    /// Attribute exchange type uris the user must release
    #[serde(rename = "attributes.ax_required", default)]
    pub ax_required_attributes: Vec<String>,
    /// Attribute exchange type uris the user may release
    #[serde(rename = "attributes.ax_optional", default)]
    pub ax_optional_attributes: Vec<String>,
    /// Ignore simple registration data unless the provider signed all of it
    #[serde(rename = "sreg.validate", default = "default_true")]
    pub validate_sreg: bool,
    /// Extra extension arguments, extension namespace to key to value
    #[serde(rename = "extension.args", default)]
    pub extension_args: BTreeMap<String, Value>,
    /// Redirect to OpenID 2.0 providers instead of posting a form when the url is short enough
    #[serde(default)]
    pub prefer_http_redirect: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            target: None,
            realm: None,
            required_attributes: vec![],
            optional_attributes: vec![],
            ax_required_attributes: vec![],
            ax_optional_attributes: vec![],
            validate_sreg: true,
            extension_args: BTreeMap::new(),
            prefer_http_redirect: false,
        }
    }
}

impl ConsumerConfig {
    /// Reads and validates the options of source `auth_id`
    pub fn from_value(auth_id: &str, value: Value) -> OpenIdReturnType<Self> {
        let config: Self = serde_json::from_value(value).map_err(|e| {
            OpenIdError::new_config_error(format!("Authentication source '{auth_id}': {e}"))
        })?;

        config.validate(auth_id)?;

        Ok(config)
    }

    /// Checks the options that can only be checked once parsed
    pub fn validate(&self, auth_id: &str) -> OpenIdReturnType<()> {
        let invalid = |e: OpenIdError| {
            OpenIdError::new_config_error(format!("Authentication source '{auth_id}': {e}"))
        };

        SRegRequest::build(&self.required_attributes, &self.optional_attributes)
            .map_err(invalid)?;

        self.fetch_request().map_err(invalid)?;

        if let Some(realm) = self.realm() {
            Realm::parse(realm).map_err(invalid)?;
        }

        Ok(())
    }

    /// The configured realm, empty counts as unset
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref().filter(|r| !r.is_empty())
    }

    /// Attribute exchange request for the configured type uris, one value each.
    /// `None` when no AX attribute is configured. A type uri listed twice is an error.
    pub fn fetch_request(&self) -> OpenIdReturnType<Option<FetchRequest>> {
        let mut fetch_request = FetchRequest::new();

        for type_uri in &self.ax_required_attributes {
            fetch_request.add(AttrInfo::make(type_uri, 1, true)?)?;
        }

        for type_uri in &self.ax_optional_attributes {
            fetch_request.add(AttrInfo::make(type_uri, 1, false)?)?;
        }

        if fetch_request.is_empty() {
            return Ok(None);
        }

        Ok(Some(fetch_request))
    }

    /// Extension arguments as (namespace, key, value).
    ///
    /// Namespaces whose value is not an object are skipped, so are keys holding
    /// arrays, objects or null. Numbers and booleans are sent as their text.
    pub fn extension_arguments(&self) -> Vec<(&str, &str, String)> {
        let mut args = vec![];

        for (ns, ext_args) in &self.extension_args {
            let Some(ext_args) = ext_args.as_object() else {
                continue;
            };

            for (key, value) in ext_args {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };

                args.push((ns.as_str(), key.as_str(), value));
            }
        }

        args
    }
}
