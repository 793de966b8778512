use std::collections::BTreeMap;

use crate::consumer::SuccessResponse;
use crate::types::{OpenIdError, OpenIdReturnType};

use super::Extension;

/// Simple Registration 1.0 namespace, used by OpenID 1 era providers
pub const SREG_1_0_NS: &str = "http://openid.net/sreg/1.0";
/// Simple Registration 1.1 namespace
pub const SREG_1_1_NS: &str = "http://openid.net/extensions/sreg/1.1";

/// Field names defined by Simple Registration
pub const SREG_FIELDS: [&str; 9] = [
    "nickname", "email", "fullname", "dob", "gender", "postcode", "country", "language",
    "timezone",
];

fn check_field_name(name: &str) -> OpenIdReturnType<()> {
    if SREG_FIELDS.contains(&name) {
        return Ok(());
    }

    Err(OpenIdError::new_type_error(format!(
        "invalid simple registration field name: {name:?}"
    )))
}

/// # SRegRequest
/// Asks the provider for simple registration fields
#[derive(Debug, Clone, PartialEq)]
pub struct SRegRequest {
    /// Fields the relying party cannot work without
    pub required: Vec<String>,
    /// Fields the relying party would like to have
    pub optional: Vec<String>,
    /// Page describing what the data is used for
    pub policy_url: Option<String>,
}

impl SRegRequest {
    /// Builds the request. Returns `None` when no field is asked for.
    ///
    /// A field listed as both required and optional is required.
    pub fn build(required: &[String], optional: &[String]) -> OpenIdReturnType<Option<Self>> {
        for field in required.iter().chain(optional) {
            check_field_name(field)?;
        }

        if required.is_empty() && optional.is_empty() {
            return Ok(None);
        }

        let mut request = Self {
            required: vec![],
            optional: vec![],
            policy_url: None,
        };

        for field in required {
            if !request.required.contains(field) {
                request.required.push(field.clone());
            }
        }

        for field in optional {
            if !request.required.contains(field) && !request.optional.contains(field) {
                request.optional.push(field.clone());
            }
        }

        Ok(Some(request))
    }
}

impl Extension for SRegRequest {
    fn ns_uri(&self) -> &str {
        SREG_1_1_NS
    }

    fn extension_args(&self) -> Vec<(String, String)> {
        let mut args = vec![];

        if !self.required.is_empty() {
            args.push(("required".to_string(), self.required.join(",")));
        }

        if !self.optional.is_empty() {
            args.push(("optional".to_string(), self.optional.join(",")));
        }

        if let Some(policy_url) = &self.policy_url {
            args.push(("policy_url".to_string(), policy_url.clone()));
        }

        args
    }
}

/// # SRegResponse
/// Simple registration data returned in a positive assertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SRegResponse {
    /// Namespace the provider answered in
    pub ns_uri: String,
    data: BTreeMap<String, String>,
}

impl SRegResponse {
    /// Reads the simple registration fields of `response`.
    ///
    /// With `signed_only` the fields are ignored unless all of them are signed.
    pub fn from_success_response(response: &SuccessResponse, signed_only: bool) -> Self {
        for ns_uri in [SREG_1_1_NS, SREG_1_0_NS] {
            if response.message.alias_for(ns_uri).is_none() {
                continue;
            }

            let args = match response.extension_response(ns_uri, signed_only) {
                Some(args) => args,
                None => BTreeMap::new(),
            };

            let data = args
                .into_iter()
                .filter(|(key, _)| SREG_FIELDS.contains(&key.as_str()))
                .collect();

            return Self {
                ns_uri: ns_uri.to_string(),
                data,
            };
        }

        Self {
            ns_uri: SREG_1_1_NS.to_string(),
            data: BTreeMap::new(),
        }
    }

    /// Returned fields and their values
    pub fn contents(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    /// Value of a single field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }
}
