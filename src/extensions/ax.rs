use std::collections::BTreeMap;

use crate::consumer::SuccessResponse;
use crate::types::{OpenIdError, OpenIdReturnType};

use super::Extension;

/// Attribute Exchange 1.0 namespace
pub const AX_NS: &str = "http://openid.net/srv/ax/1.0";

/// # AttrInfo
/// One attribute asked for in a fetch request
#[derive(Debug, Clone, PartialEq)]
pub struct AttrInfo {
    /// Type uri identifying the attribute
    pub type_uri: String,
    /// How many values the relying party wants
    pub count: u32,
    /// Whether the attribute is required
    pub required: bool,
    /// Alias used on the wire, generated when `None`
    pub alias: Option<String>,
}

impl AttrInfo {
    /// Describes an attribute to fetch
    pub fn make(type_uri: &str, count: u32, required: bool) -> OpenIdReturnType<Self> {
        if type_uri.trim().is_empty() {
            return Err(OpenIdError::new_type_error("AX type uri must not be empty"));
        }

        if count == 0 {
            return Err(OpenIdError::new_type_error("AX count must be at least 1"));
        }

        Ok(Self {
            type_uri: type_uri.to_string(),
            count,
            required,
            alias: None,
        })
    }
}

/// # FetchRequest
/// Attribute Exchange fetch request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    attributes: Vec<AttrInfo>,
    /// Where the provider may send unsolicited updates
    pub update_url: Option<String>,
}

impl FetchRequest {
    /// Empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute. The same type uri cannot be asked for twice.
    pub fn add(&mut self, attribute: AttrInfo) -> OpenIdReturnType<()> {
        if self
            .attributes
            .iter()
            .any(|a| a.type_uri == attribute.type_uri)
        {
            return Err(OpenIdError::new_type_error(format!(
                "the attribute {} has already been requested",
                attribute.type_uri
            )));
        }

        self.attributes.push(attribute);
        Ok(())
    }

    /// Requested attributes in insertion order
    pub fn attributes(&self) -> &[AttrInfo] {
        &self.attributes
    }

    /// Whether nothing is requested
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn aliased(&self) -> Vec<(String, &AttrInfo)> {
        self.attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.alias.clone().unwrap_or_else(|| format!("ext{i}")), a))
            .collect()
    }
}

impl Extension for FetchRequest {
    fn ns_uri(&self) -> &str {
        AX_NS
    }

    fn extension_args(&self) -> Vec<(String, String)> {
        let mut args = vec![("mode".to_string(), "fetch_request".to_string())];
        let mut required = vec![];
        let mut if_available = vec![];

        for (alias, attribute) in self.aliased() {
            args.push((format!("type.{alias}"), attribute.type_uri.clone()));
            args.push((format!("count.{alias}"), attribute.count.to_string()));

            if attribute.required {
                required.push(alias);
            } else {
                if_available.push(alias);
            }
        }

        if !required.is_empty() {
            args.push(("required".to_string(), required.join(",")));
        }

        if !if_available.is_empty() {
            args.push(("if_available".to_string(), if_available.join(",")));
        }

        if let Some(update_url) = &self.update_url {
            args.push(("update_url".to_string(), update_url.clone()));
        }

        args
    }
}

/// # FetchResponse
/// Attribute values returned for a fetch request, keyed by type uri
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    /// Values per type uri
    pub data: BTreeMap<String, Vec<String>>,
}

impl FetchResponse {
    /// Reads the fetch response of a positive assertion.
    ///
    /// `Ok(None)` when the assertion carries no (or, with `signed`, no fully signed)
    /// attribute exchange data.
    pub fn from_success_response(
        response: &SuccessResponse,
        signed: bool,
    ) -> OpenIdReturnType<Option<Self>> {
        let Some(args) = response.extension_response(AX_NS, signed) else {
            return Ok(None);
        };

        if args.is_empty() {
            return Ok(None);
        }

        Self::parse_extension_args(&args).map(Some)
    }

    /// Parses the `fetch_response` arguments
    pub fn parse_extension_args(args: &BTreeMap<String, String>) -> OpenIdReturnType<Self> {
        if args.get("mode").map(String::as_str) != Some("fetch_response") {
            return Err(OpenIdError::new_protocol_error(
                "AX response mode is not fetch_response",
            ));
        }

        let mut data = BTreeMap::new();

        for (key, type_uri) in args {
            let Some(alias) = key.strip_prefix("type.") else {
                continue;
            };

            let values = match args.get(&format!("count.{alias}")) {
                Some(count) => {
                    let count: usize = count.parse().map_err(|_| {
                        OpenIdError::new_protocol_error(format!("invalid AX count for {alias}"))
                    })?;

                    let value_prefix = format!("value.{alias}.");
                    let present = args
                        .keys()
                        .filter(|k| k.starts_with(&value_prefix))
                        .count();

                    if count > present {
                        return Err(OpenIdError::new_protocol_error(format!(
                            "AX count {count} for {alias} exceeds the {present} value(s) sent"
                        )));
                    }

                    (1..=count)
                        .map(|i| {
                            args.get(&format!("{value_prefix}{i}")).cloned().ok_or_else(|| {
                                OpenIdError::new_protocol_error(format!(
                                    "missing AX value {i} for {alias}"
                                ))
                            })
                        })
                        .collect::<OpenIdReturnType<Vec<String>>>()?
                }
                None => args
                    .get(&format!("value.{alias}"))
                    .map(|v| vec![v.clone()])
                    .unwrap_or_default(),
            };

            data.insert(type_uri.clone(), values);
        }

        Ok(Self { data })
    }
}
