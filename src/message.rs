//! # OpenID protocol message
//! Namespace aware view over the `openid.*` arguments exchanged with a provider.

use std::collections::BTreeMap;

use crate::extensions::{SREG_1_0_NS, SREG_1_1_NS};
use crate::helpers::{append_query_args, escape_html, kv_form_to_pairs, pairs_to_kv_form};
use crate::types::OpenIdReturnType;

/// OpenID 2.0 namespace
pub const OPENID2_NS: &str = "http://specs.openid.net/auth/2.0";
/// OpenID 1.0 namespace
pub const OPENID1_NS: &str = "http://openid.net/signon/1.0";
/// OpenID 1.1 namespace
pub const OPENID11_NS: &str = "http://openid.net/signon/1.1";
/// Identifier sent when the provider should pick the identity
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Keys of the OpenID namespace that are not aliases
const RESERVED_ALIASES: [&str; 14] = [
    "assoc_handle",
    "assoc_type",
    "claimed_id",
    "identity",
    "mode",
    "ns",
    "op_endpoint",
    "realm",
    "response_nonce",
    "return_to",
    "sig",
    "signed",
    "trust_root",
    "error",
];

/// An OpenID message. Keys are stored without the `openid.` prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: BTreeMap<String, String>,
}

impl Message {
    /// Creates an empty message in the given OpenID namespace
    pub fn new(openid_ns: &str) -> Self {
        let mut message = Self::default();
        if openid_ns == OPENID2_NS {
            message.set("ns", OPENID2_NS);
        }
        message
    }

    /// Builds a message from request parameters, everything outside `openid.` is ignored
    pub fn from_post_args<I, K, V>(args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let fields = args
            .into_iter()
            .filter_map(|(k, v)| {
                k.as_ref()
                    .strip_prefix("openid.")
                    .map(|key| (key.to_string(), v.into()))
            })
            .collect();

        Self { fields }
    }

    /// Builds a message from a key-value form body (direct responses)
    pub fn from_kv_form(kv: &str) -> Self {
        Self {
            fields: kv_form_to_pairs(kv).into_iter().collect(),
        }
    }

    /// Whether the message is an OpenID 1.x message
    pub fn is_openid1(&self) -> bool {
        match self.get("ns") {
            None => true,
            Some(ns) => ns == OPENID1_NS || ns == OPENID11_NS,
        }
    }

    /// Gets a key of the OpenID namespace
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Sets a key of the OpenID namespace
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Removes a key of the OpenID namespace
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    /// Alias under which `ns_uri` is declared in this message
    pub fn alias_for(&self, ns_uri: &str) -> Option<String> {
        let declared = self.fields.iter().find_map(|(key, value)| {
            key.strip_prefix("ns.")
                .filter(|_| value == ns_uri)
                .map(str::to_string)
        });

        if declared.is_some() {
            return declared;
        }

        // OpenID 1 providers never declare the sreg namespace
        if self.is_openid1() && (ns_uri == SREG_1_0_NS || ns_uri == SREG_1_1_NS) {
            return Some("sreg".to_string());
        }

        None
    }

    /// All arguments of an extension namespace, keyed without the alias
    pub fn get_args(&self, ns_uri: &str) -> BTreeMap<String, String> {
        let Some(alias) = self.alias_for(ns_uri) else {
            return BTreeMap::new();
        };

        let prefix = alias + ".";

        self.fields
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|k| (k.to_string(), value.clone()))
            })
            .collect()
    }

    /// Sets an extension argument, declaring a namespace alias when needed
    pub fn set_arg(&mut self, ns_uri: &str, key: &str, value: impl Into<String>) {
        let alias = match self.alias_for(ns_uri) {
            Some(alias) => alias,
            None => self.declare_namespace(ns_uri),
        };

        self.set(format!("{alias}.{key}"), value);
    }

    fn declare_namespace(&mut self, ns_uri: &str) -> String {
        let preferred = match ns_uri {
            SREG_1_0_NS | SREG_1_1_NS => Some("sreg"),
            crate::extensions::AX_NS => Some("ax"),
            _ => None,
        };

        let alias = preferred
            .filter(|alias| self.alias_is_free(alias))
            .map(str::to_string)
            .unwrap_or_else(|| {
                (0..)
                    .map(|n| format!("ext{n}"))
                    .find(|alias| self.alias_is_free(alias))
                    .unwrap_or_default()
            });

        self.set(format!("ns.{alias}"), ns_uri);
        alias
    }

    fn alias_is_free(&self, alias: &str) -> bool {
        !RESERVED_ALIASES.contains(&alias) && !self.fields.contains_key(&format!("ns.{alias}"))
    }

    /// Field names listed in `openid.signed`
    pub fn signed_fields(&self) -> Vec<String> {
        self.get("signed")
            .map(|signed| signed.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether `key` (without the `openid.` prefix) is covered by the signature
    pub fn is_signed(&self, key: &str) -> bool {
        self.signed_fields().iter().any(|field| field == key)
    }

    /// Arguments of `ns_uri`, only if every one of them is signed
    pub fn get_signed_args(&self, ns_uri: &str) -> Option<BTreeMap<String, String>> {
        let alias = self.alias_for(ns_uri)?;
        let args = self.get_args(ns_uri);

        if args.keys().all(|key| self.is_signed(&format!("{alias}.{key}"))) {
            return Some(args);
        }

        None
    }

    /// Arguments with the `openid.` prefix, as sent in a query string or a form
    pub fn to_post_args(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| (format!("openid.{k}"), v.clone()))
            .collect()
    }

    /// Encodes the message in key-value form
    pub fn to_kv_form(&self) -> OpenIdReturnType<String> {
        let pairs: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        pairs_to_kv_form(&pairs)
    }

    /// Appends the message to `base_url` as query arguments
    pub fn to_url(&self, base_url: &str) -> OpenIdReturnType<String> {
        append_query_args(base_url, &self.to_post_args())
    }

    /// Html form posting the message to `action_url`
    pub fn to_form_markup(&self, action_url: &str, form_id: &str) -> String {
        let mut html = format!(
            r#"<form accept-charset="UTF-8" enctype="application/x-www-form-urlencoded" id="{}" action="{}" method="post">"#,
            escape_html(form_id),
            escape_html(action_url)
        ) + "\n";

        for (name, value) in self.to_post_args() {
            html = html
                + r#"<input type="hidden" name=""#
                + &escape_html(&name)
                + r#"" value=""#
                + &escape_html(&value)
                + r#"" />"#
                + "\n";
        }

        html += r#"<input type="submit" value="Continue" />"#;
        html += "\n</form>";

        html
    }
}
