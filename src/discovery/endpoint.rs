use serde::{Deserialize, Serialize};

use crate::message::{OPENID1_NS, OPENID2_NS};

/// Service type of an OpenID 2.0 provider that selects the identity itself
pub const OPENID_IDP_2_0_TYPE: &str = "http://specs.openid.net/auth/2.0/server";
/// Service type of an OpenID 2.0 claimed identifier
pub const OPENID_2_0_TYPE: &str = "http://specs.openid.net/auth/2.0/signon";
/// Service type of an OpenID 1.1 identifier
pub const OPENID_1_1_TYPE: &str = "http://openid.net/signon/1.1";
/// Service type of an OpenID 1.0 identifier
pub const OPENID_1_0_TYPE: &str = "http://openid.net/signon/1.0";

/// Service types in order of preference
pub const OPENID_TYPE_URIS: [&str; 4] = [
    OPENID_IDP_2_0_TYPE,
    OPENID_2_0_TYPE,
    OPENID_1_1_TYPE,
    OPENID_1_0_TYPE,
];

/// # ServiceEndpoint
/// An OpenID provider endpoint found while discovering an identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Identifier the user claims. `None` for OP identifier endpoints.
    pub claimed_id: Option<String>,
    /// Url of the provider endpoint
    pub server_url: String,
    /// Service types advertised for the endpoint
    pub type_uris: Vec<String>,
    /// Identifier the provider knows the user by, when delegating
    pub local_id: Option<String>,
    /// Canonical id from an XRDS document
    pub canonical_id: Option<String>,
    /// Whether the endpoint came from a Yadis (XRDS) document
    pub used_yadis: bool,
}

impl ServiceEndpoint {
    /// Whether the endpoint advertises `type_uri`
    pub fn supports_type(&self, type_uri: &str) -> bool {
        self.type_uris.iter().any(|t| t == type_uri)
            || (type_uri == OPENID_2_0_TYPE && self.is_op_identifier())
    }

    /// Endpoint where the provider picks the identifier
    pub fn is_op_identifier(&self) -> bool {
        self.type_uris.iter().any(|t| t == OPENID_IDP_2_0_TYPE)
    }

    /// OpenID namespace to talk to this endpoint in
    pub fn preferred_namespace(&self) -> &'static str {
        if self.is_op_identifier() || self.supports_type(OPENID_2_0_TYPE) {
            return OPENID2_NS;
        }

        OPENID1_NS
    }

    /// OpenID 1.x endpoint
    pub fn compatibility_mode(&self) -> bool {
        self.preferred_namespace() != OPENID2_NS
    }

    /// Identifier to send to the provider
    pub fn get_local_id(&self) -> Option<&str> {
        self.local_id.as_deref().or(self.claimed_id.as_deref())
    }

    pub(crate) fn type_rank(&self) -> usize {
        OPENID_TYPE_URIS
            .iter()
            .position(|t| self.type_uris.iter().any(|u| u == t))
            .unwrap_or(OPENID_TYPE_URIS.len())
    }
}
