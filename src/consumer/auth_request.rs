use crate::association::Association;
use crate::discovery::ServiceEndpoint;
use crate::extensions::Extension;
use crate::helpers::append_query_args;
use crate::message::{Message, IDENTIFIER_SELECT};
use crate::types::{OpenIdError, OpenIdReturnType};

use super::realm::Realm;

/// # AuthRequest
/// Authentication request to send to a discovered provider endpoint.
///
/// Returned by [super::Consumer::begin_async]. Extensions are added to it, then it is
/// turned into either a redirect url or a self posting html form.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Endpoint the request goes to
    pub endpoint: ServiceEndpoint,
    /// Association the response will be signed with, `None` in stateless mode
    pub association: Option<Association>,
    /// Extra arguments appended to the return_to url
    pub return_to_args: Vec<(String, String)>,
    message: Message,
}

impl AuthRequest {
    pub(crate) fn new(endpoint: ServiceEndpoint, association: Option<Association>) -> Self {
        let message = Message::new(endpoint.preferred_namespace());

        Self {
            endpoint,
            association,
            return_to_args: vec![],
            message,
        }
    }

    /// Adds an extension request (SReg, AX...) to the message
    pub fn add_extension(&mut self, extension: &impl Extension) {
        extension.to_message(&mut self.message);
    }

    /// Adds a single extension argument in the `namespace` extension
    pub fn add_extension_arg(&mut self, namespace: &str, key: &str, value: impl Into<String>) {
        self.message.set_arg(namespace, key, value);
    }

    /// OpenID 1.x providers only understand redirects
    pub fn should_send_redirect(&self) -> bool {
        self.endpoint.compatibility_mode()
    }

    /// The `checkid_setup` message for `realm` and `return_to`
    pub fn get_message(&self, realm: &str, return_to: &str) -> OpenIdReturnType<Message> {
        let return_to = append_query_args(return_to, &self.return_to_args)?;

        if !Realm::parse(realm)?.validate_url(&return_to) {
            return Err(OpenIdError::new_protocol_error(format!(
                "return_to {return_to:?} does not match realm {realm:?}"
            )));
        }

        let mut message = self.message.clone();
        message.set("mode", "checkid_setup");
        message.set("return_to", return_to);

        if message.is_openid1() {
            message.set("trust_root", realm);
        } else {
            message.set("realm", realm);
        }

        if let Some(association) = &self.association {
            message.set("assoc_handle", association.handle.clone());
        }

        if self.endpoint.is_op_identifier() {
            message.set("claimed_id", IDENTIFIER_SELECT);
            message.set("identity", IDENTIFIER_SELECT);
        } else {
            let claimed_id = self.endpoint.claimed_id.clone().ok_or_else(|| {
                OpenIdError::new_protocol_error("endpoint has no claimed identifier")
            })?;
            let local_id = self
                .endpoint
                .get_local_id()
                .unwrap_or(&claimed_id)
                .to_string();

            if !message.is_openid1() {
                message.set("claimed_id", claimed_id.clone());
            }
            message.set("identity", local_id);
        }

        Ok(message)
    }

    /// Url redirecting the browser to the provider
    pub fn redirect_url(&self, realm: &str, return_to: &str) -> OpenIdReturnType<String> {
        self.get_message(realm, return_to)?
            .to_url(&self.endpoint.server_url)
    }

    /// Html form posting the request to the provider
    pub fn form_markup(
        &self,
        realm: &str,
        return_to: &str,
        form_id: &str,
    ) -> OpenIdReturnType<String> {
        Ok(self
            .get_message(realm, return_to)?
            .to_form_markup(&self.endpoint.server_url, form_id))
    }
}

#[cfg(test)]
mod auth_request_tests {
    use url::Url;

    use super::*;
    use crate::discovery::{OPENID_1_1_TYPE, OPENID_2_0_TYPE, OPENID_IDP_2_0_TYPE};

    fn endpoint(type_uri: &str) -> ServiceEndpoint {
        ServiceEndpoint {
            claimed_id: Some("https://user.example.com/".to_string()),
            server_url: "https://op.example.com/server".to_string(),
            type_uris: vec![type_uri.to_string()],
            local_id: Some("https://user.op.example.com/".to_string()),
            ..Default::default()
        }
    }

    fn query(url: &str, name: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    }

    #[test]
    fn openid2_redirect_carries_claimed_and_local_id() {
        let request = AuthRequest::new(endpoint(OPENID_2_0_TYPE), None);

        let url = request
            .redirect_url("https://rp.example.com/", "https://rp.example.com/cb")
            .unwrap();

        assert!(url.starts_with("https://op.example.com/server?"));
        assert_eq!(Some("checkid_setup".to_string()), query(&url, "openid.mode"));
        assert_eq!(
            Some("https://user.example.com/".to_string()),
            query(&url, "openid.claimed_id")
        );
        assert_eq!(
            Some("https://user.op.example.com/".to_string()),
            query(&url, "openid.identity")
        );
        assert_eq!(
            Some("https://rp.example.com/".to_string()),
            query(&url, "openid.realm")
        );
        assert_eq!(None, query(&url, "openid.assoc_handle"));
        assert!(!request.should_send_redirect());
    }

    #[test]
    fn openid1_uses_trust_root_and_mandates_redirect() {
        let mut request = AuthRequest::new(endpoint(OPENID_1_1_TYPE), None);
        request
            .return_to_args
            .push(("rp_nonce".to_string(), "n".to_string()));

        let url = request
            .redirect_url("https://rp.example.com/", "https://rp.example.com/cb")
            .unwrap();

        assert!(request.should_send_redirect());
        assert_eq!(None, query(&url, "openid.ns"));
        assert_eq!(None, query(&url, "openid.claimed_id"));
        assert_eq!(
            Some("https://rp.example.com/".to_string()),
            query(&url, "openid.trust_root")
        );
        assert_eq!(
            Some("https://rp.example.com/cb?rp_nonce=n".to_string()),
            query(&url, "openid.return_to")
        );
    }

    #[test]
    fn op_identifier_asks_provider_to_select() {
        let mut ep = endpoint(OPENID_IDP_2_0_TYPE);
        ep.claimed_id = None;
        ep.local_id = None;
        let request = AuthRequest::new(ep, None);

        let message = request
            .get_message("https://rp.example.com/", "https://rp.example.com/cb")
            .unwrap();

        assert_eq!(Some(IDENTIFIER_SELECT), message.get("claimed_id"));
        assert_eq!(Some(IDENTIFIER_SELECT), message.get("identity"));
    }

    #[test]
    fn return_to_outside_realm_cannot_be_built() {
        let request = AuthRequest::new(endpoint(OPENID_2_0_TYPE), None);

        assert!(request
            .redirect_url("https://rp.example.com/", "https://evil.example.com/cb")
            .is_err());
        assert!(request
            .form_markup("not a realm", "https://rp.example.com/cb", "openid_message")
            .is_err());
    }
}
