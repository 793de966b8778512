use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::consumer::{AuthRequest, Consumer, ConsumerResponse, SuccessResponse};
use crate::extensions::{FetchResponse, SRegRequest, SRegResponse};
use crate::store::{SessionStore, StateStore};
use crate::types::{Attributes, Diverges, Interrupt, OpenIdError, OpenIdHttpClient, OpenIdReturnType};
use crate::www::templates::transaction_page;
use crate::www::AUTH_STATE_PARAM;

use super::host::Host;
use super::transaction::{Transaction, AUTH_STAGE, INIT_STAGE};
use super::{AuthSource, ConsumerConfig};

/// Longest redirect url sent to an OpenID 2.0 provider, longer requests are posted
pub const REDIRECT_URL_MAX_LENGTH: usize = 2048;
/// Id of the form posting the request to the provider
pub const FORM_ID: &str = "openid_message";
/// Module resource asking the user for an identifier
pub const CONSUMER_RESOURCE: &str = "openid/consumer.php";
/// Module resource the provider sends the user back to
pub const LINKBACK_RESOURCE: &str = "openid/linkback.php";

const GENERAL_ERROR: &str = "General error. Try again.";

lazy_static! {
    static ref AX_ATTRIBUTE_NAME: Regex = Regex::new(r"^(?-u:\w)+:").unwrap();
}

/// # OpenIdConsumer
/// Authentication source logging users in with their OpenID.
///
/// The login runs in three phases, each ending through the host:
///  - [AuthSource::authenticate] records the source on the transaction and sends the user
///    to the identifier form, or straight to [OpenIdConsumer::do_auth] when a target is set
///  - [OpenIdConsumer::do_auth] sends the user to the provider
///  - [OpenIdConsumer::post_auth] verifies the assertion and completes the login
#[derive(Debug, Clone)]
pub struct OpenIdConsumer<C: OpenIdHttpClient> {
    auth_id: String,
    config: ConsumerConfig,
    http_client: C,
}

impl<C: OpenIdHttpClient> OpenIdConsumer<C> {
    /// Creates the source `auth_id`, failing on invalid options
    pub fn new(
        auth_id: impl Into<String>,
        config: ConsumerConfig,
        http_client: C,
    ) -> OpenIdReturnType<Self> {
        let auth_id = auth_id.into();
        config.validate(&auth_id)?;

        Ok(Self {
            auth_id,
            config,
            http_client,
        })
    }

    /// Options of the source
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    fn trust_root<H: Host + ?Sized>(&self, host: &H) -> String {
        match self.config.realm() {
            Some(realm) => realm.to_string(),
            None => host.self_url_host(),
        }
    }

    fn return_to<H: Host + ?Sized>(&self, host: &H, state_id: &str) -> OpenIdReturnType<String> {
        host.module_url(
            LINKBACK_RESOURCE,
            &[(AUTH_STATE_PARAM.to_string(), state_id.to_string())],
        )
    }

    fn redirect_error(&self, error: OpenIdError) -> OpenIdError {
        OpenIdError::new_auth_source(
            &self.auth_id,
            format!("Could not redirect to server: '{error}'"),
        )
    }

    /// Adds the profile data requests and the configured extension arguments
    fn add_extensions(&self, request: &mut AuthRequest) -> OpenIdReturnType<()> {
        if let Some(sreg) = SRegRequest::build(
            &self.config.required_attributes,
            &self.config.optional_attributes,
        )? {
            request.add_extension(&sreg);
        }

        if let Some(fetch_request) = self.config.fetch_request()? {
            request.add_extension(&fetch_request);
        }

        for (ns, key, value) in self.config.extension_arguments() {
            request.add_extension_arg(ns, key, value);
        }

        Ok(())
    }

    /// # Begin
    /// Discovers `identifier` and sends the user to its provider, by redirect or by
    /// rendering a page that posts the request.
    pub async fn do_auth<H: Host + ?Sized>(
        &self,
        state: &mut Transaction,
        identifier: &str,
        host: &H,
    ) -> Diverges {
        let state_id = host.save_state(state, AUTH_STAGE)?;
        let return_to = self.return_to(host, &state_id)?;
        let trust_root = self.trust_root(host);

        let session = SessionStore::new(host);

        let begun = {
            let mut store = StateStore::new(state, host);
            let mut consumer = Consumer::new(&mut store, &session, &self.http_client);
            consumer.begin_async(identifier).await
        };

        let mut request = match begun {
            Ok(request) => request,
            Err(e @ OpenIdError::State(_)) => return Err(e.into()),
            Err(e) => {
                debug!("could not begin OpenID authentication: {e}");
                return Err(
                    OpenIdError::new_bad_request(format!("Not a valid OpenID: '{identifier}'"))
                        .into(),
                );
            }
        };

        self.add_extensions(&mut request)?;

        let should_send_redirect = request.should_send_redirect();

        if self.config.prefer_http_redirect || should_send_redirect {
            let redirect_url = request
                .redirect_url(&trust_root, &return_to)
                .map_err(|e| self.redirect_error(e))?;

            if should_send_redirect || redirect_url.len() <= REDIRECT_URL_MAX_LENGTH {
                return Err(host.redirect_trusted_url(&redirect_url, &[]));
            }
        }

        let form_html = request
            .form_markup(&trust_root, &return_to, FORM_ID)
            .map_err(|e| self.redirect_error(e))?;

        Err(host.render(transaction_page(FORM_ID, &form_html)))
    }

    /// # Complete
    /// Verifies the provider response of the current request and completes the login
    /// with the released attributes.
    pub async fn post_auth<H: Host + ?Sized>(&self, state: &mut Transaction, host: &H) -> Diverges {
        let current_url = host.self_url();
        let query = host.request_params();

        let session = SessionStore::new(host);

        let response = {
            let mut store = StateStore::new(state, host);
            let mut consumer = Consumer::new(&mut store, &session, &self.http_client);
            consumer.complete_async(&query, &current_url).await?
        };

        let success = match response {
            ConsumerResponse::Success(success) => success,
            ConsumerResponse::Cancel { .. } => return Err(OpenIdError::UserAborted.into()),
            ConsumerResponse::Failure {
                message: Some(message),
                ..
            } => {
                return Err(OpenIdError::new_auth_source(
                    &self.auth_id,
                    format!("Authentication failed: '{message}'"),
                )
                .into())
            }
            ConsumerResponse::Failure { message: None, .. }
            | ConsumerResponse::SetupNeeded { .. } => {
                return Err(OpenIdError::new_auth_source(&self.auth_id, GENERAL_ERROR).into())
            }
        };

        let attributes = self.collect_attributes(&success);

        debug!(
            "OpenID Returned Attributes: {}",
            attributes.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        state.attributes = Some(attributes);

        Err(host.complete_auth(state))
    }

    /// Attributes released by a verified assertion.
    ///
    /// `openid.sregkeys` and `openid.axkeys` list the field names and type uris in
    /// ascending order, not in the order the provider sent them.
    fn collect_attributes(&self, response: &SuccessResponse) -> Attributes {
        let mut attributes = Attributes::new();

        attributes.insert("openid".to_string(), vec![response.identity_url.clone()]);
        attributes.insert(
            "openid.server_url".to_string(),
            vec![response.endpoint.server_url.clone()],
        );

        if let Some(canonical_id) = response.canonical_id().filter(|c| !c.is_empty()) {
            attributes.insert("openid.canonicalID".to_string(), vec![canonical_id.to_string()]);
        }

        if let Some(local_id) = response.endpoint.local_id.as_ref().filter(|l| !l.is_empty()) {
            attributes.insert("openid.local_id".to_string(), vec![local_id.clone()]);
        }

        let sreg = SRegResponse::from_success_response(response, self.config.validate_sreg);

        if !sreg.contents().is_empty() {
            attributes.insert(
                "openid.sregkeys".to_string(),
                sreg.contents().keys().cloned().collect(),
            );

            for (key, value) in sreg.contents() {
                attributes.insert(format!("openid.sreg.{key}"), vec![value.clone()]);
            }
        }

        let fetch_response = match FetchResponse::from_success_response(response, true) {
            Ok(fetch_response) => fetch_response,
            Err(e) => {
                debug!("ignoring unusable AX response: {e}");
                None
            }
        };

        if let Some(fetch_response) = fetch_response.filter(|f| !f.data.is_empty()) {
            attributes.insert(
                "openid.axkeys".to_string(),
                fetch_response.data.keys().cloned().collect(),
            );

            for (key, values) in fetch_response.data {
                if AX_ATTRIBUTE_NAME.is_match(&key) {
                    attributes.insert(key, values);
                } else {
                    warn!("Invalid attribute name in AX response: '{key}'");
                }
            }
        }

        attributes
    }
}

impl<C: OpenIdHttpClient> AuthSource for OpenIdConsumer<C> {
    fn auth_id(&self) -> &str {
        &self.auth_id
    }

    async fn authenticate<H: Host + ?Sized>(&self, state: &mut Transaction, host: &H) -> Diverges {
        state.auth_id = Some(self.auth_id.clone());

        if let Some(target) = &self.config.target {
            return self.do_auth(state, target, host).await;
        }

        let state_id = host.save_state(state, INIT_STAGE)?;
        let url = host.module_url(CONSUMER_RESOURCE, &[])?;

        Err(host.redirect_trusted_url(
            &url,
            &[(AUTH_STATE_PARAM.to_string(), state_id)],
        ))
    }
}

/// Runs a phase to its end, for callers that want the [Interrupt] as a value
pub async fn run_phase(phase: impl std::future::Future<Output = Diverges>) -> Interrupt {
    match phase.await {
        Ok(never) => match never {},
        Err(interrupt) => interrupt,
    }
}
