use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, warn};
use url::Url;

use crate::association::{Association, HMAC_SHA256};
use crate::discovery::{discover_async, ServiceEndpoint, OPENID_1_1_TYPE, OPENID_2_0_TYPE};
use crate::helpers::{make_nonce, now, split_nonce, strip_fragment, validate_url};
use crate::message::{Message, IDENTIFIER_SELECT, OPENID2_NS};
use crate::store::{ConsumerSession, OpenIdStore};
use crate::types::{HttpRequest, OpenIdError, OpenIdHttpClient, OpenIdReturnType};

use super::auth_request::AuthRequest;
use super::response::{ConsumerResponse, SuccessResponse};

/// Session key of the endpoint the last request was sent to
pub const LAST_ENDPOINT_KEY: &str = "_openid_consumer_last_token";
/// Largest accepted distance between a nonce timestamp and now, in seconds
pub const NONCE_SKEW: i64 = 60 * 60 * 5;
/// return_to argument carrying the nonce of OpenID 1.x requests
pub const RP_NONCE_ARG: &str = "rp_nonce";
/// return_to argument carrying the claimed identifier of OpenID 1.x requests
pub const OPENID1_CLAIMED_ID_ARG: &str = "openid1_claimed_id";

const SESSION_TYPE: &str = "no-encryption";

/// # Consumer
/// Runs the relying party side of one OpenID authentication.
///
/// `store` keeps associations, `session` remembers which endpoint the user was sent
/// to between [Consumer::begin_async] and [Consumer::complete_async].
pub struct Consumer<'a, S, K, C>
where
    S: OpenIdStore + ?Sized,
    K: ConsumerSession + ?Sized,
    C: OpenIdHttpClient,
{
    store: &'a mut S,
    session: &'a K,
    http_client: &'a C,
}

impl<'a, S, K, C> Consumer<'a, S, K, C>
where
    S: OpenIdStore + ?Sized,
    K: ConsumerSession + ?Sized,
    C: OpenIdHttpClient,
{
    /// Creates a consumer
    pub fn new(store: &'a mut S, session: &'a K, http_client: &'a C) -> Self {
        Self {
            store,
            session,
            http_client,
        }
    }

    /// # Begin
    /// Discovers `identifier` and prepares a request to its preferred endpoint.
    pub async fn begin_async(&mut self, identifier: &str) -> OpenIdReturnType<AuthRequest> {
        let (claimed_id, endpoints) = discover_async(identifier, self.http_client).await?;

        let Some(endpoint) = endpoints.into_iter().next() else {
            return Err(OpenIdError::new_discovery_error(format!(
                "no OpenID services found for {claimed_id}"
            )));
        };

        self.begin_without_discovery_async(endpoint).await
    }

    /// # Begin without discovery
    /// Prepares a request to an already known endpoint.
    pub async fn begin_without_discovery_async(
        &mut self,
        endpoint: ServiceEndpoint,
    ) -> OpenIdReturnType<AuthRequest> {
        let association = self.get_association_async(&endpoint).await?;

        let mut request = AuthRequest::new(endpoint, association);

        if request.endpoint.compatibility_mode() {
            request
                .return_to_args
                .push((RP_NONCE_ARG.to_string(), make_nonce(now())));

            if let Some(claimed_id) = &request.endpoint.claimed_id {
                request
                    .return_to_args
                    .push((OPENID1_CLAIMED_ID_ARG.to_string(), claimed_id.clone()));
            }
        }

        let serialized = serde_json::to_string(&request.endpoint)
            .map_err(|e| OpenIdError::new_type_error(e.to_string()))?;
        self.session.set(LAST_ENDPOINT_KEY, serialized);

        Ok(request)
    }

    /// Stored or freshly negotiated association, `None` means stateless mode
    async fn get_association_async(
        &mut self,
        endpoint: &ServiceEndpoint,
    ) -> OpenIdReturnType<Option<Association>> {
        if endpoint.compatibility_mode() || !endpoint.server_url.starts_with("https://") {
            return Ok(None);
        }

        if let Some(association) = self.store.get_association(&endpoint.server_url, None) {
            return Ok(Some(association));
        }

        match self.negotiate_association_async(&endpoint.server_url).await {
            Ok(association) => {
                self.store
                    .store_association(&endpoint.server_url, &association)?;
                Ok(Some(association))
            }
            Err(e) => {
                warn!(
                    "could not associate with {}, continuing in stateless mode: {e}",
                    endpoint.server_url
                );
                Ok(None)
            }
        }
    }

    async fn negotiate_association_async(&self, server_url: &str) -> OpenIdReturnType<Association> {
        let mut request = Message::new(OPENID2_NS);
        request.set("mode", "associate");
        request.set("assoc_type", HMAC_SHA256);
        request.set("session_type", SESSION_TYPE);

        let response = self.direct_request_async(server_url, &request).await?;

        let field = |name: &str| {
            response.get(name).ok_or_else(|| {
                OpenIdError::new_protocol_error(format!("associate response lacks {name}"))
            })
        };

        if field("assoc_type")? != HMAC_SHA256 || field("session_type")? != SESSION_TYPE {
            return Err(OpenIdError::new_protocol_error(
                "provider answered with an unsupported association type",
            ));
        }

        let expires_in: i64 = field("expires_in")?.parse().map_err(|_| {
            OpenIdError::new_protocol_error("associate response has an invalid expires_in")
        })?;

        let secret = STANDARD
            .decode(field("mac_key")?)
            .map_err(|_| OpenIdError::new_protocol_error("mac_key is not base64"))?;

        debug!("associated with {server_url}");

        Ok(Association::from_expires_in(
            expires_in,
            field("assoc_handle")?,
            secret,
            HMAC_SHA256,
        ))
    }

    /// Posts `message` to the provider and reads its key-value form answer
    async fn direct_request_async(
        &self,
        server_url: &str,
        message: &Message,
    ) -> OpenIdReturnType<Message> {
        let req = HttpRequest::new(validate_url(server_url)?).form(&message.to_post_args());

        let res = self
            .http_client
            .request(req)
            .await
            .map_err(OpenIdError::new_http_error)?;

        let response = Message::from_kv_form(res.body.as_deref().unwrap_or_default());

        match res.status_code {
            200 => Ok(response),
            400 => Err(OpenIdError::new_protocol_error(format!(
                "server error: {}",
                response.get("error").unwrap_or("no error message")
            ))),
            status => Err(OpenIdError::new_protocol_error(format!(
                "server returned status {status} to a direct request"
            ))),
        }
    }

    /// # Complete
    /// Verifies the response the provider sent the browser back with.
    ///
    /// `query` holds the parameters of the request that reached `current_url`.
    /// Verification failures come back as [ConsumerResponse::Failure], only failures
    /// of the store are errors.
    pub async fn complete_async(
        &mut self,
        query: &[(String, String)],
        current_url: &str,
    ) -> OpenIdReturnType<ConsumerResponse> {
        let endpoint = self
            .session
            .get(LAST_ENDPOINT_KEY)
            .and_then(|serialized| serde_json::from_str::<ServiceEndpoint>(&serialized).ok());
        self.session.del(LAST_ENDPOINT_KEY);

        let message = Message::from_post_args(query.iter().map(|(k, v)| (k, v.clone())));

        let mode = message.get("mode").unwrap_or_default().to_string();

        let response = match mode.as_str() {
            "cancel" => ConsumerResponse::Cancel { endpoint },
            "error" => ConsumerResponse::Failure {
                endpoint,
                message: message.get("error").map(str::to_string),
            },
            "setup_needed" if !message.is_openid1() => ConsumerResponse::SetupNeeded {
                endpoint,
                setup_url: None,
            },
            "id_res" if message.is_openid1() && message.get("user_setup_url").is_some() => {
                ConsumerResponse::SetupNeeded {
                    endpoint,
                    setup_url: message.get("user_setup_url").map(str::to_string),
                }
            }
            "id_res" => {
                match self
                    .complete_id_res_async(message, endpoint.clone(), query, current_url)
                    .await
                {
                    Ok(success) => ConsumerResponse::Success(Box::new(success)),
                    Err(e @ OpenIdError::State(_)) => return Err(e),
                    Err(e) => {
                        debug!("rejecting positive assertion: {e}");
                        ConsumerResponse::failure(endpoint, e.to_string())
                    }
                }
            }
            "" => ConsumerResponse::failure(endpoint, "No mode set"),
            mode => ConsumerResponse::failure(endpoint, format!("Invalid openid.mode '{mode}'")),
        };

        Ok(response)
    }

    async fn complete_id_res_async(
        &mut self,
        message: Message,
        endpoint: Option<ServiceEndpoint>,
        query: &[(String, String)],
        current_url: &str,
    ) -> OpenIdReturnType<SuccessResponse> {
        check_required_fields(&message)?;
        verify_return_to(&message, query, current_url)?;

        let endpoint = self
            .verify_discovery_results_async(&message, endpoint, query)
            .await?;

        self.check_signature_async(&message, &endpoint.server_url)
            .await?;
        self.check_nonce(&message, &endpoint, query)?;

        let identity_url = endpoint.claimed_id.clone().ok_or_else(|| {
            OpenIdError::new_protocol_error("assertion does not identify the user")
        })?;

        let signed_fields = message
            .signed_fields()
            .into_iter()
            .map(|field| format!("openid.{field}"))
            .collect();

        Ok(SuccessResponse {
            endpoint,
            identity_url,
            message,
            signed_fields,
        })
    }

    /// The endpoint the assertion really comes from.
    ///
    /// The endpoint remembered in the session is used when it matches the assertion,
    /// otherwise the claimed identifier is discovered again.
    async fn verify_discovery_results_async(
        &self,
        message: &Message,
        session_endpoint: Option<ServiceEndpoint>,
        query: &[(String, String)],
    ) -> OpenIdReturnType<ServiceEndpoint> {
        let to_match = if message.is_openid1() {
            let claimed_id = query_value(query, OPENID1_CLAIMED_ID_ARG)
                .map(str::to_string)
                .or_else(|| session_endpoint.as_ref().and_then(|e| e.claimed_id.clone()))
                .ok_or_else(|| {
                    OpenIdError::new_protocol_error("no claimed identifier for OpenID 1 response")
                })?;

            ServiceEndpoint {
                claimed_id: Some(claimed_id),
                server_url: session_endpoint
                    .as_ref()
                    .map(|e| e.server_url.clone())
                    .unwrap_or_default(),
                type_uris: vec![OPENID_1_1_TYPE.to_string()],
                local_id: message.get("identity").map(str::to_string),
                ..Default::default()
            }
        } else {
            let claimed_id = message.get("claimed_id").ok_or_else(|| {
                OpenIdError::new_protocol_error("assertion does not identify the user")
            })?;

            if claimed_id == IDENTIFIER_SELECT {
                return Err(OpenIdError::new_protocol_error(
                    "provider asserted identifier_select",
                ));
            }

            ServiceEndpoint {
                claimed_id: Some(claimed_id.to_string()),
                server_url: message.get("op_endpoint").unwrap_or_default().to_string(),
                type_uris: vec![OPENID_2_0_TYPE.to_string()],
                local_id: message.get("identity").map(str::to_string),
                ..Default::default()
            }
        };

        if let Some(endpoint) = session_endpoint.filter(|e| endpoint_matches(e, &to_match)) {
            return Ok(ServiceEndpoint {
                claimed_id: to_match.claimed_id,
                ..endpoint
            });
        }

        let claimed_id = to_match.claimed_id.as_deref().unwrap_or_default();

        debug!("discovering {claimed_id} again to verify the assertion");

        let (_, endpoints) = discover_async(strip_fragment(claimed_id), self.http_client).await?;

        endpoints
            .into_iter()
            .find(|e| {
                let version_matches = if message.is_openid1() {
                    e.compatibility_mode()
                } else {
                    e.supports_type(OPENID_2_0_TYPE) && e.server_url == to_match.server_url
                };

                version_matches
                    && !e.is_op_identifier()
                    && e.get_local_id() == to_match.get_local_id()
            })
            .map(|e| ServiceEndpoint {
                claimed_id: to_match.claimed_id.clone(),
                ..e
            })
            .ok_or_else(|| {
                OpenIdError::new_protocol_error(format!(
                    "no matching endpoint found after discovering {claimed_id}"
                ))
            })
    }

    async fn check_signature_async(
        &self,
        message: &Message,
        server_url: &str,
    ) -> OpenIdReturnType<()> {
        let handle = message.get("assoc_handle");

        let association = self
            .store
            .get_association(server_url, handle)
            .filter(|a| a.assoc_type == HMAC_SHA256);

        if let Some(association) = association {
            if !association.check_message_signature(message)? {
                return Err(OpenIdError::new_protocol_error("Bad signature"));
            }

            return Ok(());
        }

        self.check_authentication_async(message, server_url).await
    }

    /// Asks the provider whether it issued the assertion
    async fn check_authentication_async(
        &self,
        message: &Message,
        server_url: &str,
    ) -> OpenIdReturnType<()> {
        let mut request = message.clone();
        request.set("mode", "check_authentication");

        let response = self.direct_request_async(server_url, &request).await?;

        if response.get("is_valid") != Some("true") {
            return Err(OpenIdError::new_protocol_error(
                "Server denied check_authentication",
            ));
        }

        Ok(())
    }

    fn check_nonce(
        &mut self,
        message: &Message,
        endpoint: &ServiceEndpoint,
        query: &[(String, String)],
    ) -> OpenIdReturnType<()> {
        let (nonce, server_url) = if message.is_openid1() {
            (query_value(query, RP_NONCE_ARG), "")
        } else {
            (message.get("response_nonce"), endpoint.server_url.as_str())
        };

        let nonce = nonce
            .ok_or_else(|| OpenIdError::new_protocol_error("Nonce missing from response"))?;

        let (timestamp, salt) = split_nonce(nonce)?;

        if (now() - timestamp).abs() > NONCE_SKEW {
            return Err(OpenIdError::new_protocol_error(format!(
                "Nonce timestamp out of range: {nonce}"
            )));
        }

        if !self.store.accept_nonce(server_url, timestamp, &salt) {
            return Err(OpenIdError::new_protocol_error(format!(
                "Nonce already used or out of range: {nonce}"
            )));
        }

        Ok(())
    }
}

fn query_value<'q>(query: &'q [(String, String)], name: &str) -> Option<&'q str> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn claimed_without_fragment(endpoint: &ServiceEndpoint) -> Option<&str> {
    endpoint.claimed_id.as_deref().map(strip_fragment)
}

fn endpoint_matches(candidate: &ServiceEndpoint, to_match: &ServiceEndpoint) -> bool {
    let server_matches =
        to_match.server_url.is_empty() || candidate.server_url == to_match.server_url;

    claimed_without_fragment(candidate) == claimed_without_fragment(to_match)
        && candidate.get_local_id() == to_match.get_local_id()
        && server_matches
        && candidate.compatibility_mode() == to_match.compatibility_mode()
}

fn check_required_fields(message: &Message) -> OpenIdReturnType<()> {
    let (required, signed_if_present): (&[&str], &[&str]) = if message.is_openid1() {
        (
            &["return_to", "assoc_handle", "sig", "signed", "identity"],
            &["return_to", "identity"],
        )
    } else {
        (
            &[
                "return_to",
                "assoc_handle",
                "sig",
                "signed",
                "op_endpoint",
                "response_nonce",
            ],
            &[
                "return_to",
                "response_nonce",
                "claimed_id",
                "identity",
                "assoc_handle",
                "op_endpoint",
            ],
        )
    };

    for field in required {
        if message.get(field).is_none() {
            return Err(OpenIdError::new_protocol_error(format!(
                "Missing required field {field}"
            )));
        }
    }

    if !message.is_openid1() && message.get("claimed_id").is_some() != message.get("identity").is_some()
    {
        return Err(OpenIdError::new_protocol_error(
            "claimed_id and identity must be sent together",
        ));
    }

    for field in signed_if_present {
        if message.get(field).is_some() && !message.is_signed(field) {
            return Err(OpenIdError::new_protocol_error(format!(
                "\"{field}\" not signed"
            )));
        }
    }

    Ok(())
}

/// The assertion must be addressed to the url it arrived at, with every return_to
/// argument present in the request
fn verify_return_to(
    message: &Message,
    query: &[(String, String)],
    current_url: &str,
) -> OpenIdReturnType<()> {
    let return_to = message
        .get("return_to")
        .ok_or_else(|| OpenIdError::new_protocol_error("Missing required field return_to"))?;

    let invalid = || OpenIdError::new_protocol_error(format!("Invalid return_to {return_to}"));

    let expected = Url::parse(return_to).map_err(|_| invalid())?;
    let actual = Url::parse(current_url).map_err(|_| invalid())?;

    if expected.scheme() != actual.scheme()
        || expected.host_str() != actual.host_str()
        || expected.port_or_known_default() != actual.port_or_known_default()
        || expected.path() != actual.path()
    {
        return Err(OpenIdError::new_protocol_error(format!(
            "return_to {return_to} does not match the current url {current_url}"
        )));
    }

    for (key, value) in expected.query_pairs() {
        match query_value(query, &key) {
            Some(v) if v == value => {}
            Some(v) => {
                return Err(OpenIdError::new_protocol_error(format!(
                    "parameter {key} value {v:?} does not match return_to value {value:?}"
                )))
            }
            None => {
                return Err(OpenIdError::new_protocol_error(format!(
                    "return_to parameter {key} absent from query"
                )))
            }
        }
    }

    Ok(())
}
