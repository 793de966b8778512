//! # Endpoints
//! The two pages of the OpenID module: the identifier form and the provider callback.

mod consumer;
mod linkback;
pub(crate) mod templates;

pub use consumer::consumer_endpoint;
pub use linkback::linkback_endpoint;

use crate::source::{OpenIdConsumer, SourceRegistry, StatePersistence, Transaction};
use crate::types::{OpenIdError, OpenIdHttpClient, OpenIdReturnType};

/// Request parameter carrying the transaction id
pub const AUTH_STATE_PARAM: &str = "AuthState";
/// Request parameter carrying the identifier typed by the user
pub const IDENTIFIER_PARAM: &str = "openid_url";

fn param<'p>(params: &'p [(String, String)], name: &str) -> Option<&'p str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Transaction id of the request, which must be present
fn auth_state(params: &[(String, String)]) -> OpenIdReturnType<&str> {
    param(params, AUTH_STATE_PARAM).ok_or_else(|| {
        OpenIdError::new_bad_request(format!("Missing mandatory parameter: {AUTH_STATE_PARAM}"))
    })
}

/// Loads the transaction `state_id` saved under `stage` and the source running it
fn resolve<'r, C: OpenIdHttpClient, P: StatePersistence + ?Sized>(
    registry: &'r SourceRegistry<C>,
    persistence: &P,
    state_id: &str,
    stage: &str,
) -> OpenIdReturnType<(Transaction, &'r OpenIdConsumer<C>)> {
    let state = persistence.load_state(state_id, stage)?;

    let source_id = state.auth_id.clone().unwrap_or_default();

    let source = registry.get_by_id(&source_id).ok_or_else(|| {
        OpenIdError::new_bad_request(format!("Invalid AuthId '{source_id}' - not found."))
    })?;

    Ok((state, source))
}
