use crate::source::{run_phase, Host, SourceRegistry, CONSUMER_RESOURCE, INIT_STAGE};
use crate::types::{HostResponse, Interrupt, OpenIdHttpClient, OpenIdReturnType};

use super::templates::consumer_page;
use super::{auth_state, param, resolve, IDENTIFIER_PARAM};

/// # Consumer endpoint
/// Asks the user for an OpenID and starts the login with it once submitted.
///
/// Errors of the login show up on the form. Requests without a usable transaction
/// are errors.
pub async fn consumer_endpoint<C: OpenIdHttpClient, H: Host + ?Sized>(
    registry: &SourceRegistry<C>,
    host: &H,
) -> OpenIdReturnType<HostResponse> {
    let params = host.request_params();
    let state_id = auth_state(&params)?;

    let (mut state, source) = resolve(registry, host, state_id, INIT_STAGE)?;

    let mut error = None;

    if let Some(identifier) = param(&params, IDENTIFIER_PARAM) {
        match run_phase(source.do_auth(&mut state, identifier, host)).await {
            Interrupt::Halt(response) => return Ok(response),
            Interrupt::Error(e) => error = Some(e.to_string()),
        }
    }

    let action = host.module_url(CONSUMER_RESOURCE, &[])?;

    Ok(HostResponse::page(consumer_page(
        &action,
        error.as_deref(),
        state_id,
    )))
}
