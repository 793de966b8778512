use tracing::debug;

use crate::source::{run_phase, AuthSource, Host, SourceRegistry, AUTH_STAGE};
use crate::types::{HostResponse, Interrupt, OpenIdError, OpenIdHttpClient, OpenIdReturnType};

use super::{auth_state, resolve};

/// # Linkback endpoint
/// Where the provider sends the user back to. Completes the login, failures go to
/// the error handling of the host.
pub async fn linkback_endpoint<C: OpenIdHttpClient, H: Host + ?Sized>(
    registry: &SourceRegistry<C>,
    host: &H,
) -> OpenIdReturnType<HostResponse> {
    let params = host.request_params();
    let state_id = auth_state(&params)?;

    let (mut state, source) = resolve(registry, host, state_id, AUTH_STAGE)?;

    let error = match run_phase(source.post_auth(&mut state, host)).await {
        Interrupt::Halt(response) => return Ok(response),
        Interrupt::Error(e) if e.is_host_error() => e,
        Interrupt::Error(e) => {
            debug!("OpenID linkback failed: {e}");
            OpenIdError::new_auth_source_with_cause(
                source.auth_id(),
                "Error on OpenID linkback endpoint.",
                e,
            )
        }
    };

    Ok(host.throw_exception(&state, error))
}
