//! # Discovery
//! Resolves a user supplied identifier to the OpenID provider endpoints serving it.
//!
//! Yadis (XRDS) is tried first, html `<link rel>` declarations are the fallback.

mod endpoint;
mod html;
mod xrds;

use tracing::debug;

use crate::helpers::{normalize_identifier, validate_url};
use crate::types::{HttpRequest, HttpResponse, OpenIdError, OpenIdHttpClient, OpenIdReturnType};

pub use endpoint::{
    ServiceEndpoint, OPENID_1_0_TYPE, OPENID_1_1_TYPE, OPENID_2_0_TYPE, OPENID_IDP_2_0_TYPE,
};

const XRDS_CONTENT_TYPE: &str = "application/xrds+xml";

async fn fetch_async<T: OpenIdHttpClient>(
    url: &str,
    http_client: &T,
) -> OpenIdReturnType<HttpResponse> {
    let req = HttpRequest::new(validate_url(url)?)
        .header("accept", format!("text/html; q=0.3, {XRDS_CONTENT_TYPE}"));

    let res = http_client
        .request(req)
        .await
        .map_err(OpenIdError::new_http_error)?;

    if !(200..300).contains(&res.status_code) {
        return Err(OpenIdError::new_discovery_error(format!(
            "fetching {url} returned status {}",
            res.status_code
        )));
    }

    Ok(res)
}

fn is_xrds(res: &HttpResponse) -> bool {
    res.content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(XRDS_CONTENT_TYPE))
}

/// # Discover
/// Discovers the OpenID endpoints of `identifier`.
///
/// Returns the claimed identifier (the url after redirects, without fragment) and the
/// endpoints in order of preference. When the identifier points at an OpenID 2.0 provider
/// (OP identifier) only those endpoints are returned.
pub async fn discover_async<T: OpenIdHttpClient>(
    identifier: &str,
    http_client: &T,
) -> OpenIdReturnType<(String, Vec<ServiceEndpoint>)> {
    let url = normalize_identifier(identifier)?;

    let res = fetch_async(url.as_str(), http_client).await?;

    let mut claimed_id = match &res.final_url {
        Some(final_url) => normalize_identifier(final_url)?.to_string(),
        None => url.to_string(),
    };

    let body = res.body.clone().unwrap_or_default();

    let mut endpoints = if is_xrds(&res) {
        xrds::parse_xrds(&claimed_id, &body)
    } else {
        let location = res
            .xrds_location
            .clone()
            .or_else(|| html::find_xrds_location(&body));

        match location {
            Some(location) => match fetch_async(&location, http_client).await {
                Ok(xrds_res) => xrds::parse_xrds(&claimed_id, &xrds_res.body.unwrap_or_default()),
                Err(e) => {
                    debug!("ignoring unusable XRDS document at {location}: {e}");
                    vec![]
                }
            },
            None => vec![],
        }
    };

    if endpoints.is_empty() && !is_xrds(&res) {
        endpoints = html::parse_html(&claimed_id, &body);
    }

    if endpoints.iter().any(ServiceEndpoint::is_op_identifier) {
        endpoints.retain(ServiceEndpoint::is_op_identifier);
        claimed_id = url.to_string();
    }

    debug!(
        "discovered {} OpenID endpoint(s) for {claimed_id}",
        endpoints.len()
    );

    Ok((claimed_id, endpoints))
}
