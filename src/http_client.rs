//! Default Http Client

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, redirect::Policy, ClientBuilder, Method, Response};

use crate::types::http_client::{HttpMethod, HttpRequest, HttpResponse, OpenIdHttpClient};

const XRDS_LOCATION: &str = "x-xrds-location";

/// The default HttpClient. Follows redirects, the final url is reported in
/// [HttpResponse::final_url].
#[derive(Debug, Clone, Default)]
pub struct DefaultHttpClient;

impl DefaultHttpClient {
    async fn to_response(response: Response) -> HttpResponse {
        let status_code = response.status().as_u16();
        let final_url = Some(response.url().to_string());
        let response_headers = response.headers().clone();

        let mut content_type = None;

        if let Some(Ok(ct)) = response_headers
            .get(CONTENT_TYPE)
            .map(|ct| ct.to_str().map(|s| s.to_string()))
        {
            content_type = Some(ct);
        };

        let mut xrds_location = None;

        if let Some(Ok(location)) = response_headers
            .get(XRDS_LOCATION)
            .map(|location| location.to_str().map(|s| s.to_string()))
        {
            xrds_location = Some(location);
        };

        let body_result = response.text().await;
        let mut body: Option<String> = None;
        if let Ok(body_string) = body_result {
            if !body_string.is_empty() {
                body = Some(body_string);
            }
        }

        HttpResponse {
            status_code,
            content_type,
            xrds_location,
            final_url,
            body,
        }
    }
}

impl OpenIdHttpClient for DefaultHttpClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, String> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(10))
            .build()
            .map_err(|e| format!("{e}"))?;

        let method = match req.method {
            HttpMethod::GET => Method::GET,
            HttpMethod::POST => Method::POST,
        };

        let mut req_builder = client.request(method, req.url);

        if let Some(body) = req.body {
            req_builder = req_builder.body(body);
        }

        for (name, values) in req.headers {
            for value in values {
                req_builder = req_builder.header(name.clone(), value);
            }
        }

        req_builder = req_builder.header("User-Agent", "openid-consumer");

        match req_builder.send().await {
            Ok(res) => Ok(Self::to_response(res).await),
            Err(e) => Err(format!("{e}")),
        }
    }
}
