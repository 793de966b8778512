//! # Http Client Interface for Custom Http Clients

use std::collections::HashMap;
use std::fmt::Debug;

use url::Url;

use crate::helpers::string_map_to_form_url_encoded;

/// The Http methods the OpenID consumer needs
#[derive(Debug, Default, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub enum HttpMethod {
    /// Used for discovery (identifier page, XRDS document).
    #[default]
    GET,
    /// Used for association and direct verification.
    POST,
}

/// # HttpRequest
/// Request built by the discovery and association steps.
#[derive(Debug)]
pub struct HttpRequest {
    /// Url of the request
    pub url: Url,
    /// Http method of the request
    pub method: HttpMethod,
    /// Headers that are sent in the request
    pub headers: HashMap<String, Vec<String>>,
    /// The request body to be sent
    pub body: Option<String>,
}

impl HttpRequest {
    pub(crate) fn new(url: Url) -> Self {
        Self {
            url,
            headers: HashMap::new(),
            method: HttpMethod::GET,
            body: None,
        }
    }

    pub(crate) fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();

        if let Some(values) = self.headers.get_mut(&name) {
            values.push(value);
        } else {
            self.headers.insert(name, vec![value]);
        }
        self
    }

    pub(crate) fn form(mut self, form: &[(String, String)]) -> Self {
        let form_body = string_map_to_form_url_encoded(form);
        self.headers.insert(
            "content-type".to_string(),
            vec!["application/x-www-form-urlencoded".to_string()],
        );
        self.method = HttpMethod::POST;
        self.body(form_body)
    }

    pub(crate) fn body(mut self, body: String) -> Self {
        self.headers.insert(
            "content-length".to_string(),
            vec![body.len().to_string()],
        );
        self.body = Some(body);
        self
    }
}

/// Represents an HTTP response received from a server.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// The HTTP status code of the response (e.g., 200 for success, 404 for Not Found).
    pub status_code: u16,
    /// The content type header
    pub content_type: Option<String>,
    /// The Yadis `X-XRDS-Location` header
    pub xrds_location: Option<String>,
    /// Url the response was served from after following redirects
    pub final_url: Option<String>,
    /// The optional body content of the response. None if there is no body content (String).
    pub body: Option<String>,
}

/// This trait defines the interface for making HTTP requests used by the OpenID consumer.
/// Users who need custom HTTP clients need to implement this trait.
pub trait OpenIdHttpClient {
    /// Makes an HTTP request using the provided HttpRequest object.
    ///
    ///  * On success, the result is `Ok(HttpResponse)` containing the HTTP response.
    ///  * On error, the result is `Err(String)` with an error message describing the failure.
    ///
    /// Non 2xx statuses are not errors at this level, the caller inspects `status_code`.
    fn request(
        &self,
        req: HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, String>> + Send;
}
