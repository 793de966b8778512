//! # Types Module
//! Errors, http contracts and the attribute set handed to the host

use std::collections::BTreeMap;

mod errors;
mod host_response;
pub mod http_client;

pub use errors::{Diverges, Interrupt, OpenIdError, OpenIdReturnType};
pub use host_response::HostResponse;
pub use http_client::{HttpMethod, HttpRequest, HttpResponse, OpenIdHttpClient};

/// Attributes released to the host after a successful login.
/// Every attribute is multi valued.
pub type Attributes = BTreeMap<String, Vec<String>>;
