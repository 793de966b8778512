use std::collections::BTreeMap;

use crate::discovery::ServiceEndpoint;
use crate::message::Message;

/// # SuccessResponse
/// A verified positive assertion
#[derive(Debug, Clone)]
pub struct SuccessResponse {
    /// Endpoint that asserted the identity
    pub endpoint: ServiceEndpoint,
    /// The verified claimed identifier
    pub identity_url: String,
    /// The assertion as received
    pub message: Message,
    /// Signed fields, with the `openid.` prefix
    pub signed_fields: Vec<String>,
}

impl SuccessResponse {
    /// Arguments of the `ns_uri` extension.
    ///
    /// With `require_signed` the arguments are only returned when all of them are signed.
    pub fn extension_response(
        &self,
        ns_uri: &str,
        require_signed: bool,
    ) -> Option<BTreeMap<String, String>> {
        if require_signed {
            return self.message.get_signed_args(ns_uri);
        }

        Some(self.message.get_args(ns_uri))
    }

    /// Canonical id of an XRI identifier, when discovery found one
    pub fn canonical_id(&self) -> Option<&str> {
        self.endpoint.canonical_id.as_deref()
    }
}

/// # ConsumerResponse
/// Outcome of [super::Consumer::complete_async]
#[derive(Debug, Clone)]
pub enum ConsumerResponse {
    /// The provider asserted the identity and the assertion checked out
    Success(Box<SuccessResponse>),
    /// The assertion was negative or could not be verified
    Failure {
        /// Endpoint the request went to, if known
        endpoint: Option<ServiceEndpoint>,
        /// What went wrong
        message: Option<String>,
    },
    /// The user cancelled at the provider
    Cancel {
        /// Endpoint the request went to, if known
        endpoint: Option<ServiceEndpoint>,
    },
    /// The provider needs user interaction that `checkid_immediate` could not get
    SetupNeeded {
        /// Endpoint the request went to, if known
        endpoint: Option<ServiceEndpoint>,
        /// Where the user can finish setting up, OpenID 1.x only
        setup_url: Option<String>,
    },
}

impl ConsumerResponse {
    pub(crate) fn failure(endpoint: Option<ServiceEndpoint>, message: impl Into<String>) -> Self {
        Self::Failure {
            endpoint,
            message: Some(message.into()),
        }
    }

    /// Short name of the outcome
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure { .. } => "failure",
            Self::Cancel { .. } => "cancel",
            Self::SetupNeeded { .. } => "setup_needed",
        }
    }
}
