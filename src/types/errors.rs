use std::convert::Infallible;

use thiserror::Error;

use super::host_response::HostResponse;

/// # OpenIdError
/// Error that will be returned to the host framework or the user of this library
#[derive(Debug, Error)]
pub enum OpenIdError {
    /// The request coming from the browser is unusable (missing or bad state id, invalid identifier)
    #[error("{0}")]
    BadRequest(String),
    /// Failure scoped to a configured authentication source
    #[error("Error with authentication source '{auth_id}': {reason}")]
    AuthSource {
        /// Id of the authentication source that failed
        auth_id: String,
        /// Human readable reason
        reason: String,
        /// Underlying error, if any
        #[source]
        cause: Option<Box<OpenIdError>>,
    },
    /// The user cancelled the authentication at the provider
    #[error("User aborted authentication.")]
    UserAborted,
    /// The identifier could not be resolved to an OpenID endpoint
    #[error("discovery error: {0}")]
    Discovery(String),
    /// Unexpected data from the OpenID provider
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The http client failed to complete a request
    #[error("http error: {0}")]
    Http(String),
    /// Invalid argument passed to the library
    #[error("type error: {0}")]
    TypeError(String),
    /// Invalid authentication source configuration
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The host state layer could not save or load a transaction
    #[error("state error: {0}")]
    State(String),
}

impl OpenIdError {
    /// Creates a [OpenIdError::BadRequest]
    pub fn new_bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Creates a [OpenIdError::AuthSource] without a cause
    pub fn new_auth_source(auth_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AuthSource {
            auth_id: auth_id.into(),
            reason: reason.into(),
            cause: None,
        }
    }

    /// Creates a [OpenIdError::AuthSource] wrapping `cause`
    pub fn new_auth_source_with_cause(
        auth_id: impl Into<String>,
        reason: impl Into<String>,
        cause: OpenIdError,
    ) -> Self {
        Self::AuthSource {
            auth_id: auth_id.into(),
            reason: reason.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a [OpenIdError::Discovery]
    pub fn new_discovery_error(message: impl Into<String>) -> Self {
        Self::Discovery(message.into())
    }

    /// Creates a [OpenIdError::Protocol]
    pub fn new_protocol_error(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Creates a [OpenIdError::Http]
    pub fn new_http_error(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    /// Creates a [OpenIdError::TypeError]
    pub fn new_type_error(message: impl Into<String>) -> Self {
        Self::TypeError(message.into())
    }

    /// Creates a [OpenIdError::Config]
    pub fn new_config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a [OpenIdError::State]
    pub fn new_state_error(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Errors the host knows how to present on its own error page.
    /// Everything else needs context before it leaves the callback endpoint.
    pub fn is_host_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest(_) | Self::AuthSource { .. } | Self::UserAborted
        )
    }
}

/// Return type used by the fallible operations of this crate
pub type OpenIdReturnType<T> = Result<T, OpenIdError>;

/// # Interrupt
/// Way out of an engine phase. A phase never returns normally: either the host
/// took over the browser (redirect, rendered page, completed login) or it failed.
#[derive(Debug)]
pub enum Interrupt {
    /// Control was handed to the browser through the host
    Halt(HostResponse),
    /// The phase failed
    Error(OpenIdError),
}

impl From<OpenIdError> for Interrupt {
    fn from(error: OpenIdError) -> Self {
        Self::Error(error)
    }
}

/// Result of a phase that only ever leaves through an [Interrupt]
pub type Diverges = Result<Infallible, Interrupt>;
