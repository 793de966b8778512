//! # Stores
//! Where the consumer keeps associations, nonces and the discovered endpoint.

mod session_store;
mod state_store;

use crate::association::Association;
use crate::types::OpenIdReturnType;

pub use session_store::{SessionStore, SESSION_NAMESPACE};
pub use state_store::StateStore;

/// # OpenIdStore
/// Association and nonce storage used while verifying assertions
pub trait OpenIdStore {
    /// Association of `server_url` with `handle`, or its most recently issued one.
    /// Expired associations are never returned.
    fn get_association(&self, server_url: &str, handle: Option<&str>) -> Option<Association>;

    /// Stores `association` for `server_url`, replacing one with the same handle
    fn store_association(
        &mut self,
        server_url: &str,
        association: &Association,
    ) -> OpenIdReturnType<()>;

    /// Whether the nonce may be used. A nonce must not be accepted twice.
    fn accept_nonce(&mut self, server_url: &str, timestamp: i64, salt: &str) -> bool;
}

/// # ConsumerSession
/// Per browser storage for the endpoint a request was sent to
pub trait ConsumerSession {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`
    fn set(&self, key: &str, value: String);

    /// Removes `key`
    fn del(&self, key: &str);
}
