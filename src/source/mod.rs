//! # Authentication source
//! The OpenID consumer bound to the identity provider framework hosting it.

mod config;
mod host;
mod openid_consumer;
mod registry;
mod transaction;

use std::future::Future;

use crate::types::Diverges;

pub use config::ConsumerConfig;
pub use host::{Host, HostSession, StatePersistence};
pub use openid_consumer::{
    run_phase, OpenIdConsumer, CONSUMER_RESOURCE, FORM_ID, LINKBACK_RESOURCE,
    REDIRECT_URL_MAX_LENGTH,
};
pub use registry::SourceRegistry;
pub use transaction::{Transaction, AUTH_STAGE, INIT_STAGE};

/// # AuthSource
/// A way of authenticating users that the host can start a login with
pub trait AuthSource {
    /// Id the source is configured under
    fn auth_id(&self) -> &str;

    /// Starts authenticating the user of `state`. Never returns normally, the login goes
    /// on in the browser or fails.
    fn authenticate<H: Host + ?Sized>(
        &self,
        state: &mut Transaction,
        host: &H,
    ) -> impl Future<Output = Diverges>;
}
