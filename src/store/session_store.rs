use crate::source::HostSession;

use super::ConsumerSession;

/// Host session namespace holding the consumer data
pub const SESSION_NAMESPACE: &str = "openid.session";

/// # SessionStore
/// [ConsumerSession] backed by the host session
pub struct SessionStore<'a, H: HostSession + ?Sized> {
    host: &'a H,
}

impl<'a, H: HostSession + ?Sized> SessionStore<'a, H> {
    /// Creates a store over the session of `host`
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }
}

impl<H: HostSession + ?Sized> ConsumerSession for SessionStore<'_, H> {
    fn get(&self, key: &str) -> Option<String> {
        self.host.get_data(SESSION_NAMESPACE, key)
    }

    fn set(&self, key: &str, value: String) {
        self.host.set_data(SESSION_NAMESPACE, key, value)
    }

    fn del(&self, key: &str) {
        self.host.delete_data(SESSION_NAMESPACE, key)
    }
}
