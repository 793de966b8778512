use url::Url;

use crate::helpers::{append_query_args, query_pairs};
use crate::types::{HostResponse, Interrupt, OpenIdError, OpenIdReturnType};

use super::transaction::Transaction;

/// # StatePersistence
/// Persists transactions between the requests of a login.
pub trait StatePersistence {
    /// Saves `state` under `stage` and returns its id.
    ///
    /// Saving a transaction that was saved before must reuse its id, the host keeps
    /// that id in the transport fields of the transaction.
    fn save_state(&self, state: &mut Transaction, stage: &str) -> OpenIdReturnType<String>;

    /// Loads the transaction saved under `id`, failing when it was saved under another stage
    fn load_state(&self, id: &str, stage: &str) -> OpenIdReturnType<Transaction>;

    /// Hands `error` to the error handling registered for the login
    fn throw_exception(&self, state: &Transaction, error: OpenIdError) -> HostResponse;
}

/// # HostSession
/// Namespaced storage attached to the browser session.
pub trait HostSession {
    /// Value stored under `namespace` and `key`
    fn get_data(&self, namespace: &str, key: &str) -> Option<String>;

    /// Stores `value` under `namespace` and `key`
    fn set_data(&self, namespace: &str, key: &str, value: String);

    /// Removes `key` from `namespace`
    fn delete_data(&self, namespace: &str, key: &str);
}

/// # Host
/// What the identity provider framework running the consumer offers to it.
///
/// The transfer of control primitives (`redirect_trusted_url`, `render`, `complete_auth`)
/// return the [Interrupt] that ends the current phase.
pub trait Host: StatePersistence + HostSession {
    /// Url of the current request
    fn self_url(&self) -> String;

    /// Scheme, host and port of the current request
    fn self_url_host(&self) -> String;

    /// Parameters of the current request
    fn request_params(&self) -> Vec<(String, String)> {
        Url::parse(&self.self_url())
            .map(|url| query_pairs(&url))
            .unwrap_or_default()
    }

    /// Url of a module resource such as `openid/linkback.php`
    fn module_url(&self, resource: &str, params: &[(String, String)]) -> OpenIdReturnType<String>;

    /// Sends the browser to `url` with `params` appended
    fn redirect_trusted_url(&self, url: &str, params: &[(String, String)]) -> Interrupt {
        match append_query_args(url, params) {
            Ok(location) => Interrupt::Halt(HostResponse::Redirect(location)),
            Err(e) => Interrupt::Error(e),
        }
    }

    /// Sends `html` to the browser
    fn render(&self, html: String) -> Interrupt {
        Interrupt::Halt(HostResponse::page(html))
    }

    /// Resumes the login of `state` once attributes were collected
    fn complete_auth(&self, state: &mut Transaction) -> Interrupt;
}
