#![warn(missing_docs)]
//! # OpenID Consumer
//!
//! OpenID 2.0 and 1.x relying party meant to run as an authentication source inside an
//! identity provider framework. The framework is reached through the [source::Host] traits:
//! it persists the login transaction, owns the browser session and takes over once
//! attributes are collected.
//!
//! ## Authentication source
//! - [source::OpenIdConsumer::new]
//! - [source::AuthSource::authenticate]
//! - [source::OpenIdConsumer::do_auth]
//! - [source::OpenIdConsumer::post_auth]
//! - [source::SourceRegistry::from_config]
//!
//! ## Endpoints
//! - [www::consumer_endpoint]
//! - [www::linkback_endpoint]
//!
//! ## Protocol
//! - [discovery::discover_async]
//! - [consumer::Consumer::begin_async]
//! - [consumer::Consumer::complete_async]
//! - [consumer::AuthRequest::redirect_url]
//! - [consumer::AuthRequest::form_markup]
//!
//! ## Stores
//! - [store::StateStore]
//! - [store::SessionStore]

pub mod association;
pub mod consumer;
pub mod discovery;
pub mod extensions;
mod helpers;
#[cfg(feature = "http_client")]
pub mod http_client;
pub mod message;
pub mod source;
pub mod store;
#[cfg(test)]
mod tests;
pub mod types;
pub mod www;

pub use helpers::{generate_random, make_nonce, now, split_nonce};

/// Re exports from the crate
pub mod re_exports {
    pub use serde_json::{self, json, Value};
    pub use url;
}
