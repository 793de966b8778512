//! # Consumer
//! Relying party side of the OpenID protocol: building authentication requests and
//! verifying the assertions that come back.

mod auth_request;
#[allow(clippy::module_inception)]
mod consumer;
mod realm;
mod response;

pub use auth_request::AuthRequest;
pub use consumer::{
    Consumer, LAST_ENDPOINT_KEY, NONCE_SKEW, OPENID1_CLAIMED_ID_ARG, RP_NONCE_ARG,
};
pub use realm::Realm;
pub use response::{ConsumerResponse, SuccessResponse};
