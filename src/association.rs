//! # Association
//! Shared secret negotiated with an OpenID provider and used to check signed responses.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::helpers::{kv_form_to_pairs, now, pairs_to_kv_form};
use crate::message::Message;
use crate::types::{OpenIdError, OpenIdReturnType};

type HmacSha256 = Hmac<Sha256>;

/// Association type this consumer can sign with
pub const HMAC_SHA256: &str = "HMAC-SHA256";
/// Association type of OpenID 1.x providers
pub const HMAC_SHA1: &str = "HMAC-SHA1";

const SERIALIZATION_VERSION: &str = "2";

/// A provider association
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// Provider issued handle, unique per server url
    pub handle: String,
    /// The shared MAC key
    pub secret: Vec<u8>,
    /// Unix timestamp of issuance
    pub issued: i64,
    /// Lifetime in seconds counted from `issued`
    pub lifetime: i64,
    /// Signature algorithm, `HMAC-SHA256` or `HMAC-SHA1`
    pub assoc_type: String,
}

impl Association {
    /// Association issued now that lives `expires_in` seconds
    pub fn from_expires_in(
        expires_in: i64,
        handle: impl Into<String>,
        secret: Vec<u8>,
        assoc_type: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            secret,
            issued: now(),
            lifetime: expires_in,
            assoc_type: assoc_type.into(),
        }
    }

    /// Seconds left at `now`, never below zero
    pub fn expires_in_at(&self, now: i64) -> i64 {
        (self.issued + self.lifetime - now).max(0)
    }

    /// Seconds left from the current time
    pub fn expires_in(&self) -> i64 {
        self.expires_in_at(now())
    }

    /// Key-value form persisted in the transaction
    pub fn serialize(&self) -> OpenIdReturnType<String> {
        pairs_to_kv_form(&[
            ("version".to_string(), SERIALIZATION_VERSION.to_string()),
            ("handle".to_string(), self.handle.clone()),
            ("secret".to_string(), STANDARD.encode(&self.secret)),
            ("issued".to_string(), self.issued.to_string()),
            ("lifetime".to_string(), self.lifetime.to_string()),
            ("assoc_type".to_string(), self.assoc_type.clone()),
        ])
    }

    /// Reads back the output of [Association::serialize]
    pub fn deserialize(serialized: &str) -> OpenIdReturnType<Self> {
        let pairs = kv_form_to_pairs(serialized);

        let field = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| {
                    OpenIdError::new_type_error(format!("serialized association lacks {name}"))
                })
        };

        if field("version")? != SERIALIZATION_VERSION {
            return Err(OpenIdError::new_type_error(
                "unknown association serialization version",
            ));
        }

        let secret = STANDARD
            .decode(field("secret")?)
            .map_err(|_| OpenIdError::new_type_error("association secret is not base64"))?;

        let number = |name: &str| -> OpenIdReturnType<i64> {
            field(name)?.parse().map_err(|_| {
                OpenIdError::new_type_error(format!("association {name} is not a number"))
            })
        };

        Ok(Self {
            handle: field("handle")?.to_string(),
            secret,
            issued: number("issued")?,
            lifetime: number("lifetime")?,
            assoc_type: field("assoc_type")?.to_string(),
        })
    }

    /// Signature over the signed fields of `message`, in the order they are listed
    pub fn sign(&self, message: &Message) -> OpenIdReturnType<Vec<u8>> {
        if self.assoc_type != HMAC_SHA256 {
            return Err(OpenIdError::new_protocol_error(format!(
                "cannot sign with association type {}",
                self.assoc_type
            )));
        }

        let mut pairs = vec![];
        for field in message.signed_fields() {
            let value = message.get(&field).ok_or_else(|| {
                OpenIdError::new_protocol_error(format!("signed field {field:?} is missing"))
            })?;
            pairs.push((field, value.to_string()));
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| OpenIdError::new_protocol_error(format!("invalid MAC key: {e}")))?;
        mac.update(pairs_to_kv_form(&pairs)?.as_bytes());

        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Checks `openid.sig` of a positive assertion against this association
    pub fn check_message_signature(&self, message: &Message) -> OpenIdReturnType<bool> {
        let sig = message
            .get("sig")
            .ok_or_else(|| OpenIdError::new_protocol_error("message has no signature"))?;

        let expected = STANDARD
            .decode(sig)
            .map_err(|_| OpenIdError::new_protocol_error("signature is not base64"))?;

        Ok(self.sign(message)?.ct_eq(&expected).into())
    }
}
