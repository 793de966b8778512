use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime};
use rand::Rng;

use crate::types::{OpenIdError, OpenIdReturnType};

/// Format of the timestamp part of an OpenID nonce
const NONCE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Gets a Unix Timestamp in seconds. Uses [`SystemTime::now`]
pub fn now() -> i64 {
    let start = SystemTime::now();
    start
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Generates a random string using [rand::thread_rng]. You can pass in the bytes to generates
pub fn generate_random(bytes_to_generate: Option<u32>) -> String {
    let mut random_bytes = vec![];

    for _ in 0..bytes_to_generate.unwrap_or(32) {
        random_bytes.push(rand::thread_rng().gen());
    }

    base64_url::encode(&random_bytes)
}

/// Creates an OpenID style nonce: an UTC timestamp followed by a random salt.
pub fn make_nonce(timestamp: i64) -> String {
    let time = DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format(NONCE_TIME_FORMAT);

    format!("{time}{}", generate_random(Some(6)))
}

/// Splits an OpenID nonce into its unix timestamp and salt
pub fn split_nonce(nonce: &str) -> OpenIdReturnType<(i64, String)> {
    // the timestamp part is always 20 characters long
    let (time, salt) = nonce
        .get(..20)
        .zip(nonce.get(20..))
        .ok_or_else(|| OpenIdError::new_protocol_error(format!("malformed nonce: {nonce:?}")))?;

    let timestamp = NaiveDateTime::parse_from_str(time, NONCE_TIME_FORMAT)
        .map_err(|_| OpenIdError::new_protocol_error(format!("malformed nonce: {nonce:?}")))?
        .and_utc()
        .timestamp();

    Ok((timestamp, salt.to_string()))
}

/// Encodes pairs in the OpenID key-value form (`key:value\n` per pair)
pub fn pairs_to_kv_form(pairs: &[(String, String)]) -> OpenIdReturnType<String> {
    let mut kv = String::new();

    for (key, value) in pairs {
        if key.contains(':') || key.contains('\n') || value.contains('\n') {
            return Err(OpenIdError::new_type_error(format!(
                "cannot encode {key:?} in key-value form"
            )));
        }
        kv.push_str(key);
        kv.push(':');
        kv.push_str(value);
        kv.push('\n');
    }

    Ok(kv)
}

/// Decodes the OpenID key-value form. Lines without a colon are ignored.
pub fn kv_form_to_pairs(kv: &str) -> Vec<(String, String)> {
    kv.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}
