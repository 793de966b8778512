use base64::{engine::general_purpose::STANDARD, Engine};

use crate::association::{Association, HMAC_SHA256};
use crate::consumer::LAST_ENDPOINT_KEY;
use crate::discovery::{ServiceEndpoint, OPENID_2_0_TYPE};
use crate::helpers::{append_query_args, make_nonce, now};
use crate::message::{Message, OPENID2_NS};
use crate::source::HostSession;
use crate::store::SESSION_NAMESPACE;

use super::test_host::HOST_URL;

pub const CLAIMED_ID: &str = "https://user.example.com/";
pub const LOCAL_ID: &str = "https://user.op.example.com/";
pub const SERVER_URL: &str = "https://op.example.com/server";
pub const ASSOC_HANDLE: &str = "handle-1";
pub const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

pub fn openid2_endpoint() -> ServiceEndpoint {
    ServiceEndpoint {
        claimed_id: Some(CLAIMED_ID.to_string()),
        server_url: SERVER_URL.to_string(),
        type_uris: vec![OPENID_2_0_TYPE.to_string()],
        local_id: Some(LOCAL_ID.to_string()),
        canonical_id: None,
        used_yadis: false,
    }
}

pub fn association(handle: &str, issued_ago: i64, lifetime: i64) -> Association {
    Association {
        handle: handle.to_string(),
        secret: SECRET.to_vec(),
        issued: now() - issued_ago,
        lifetime,
        assoc_type: HMAC_SHA256.to_string(),
    }
}

pub fn html_page(server_url: &str) -> String {
    format!(
        r#"<html><head>
<link rel="openid2.provider" href="{server_url}" />
<link rel="openid2.local_id" href="{LOCAL_ID}" />
</head><body>user</body></html>"#
    )
}

pub fn associate_response(handle: &str) -> String {
    format!(
        "ns:{OPENID2_NS}\nassoc_handle:{handle}\nassoc_type:HMAC-SHA256\nsession_type:no-encryption\nexpires_in:3600\nmac_key:{}\n",
        STANDARD.encode(SECRET)
    )
}

pub fn linkback_url(state_id: &str) -> String {
    format!("{HOST_URL}/module.php/openid/linkback.php?AuthState={state_id}")
}

pub fn remember_endpoint(host: &impl HostSession, endpoint: &ServiceEndpoint) {
    host.set_data(
        SESSION_NAMESPACE,
        LAST_ENDPOINT_KEY,
        serde_json::to_string(endpoint).unwrap(),
    );
}

/// Positive assertion for `return_to` signed with `association`. Every field is signed.
pub fn signed_assertion(
    return_to: &str,
    association: &Association,
    extra: &[(&str, &str)],
) -> Message {
    let mut message = Message::new(OPENID2_NS);
    message.set("mode", "id_res");
    message.set("op_endpoint", SERVER_URL);
    message.set("claimed_id", CLAIMED_ID);
    message.set("identity", LOCAL_ID);
    message.set("return_to", return_to);
    message.set("response_nonce", make_nonce(now()));
    message.set("assoc_handle", association.handle.clone());

    for (key, value) in extra {
        message.set(*key, *value);
    }

    sign(&mut message, association);

    message
}

/// (Re)signs every field of `message`
pub fn sign(message: &mut Message, association: &Association) {
    message.remove("sig");
    message.remove("signed");

    let signed: Vec<String> = message
        .to_post_args()
        .into_iter()
        .map(|(k, _)| k.trim_start_matches("openid.").to_string())
        .collect();

    message.set("signed", signed.join(","));

    let sig = STANDARD.encode(association.sign(message).unwrap());
    message.set("sig", sig);
}

/// Url the browser comes back to with `message`, and its parameters
pub fn callback(return_to: &str, message: &Message) -> (String, Vec<(String, String)>) {
    let url = append_query_args(return_to, &message.to_post_args()).unwrap();

    let params = url::Url::parse(&url)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    (url, params)
}
