use crate::consumer::{Consumer, ConsumerResponse, LAST_ENDPOINT_KEY, OPENID1_CLAIMED_ID_ARG, RP_NONCE_ARG};
use crate::discovery::{ServiceEndpoint, OPENID_1_1_TYPE};
use crate::helpers::{make_nonce, now};
use crate::source::{HostSession, Transaction, AUTH_STAGE};
use crate::store::{OpenIdStore, SessionStore, StateStore, SESSION_NAMESPACE};
use crate::types::HttpMethod;

use crate::tests::fixtures::*;
use crate::tests::test_host::MemoryHost;
use crate::tests::test_http_client::{TestHttpClient, TestHttpReqRes};

async fn complete(
    host: &MemoryHost,
    state: &mut Transaction,
    http_client: &TestHttpClient,
    url: &str,
    params: &[(String, String)],
) -> ConsumerResponse {
    let session = SessionStore::new(host);
    let mut store = StateStore::new(state, host);
    let mut consumer = Consumer::new(&mut store, &session, http_client);

    consumer.complete_async(params, url).await.unwrap()
}

fn failure_message(response: &ConsumerResponse) -> String {
    match response {
        ConsumerResponse::Failure { message, .. } => message.clone().unwrap_or_default(),
        other => panic!("expected a failure, got {}", other.status()),
    }
}

#[cfg(test)]
mod begin {
    use super::*;

    #[tokio::test]
    async fn associates_with_https_openid2_providers() {
        let http_client = TestHttpReqRes::new(CLAIMED_ID)
            .assert_request_method(HttpMethod::GET)
            .set_response_body(html_page(SERVER_URL))
            .set_response_content_type_header("text/html")
            .build()
            .add(
                TestHttpReqRes::new(SERVER_URL)
                    .assert_request_method(HttpMethod::POST)
                    .assert_request_form_param("openid.mode", "associate")
                    .assert_request_form_param("openid.assoc_type", "HMAC-SHA256")
                    .assert_request_form_param("openid.session_type", "no-encryption")
                    .set_response_body(associate_response("fresh")),
            );

        let host = MemoryHost::new();
        let mut state = Transaction::default();

        let request = {
            let session = SessionStore::new(&host);
            let mut store = StateStore::new(&mut state, &host);
            let mut consumer = Consumer::new(&mut store, &session, &http_client);
            consumer.begin_async(CLAIMED_ID).await.unwrap()
        };

        http_client.assert();

        assert_eq!("fresh", request.association.unwrap().handle);
        assert!(state.associations[SERVER_URL].contains_key("fresh"));
        assert_eq!(
            vec![("state-1".to_string(), AUTH_STAGE.to_string())],
            *host.saves.borrow()
        );
        assert!(host.get_data(SESSION_NAMESPACE, LAST_ENDPOINT_KEY).is_some());
    }

    #[tokio::test]
    async fn reuses_a_stored_association() {
        let http_client = TestHttpClient::new();
        let host = MemoryHost::new();
        let mut state = Transaction::default();

        let request = {
            let session = SessionStore::new(&host);
            let mut store = StateStore::new(&mut state, &host);
            store
                .store_association(SERVER_URL, &association("stored", 0, 3600))
                .unwrap();
            let mut consumer = Consumer::new(&mut store, &session, &http_client);
            consumer
                .begin_without_discovery_async(openid2_endpoint())
                .await
                .unwrap()
        };

        assert_eq!("stored", request.association.unwrap().handle);
    }

    #[tokio::test]
    async fn falls_back_to_stateless_mode_when_association_fails() {
        let http_client = TestHttpReqRes::new(SERVER_URL)
            .assert_request_method(HttpMethod::POST)
            .set_response_status_code(400)
            .set_response_body("error:unsupported type\nerror_code:unsupported-type\n")
            .build();

        let host = MemoryHost::new();
        let mut state = Transaction::default();

        let request = {
            let session = SessionStore::new(&host);
            let mut store = StateStore::new(&mut state, &host);
            let mut consumer = Consumer::new(&mut store, &session, &http_client);
            consumer
                .begin_without_discovery_async(openid2_endpoint())
                .await
                .unwrap()
        };

        http_client.assert();

        assert_eq!(None, request.association);
        assert!(state.associations.is_empty());
        assert!(host.saves.borrow().is_empty());
    }

    #[tokio::test]
    async fn openid1_requests_carry_nonce_and_claimed_id_in_return_to() {
        let http_client = TestHttpClient::new();
        let host = MemoryHost::new();
        let mut state = Transaction::default();

        let endpoint = ServiceEndpoint {
            type_uris: vec![OPENID_1_1_TYPE.to_string()],
            ..openid2_endpoint()
        };

        let request = {
            let session = SessionStore::new(&host);
            let mut store = StateStore::new(&mut state, &host);
            let mut consumer = Consumer::new(&mut store, &session, &http_client);
            consumer.begin_without_discovery_async(endpoint).await.unwrap()
        };

        let names: Vec<&str> = request
            .return_to_args
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();

        assert_eq!(vec![RP_NONCE_ARG, OPENID1_CLAIMED_ID_ARG], names);
        assert_eq!(None, request.association);
        assert!(request.should_send_redirect());
    }

    #[tokio::test]
    async fn identifiers_without_services_cannot_begin() {
        let http_client = TestHttpReqRes::new(CLAIMED_ID)
            .set_response_body("<html><body>no openid here</body></html>")
            .set_response_content_type_header("text/html")
            .build();

        let host = MemoryHost::new();
        let mut state = Transaction::default();

        let session = SessionStore::new(&host);
        let mut store = StateStore::new(&mut state, &host);
        let mut consumer = Consumer::new(&mut store, &session, &http_client);

        assert!(consumer.begin_async(CLAIMED_ID).await.is_err());
    }
}

#[cfg(test)]
mod complete {
    use super::*;

    fn prepared() -> (MemoryHost, Transaction) {
        let host = MemoryHost::new();
        remember_endpoint(&host, &openid2_endpoint());

        let mut state = Transaction::default();
        let assoc = association(ASSOC_HANDLE, 0, 3600);
        state
            .associations
            .entry(SERVER_URL.to_string())
            .or_default()
            .insert(ASSOC_HANDLE.to_string(), assoc.serialize().unwrap());

        (host, state)
    }

    #[tokio::test]
    async fn accepts_an_assertion_signed_with_the_stored_association() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let return_to = linkback_url("state-1");
        let message = signed_assertion(&return_to, &association(ASSOC_HANDLE, 0, 3600), &[]);
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        let ConsumerResponse::Success(success) = response else {
            panic!("expected success");
        };

        assert_eq!(CLAIMED_ID, success.identity_url);
        assert_eq!(SERVER_URL, success.endpoint.server_url);
        assert!(success.signed_fields.contains(&"openid.return_to".to_string()));
        assert_eq!(None, host.get_data(SESSION_NAMESPACE, LAST_ENDPOINT_KEY));
    }

    #[tokio::test]
    async fn rejects_a_tampered_assertion() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let return_to = linkback_url("state-1");
        let mut message = signed_assertion(
            &return_to,
            &association(ASSOC_HANDLE, 0, 3600),
            &[("ns.sreg", "http://openid.net/extensions/sreg/1.1"), ("sreg.email", "a@example.com")],
        );
        message.set("sreg.email", "mallory@example.com");
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert_eq!("protocol error: Bad signature", failure_message(&response));
    }

    #[tokio::test]
    async fn asks_the_provider_when_the_association_is_unknown() {
        let (host, _) = prepared();
        let mut state = Transaction::default();

        let http_client = TestHttpReqRes::new(SERVER_URL)
            .assert_request_method(HttpMethod::POST)
            .assert_request_form_param("openid.mode", "check_authentication")
            .assert_request_form_param("openid.assoc_handle", "unknown")
            .set_response_body("is_valid:true\n")
            .build();

        let return_to = linkback_url("state-1");
        let message = signed_assertion(&return_to, &association("unknown", 0, 3600), &[]);
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        http_client.assert();
        assert_eq!("success", response.status());
    }

    #[tokio::test]
    async fn fails_when_the_provider_denies_the_assertion() {
        let (host, _) = prepared();
        let mut state = Transaction::default();

        let http_client = TestHttpReqRes::new(SERVER_URL)
            .assert_request_method(HttpMethod::POST)
            .set_response_body("is_valid:false\n")
            .build();

        let return_to = linkback_url("state-1");
        let message = signed_assertion(&return_to, &association("unknown", 0, 3600), &[]);
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert!(failure_message(&response).contains("check_authentication"));
    }

    #[tokio::test]
    async fn assertion_for_another_url_fails() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let message = signed_assertion(
            &linkback_url("state-1"),
            &association(ASSOC_HANDLE, 0, 3600),
            &[],
        );
        let (url, params) = callback("https://idp.example.com/elsewhere?AuthState=state-1", &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert!(failure_message(&response).contains("does not match the current url"));
    }

    #[tokio::test]
    async fn return_to_arguments_must_be_in_the_request() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let message = signed_assertion(
            &linkback_url("state-1"),
            &association(ASSOC_HANDLE, 0, 3600),
            &[],
        );
        let (url, params) = callback(&linkback_url("state-2"), &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert!(failure_message(&response).contains("AuthState"));
    }

    #[tokio::test]
    async fn stale_nonce_fails() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let return_to = linkback_url("state-1");
        let stale = make_nonce(now() - 6 * 60 * 60);
        let message = signed_assertion(
            &return_to,
            &association(ASSOC_HANDLE, 0, 3600),
            &[("response_nonce", stale.as_str())],
        );
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert!(failure_message(&response).contains("Nonce"));
    }

    #[tokio::test]
    async fn unsigned_required_fields_fail() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let return_to = linkback_url("state-1");
        let mut message =
            signed_assertion(&return_to, &association(ASSOC_HANDLE, 0, 3600), &[]);
        message.set("signed", "return_to,assoc_handle");
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert!(failure_message(&response).contains("not signed"));
    }

    #[tokio::test]
    async fn rediscovers_when_the_session_endpoint_is_gone() {
        let (host, mut state) = prepared();
        host.session.borrow_mut().clear();

        let http_client = TestHttpReqRes::new(CLAIMED_ID)
            .assert_request_method(HttpMethod::GET)
            .set_response_body(html_page(SERVER_URL))
            .set_response_content_type_header("text/html")
            .build();

        let return_to = linkback_url("state-1");
        let message = signed_assertion(&return_to, &association(ASSOC_HANDLE, 0, 3600), &[]);
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        http_client.assert();
        assert_eq!("success", response.status());
    }

    #[tokio::test]
    async fn rediscovery_must_find_the_asserting_provider() {
        let (host, mut state) = prepared();
        host.session.borrow_mut().clear();

        let http_client = TestHttpReqRes::new(CLAIMED_ID)
            .set_response_body(html_page("https://other-op.example.com/server"))
            .set_response_content_type_header("text/html")
            .build();

        let return_to = linkback_url("state-1");
        let message = signed_assertion(&return_to, &association(ASSOC_HANDLE, 0, 3600), &[]);
        let (url, params) = callback(&return_to, &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert!(failure_message(&response).contains("no matching endpoint"));
    }

    #[tokio::test]
    async fn negative_modes() {
        let http_client = TestHttpClient::new();
        let return_to = linkback_url("state-1");

        let cases = [
            ("cancel", "cancel"),
            ("error", "failure"),
            ("setup_needed", "setup_needed"),
            ("checkid_setup", "failure"),
        ];

        for (mode, status) in cases {
            let (host, mut state) = prepared();

            let mut message = crate::message::Message::new(crate::message::OPENID2_NS);
            message.set("mode", mode);
            message.set("error", "provider says no");
            let (url, params) = callback(&return_to, &message);

            let response = complete(&host, &mut state, &http_client, &url, &params).await;

            assert_eq!(status, response.status(), "mode {mode}");
        }
    }

    #[tokio::test]
    async fn error_mode_carries_the_provider_message() {
        let (host, mut state) = prepared();
        let http_client = TestHttpClient::new();

        let mut message = crate::message::Message::new(crate::message::OPENID2_NS);
        message.set("mode", "error");
        message.set("error", "provider says no");
        let (url, params) = callback(&linkback_url("state-1"), &message);

        let response = complete(&host, &mut state, &http_client, &url, &params).await;

        assert_eq!("provider says no", failure_message(&response));
    }
}
