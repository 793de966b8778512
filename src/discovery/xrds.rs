use lazy_static::lazy_static;
use regex::Regex;

use super::endpoint::{
    ServiceEndpoint, OPENID_1_0_TYPE, OPENID_1_1_TYPE, OPENID_IDP_2_0_TYPE, OPENID_TYPE_URIS,
};

lazy_static! {
    static ref XRD_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?XRD\b[^>]*>(.*?)</(?:\w+:)?XRD>").unwrap();
    static ref CANONICAL_ID_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?CanonicalID\b[^>]*>\s*(.*?)\s*</(?:\w+:)?CanonicalID>").unwrap();
    static ref SERVICE_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?Service\b([^>]*)>(.*?)</(?:\w+:)?Service>").unwrap();
    static ref TYPE_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?Type\b[^>]*>\s*(.*?)\s*</(?:\w+:)?Type>").unwrap();
    static ref URI_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?URI\b([^>]*)>\s*(.*?)\s*</(?:\w+:)?URI>").unwrap();
    static ref LOCAL_ID_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?LocalID\b[^>]*>\s*(.*?)\s*</(?:\w+:)?LocalID>").unwrap();
    static ref DELEGATE_REGEX: Regex =
        Regex::new(r"(?s)<(?:\w+:)?Delegate\b[^>]*>\s*(.*?)\s*</(?:\w+:)?Delegate>").unwrap();
    static ref PRIORITY_REGEX: Regex = Regex::new(r#"\bpriority\s*=\s*["'](\d+)["']"#).unwrap();
}

fn unescape_xml(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// services and uris without a priority come last
fn priority(attributes: &str) -> u64 {
    PRIORITY_REGEX
        .captures(attributes)
        .and_then(|c| c.get(1))
        .and_then(|p| p.as_str().parse().ok())
        .unwrap_or(u64::MAX)
}

fn first_capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .filter(|v| !v.is_empty())
}

/// Reads the OpenID services of an XRDS document.
///
/// Only the last XRD of the document describes the identifier. Endpoints come back
/// ordered by service type preference, then by service and uri priority.
pub(crate) fn parse_xrds(claimed_id: &str, document: &str) -> Vec<ServiceEndpoint> {
    let Some(xrd) = XRD_REGEX
        .captures_iter(document)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return vec![];
    };

    let canonical_id = first_capture(&CANONICAL_ID_REGEX, xrd);

    let mut ranked = vec![];

    for service in SERVICE_REGEX.captures_iter(xrd) {
        let service_priority = priority(service.get(1).map_or("", |m| m.as_str()));
        let body = service.get(2).map_or("", |m| m.as_str());

        let type_uris: Vec<String> = TYPE_REGEX
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str()))
            .filter(|t| OPENID_TYPE_URIS.contains(&t.as_str()))
            .collect();

        if type_uris.is_empty() {
            continue;
        }

        let is_op_identifier = type_uris.iter().any(|t| t == OPENID_IDP_2_0_TYPE);
        let is_openid1 = type_uris
            .iter()
            .all(|t| t == OPENID_1_0_TYPE || t == OPENID_1_1_TYPE);

        let local_id = if is_op_identifier {
            None
        } else if is_openid1 {
            first_capture(&DELEGATE_REGEX, body)
        } else {
            first_capture(&LOCAL_ID_REGEX, body)
        };

        for uri in URI_REGEX.captures_iter(body) {
            let uri_priority = priority(uri.get(1).map_or("", |m| m.as_str()));
            let server_url = unescape_xml(uri.get(2).map_or("", |m| m.as_str()));

            if server_url.is_empty() {
                continue;
            }

            let endpoint = ServiceEndpoint {
                claimed_id: (!is_op_identifier).then(|| claimed_id.to_string()),
                server_url,
                type_uris: type_uris.clone(),
                local_id: local_id.clone(),
                canonical_id: canonical_id.clone(),
                used_yadis: true,
            };

            ranked.push((endpoint.type_rank(), service_priority, uri_priority, endpoint));
        }
    }

    ranked.sort_by_key(|(rank, service, uri, _)| (*rank, *service, *uri));

    ranked.into_iter().map(|(_, _, _, e)| e).collect()
}

#[cfg(test)]
mod xrds_tests {
    use super::*;
    use crate::discovery::endpoint::OPENID_2_0_TYPE;

    const XRDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)" xmlns:openid="http://openid.net/xmlns/1.0">
  <XRD>
    <Service priority="20">
      <Type>http://openid.net/signon/1.1</Type>
      <URI>http://www.livejournal.com/openid/server.bml</URI>
      <openid:Delegate>http://frank.livejournal.com/</openid:Delegate>
    </Service>
    <Service priority="10">
      <Type>http://specs.openid.net/auth/2.0/signon</Type>
      <URI priority="2">https://op.example.com/backup?a=1&amp;b=2</URI>
      <URI priority="1">https://op.example.com/server</URI>
      <LocalID>https://frank.example.com/</LocalID>
    </Service>
    <Service priority="0">
      <Type>http://lid.netmesh.org/sso/2.0</Type>
      <URI>https://lid.example.com/</URI>
    </Service>
  </XRD>
</xrds:XRDS>"#;

    #[test]
    fn orders_openid2_services_first_then_by_priority() {
        let endpoints = parse_xrds("https://frank.example.com/", XRDS);

        assert_eq!(3, endpoints.len());
        assert_eq!("https://op.example.com/server", endpoints[0].server_url);
        assert_eq!("https://op.example.com/backup?a=1&b=2", endpoints[1].server_url);
        assert!(endpoints[0].supports_type(OPENID_2_0_TYPE));
        assert_eq!(Some("https://frank.example.com/"), endpoints[0].local_id.as_deref());
        assert_eq!(
            Some("http://frank.livejournal.com/"),
            endpoints[2].local_id.as_deref()
        );
        assert!(endpoints[2].compatibility_mode());
        assert!(endpoints.iter().all(|e| e.used_yadis));
    }

    #[test]
    fn op_identifier_services_have_no_claimed_id() {
        let doc = r#"<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"><XRD>
            <Service><Type>http://specs.openid.net/auth/2.0/server</Type><URI>https://op.example.com/ud</URI></Service>
        </XRD></xrds:XRDS>"#;

        let endpoints = parse_xrds("https://op.example.com/", doc);

        assert_eq!(1, endpoints.len());
        assert!(endpoints[0].is_op_identifier());
        assert_eq!(None, endpoints[0].claimed_id);
        assert!(!endpoints[0].compatibility_mode());
    }

    #[test]
    fn ignores_documents_without_xrd() {
        assert!(parse_xrds("https://example.com/", "<html></html>").is_empty());
    }
}
