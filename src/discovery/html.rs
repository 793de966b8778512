use lazy_static::lazy_static;
use regex::Regex;

use super::endpoint::{ServiceEndpoint, OPENID_1_1_TYPE, OPENID_2_0_TYPE};

lazy_static! {
    static ref LINK_REGEX: Regex = Regex::new(r"(?is)<link\b([^>]*)>").unwrap();
    static ref META_REGEX: Regex = Regex::new(r"(?is)<meta\b([^>]*)>").unwrap();
    static ref ATTRIBUTE_REGEX: Regex =
        Regex::new(r#"(?i)([\w\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE_REGEX
        .captures_iter(tag)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3))?.as_str();
            Some((name, value.replace("&amp;", "&")))
        })
        .collect()
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// First `href` of a `<link>` whose `rel` lists `rel`
fn find_link(html: &str, rel: &str) -> Option<String> {
    LINK_REGEX.captures_iter(html).find_map(|c| {
        let attrs = attributes(c.get(1)?.as_str());
        let rels = attribute(&attrs, "rel")?;

        if rels.split_whitespace().any(|r| r.eq_ignore_ascii_case(rel)) {
            return attribute(&attrs, "href")
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string);
        }

        None
    })
}

/// `<meta http-equiv="X-XRDS-Location">` of a Yadis enabled page
pub(crate) fn find_xrds_location(html: &str) -> Option<String> {
    META_REGEX.captures_iter(html).find_map(|c| {
        let attrs = attributes(c.get(1)?.as_str());

        if attribute(&attrs, "http-equiv")?.eq_ignore_ascii_case("x-xrds-location") {
            return attribute(&attrs, "content").map(str::to_string);
        }

        None
    })
}

/// OpenID endpoints declared with `<link rel>` in an html page, OpenID 2.0 first
pub(crate) fn parse_html(claimed_id: &str, html: &str) -> Vec<ServiceEndpoint> {
    let mut endpoints = vec![];

    let declarations = [
        ("openid2.provider", "openid2.local_id", OPENID_2_0_TYPE),
        ("openid.server", "openid.delegate", OPENID_1_1_TYPE),
    ];

    for (provider_rel, local_id_rel, type_uri) in declarations {
        if let Some(server_url) = find_link(html, provider_rel) {
            endpoints.push(ServiceEndpoint {
                claimed_id: Some(claimed_id.to_string()),
                server_url,
                type_uris: vec![type_uri.to_string()],
                local_id: find_link(html, local_id_rel),
                canonical_id: None,
                used_yadis: false,
            });
        }
    }

    endpoints
}
