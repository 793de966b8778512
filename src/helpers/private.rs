use lazy_static::lazy_static;
use regex::Regex;
use url::{form_urlencoded, Url};

use crate::types::{OpenIdError, OpenIdReturnType};

lazy_static! {
    static ref SCHEME_REGEX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
}

/// First characters of an XRI identifier
const XRI_GLOBAL_CONTEXT_SYMBOLS: [char; 5] = ['=', '@', '+', '$', '!'];

pub(crate) fn validate_url(url: &str) -> OpenIdReturnType<Url> {
    if let Ok(u) = Url::parse(url) {
        return Ok(u);
    }

    Err(OpenIdError::new_type_error(
        "only valid absolute URLs can be requested",
    ))
}

pub(crate) fn is_xri(input: &str) -> bool {
    input.starts_with("xri://") || input.starts_with(XRI_GLOBAL_CONTEXT_SYMBOLS)
}

/// Normalizes a user supplied identifier into the url that is used for discovery
pub(crate) fn normalize_identifier(input: &str) -> OpenIdReturnType<Url> {
    let input = input.trim();

    if input.is_empty() {
        return Err(OpenIdError::new_discovery_error("empty identifier"));
    }

    if is_xri(input) {
        return Err(OpenIdError::new_discovery_error(format!(
            "XRI identifiers are not supported: {input:?}"
        )));
    }

    let with_scheme = if SCHEME_REGEX.is_match(input) {
        input.to_string()
    } else {
        "http://".to_string() + input
    };

    let mut url = Url::parse(&with_scheme).map_err(|_| {
        OpenIdError::new_discovery_error(format!("identifier is not a valid url: {input:?}"))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(OpenIdError::new_discovery_error(format!(
            "unsupported identifier scheme: {input:?}"
        )));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Drops the fragment of an identifier url, keeps the rest untouched
pub(crate) fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

pub(crate) fn string_map_to_form_url_encoded(map: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in map {
        serializer.append_pair(key, value);
    }

    serializer.finish()
}

/// Appends query arguments to `url`, keeping the arguments it already has
pub(crate) fn append_query_args(url: &str, args: &[(String, String)]) -> OpenIdReturnType<String> {
    let mut parsed = validate_url(url)?;

    if !args.is_empty() {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in args {
            pairs.append_pair(key, value);
        }
    }

    Ok(parsed.to_string())
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

pub(crate) fn query_pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
