use url::Url;

use crate::types::{OpenIdError, OpenIdReturnType};

/// # Realm
/// The trust root a relying party asks the user to trust. `https://*.example.com/`
/// covers every subdomain of `example.com`.
#[derive(Debug, Clone, PartialEq)]
pub struct Realm {
    url: Url,
    wildcard: bool,
}

impl Realm {
    /// Parses a realm url
    pub fn parse(realm: &str) -> OpenIdReturnType<Self> {
        let invalid = || OpenIdError::new_protocol_error(format!("invalid realm: {realm:?}"));

        let (scheme, rest) = realm.split_once("://").ok_or_else(invalid)?;

        let (wildcard, rest) = match rest.strip_prefix("*.") {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let url = Url::parse(&format!("{scheme}://{rest}")).map_err(|_| invalid())?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid());
        }

        if url.fragment().is_some() || url.host_str().is_none() {
            return Err(invalid());
        }

        Ok(Self { url, wildcard })
    }

    /// Whether `return_to` lies under this realm
    pub fn validate_url(&self, return_to: &str) -> bool {
        let Ok(url) = Url::parse(return_to) else {
            return false;
        };

        if url.scheme() != self.url.scheme()
            || url.port_or_known_default() != self.url.port_or_known_default()
        {
            return false;
        }

        let (Some(host), Some(realm_host)) = (url.host_str(), self.url.host_str()) else {
            return false;
        };

        let host = host.to_ascii_lowercase();
        let realm_host = realm_host.to_ascii_lowercase();

        let host_matches = host == realm_host
            || (self.wildcard && host.ends_with(&format!(".{realm_host}")));

        if !host_matches {
            return false;
        }

        let realm_path = self.url.path();
        let path = url.path();

        if path == realm_path || (realm_path.ends_with('/') && path.starts_with(realm_path)) {
            return true;
        }

        path.strip_prefix(realm_path)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[cfg(test)]
mod realm_tests {
    use super::*;

    #[test]
    fn plain_realm_covers_paths_below_it() {
        let realm = Realm::parse("https://rp.example.com/").unwrap();

        assert!(realm.validate_url("https://rp.example.com/module.php/openid/linkback.php?x=1"));
        assert!(!realm.validate_url("http://rp.example.com/"));
        assert!(!realm.validate_url("https://rp.example.com:8443/"));
        assert!(!realm.validate_url("https://other.example.com/"));
    }

    #[test]
    fn path_realm_needs_a_segment_boundary() {
        let realm = Realm::parse("https://rp.example.com/app").unwrap();

        assert!(realm.validate_url("https://rp.example.com/app"));
        assert!(realm.validate_url("https://rp.example.com/app/cb"));
        assert!(!realm.validate_url("https://rp.example.com/application"));
    }

    #[test]
    fn wildcard_realm_covers_subdomains() {
        let realm = Realm::parse("https://*.example.com/").unwrap();

        assert!(realm.validate_url("https://rp.example.com/cb"));
        assert!(realm.validate_url("https://example.com/cb"));
        assert!(!realm.validate_url("https://example.org/cb"));
    }

    #[test]
    fn rejects_unusable_realms() {
        assert!(Realm::parse("rp.example.com").is_err());
        assert!(Realm::parse("ftp://rp.example.com/").is_err());
        assert!(Realm::parse("https://rp.example.com/#frag").is_err());
    }
}
