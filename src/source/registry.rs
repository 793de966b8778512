use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::{OpenIdError, OpenIdHttpClient, OpenIdReturnType};

use super::{AuthSource, ConsumerConfig, OpenIdConsumer};

/// # SourceRegistry
/// The configured OpenID authentication sources, by auth id
#[derive(Debug, Clone)]
pub struct SourceRegistry<C: OpenIdHttpClient> {
    sources: BTreeMap<String, OpenIdConsumer<C>>,
}

impl<C: OpenIdHttpClient> Default for SourceRegistry<C> {
    fn default() -> Self {
        Self {
            sources: BTreeMap::new(),
        }
    }
}

impl<C: OpenIdHttpClient> SourceRegistry<C> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `source`, replacing one with the same auth id
    pub fn register(&mut self, source: OpenIdConsumer<C>) {
        self.sources.insert(source.auth_id().to_string(), source);
    }

    /// The source with `auth_id`
    pub fn get_by_id(&self, auth_id: &str) -> Option<&OpenIdConsumer<C>> {
        self.sources.get(auth_id)
    }

    /// Builds every source of a `{ "<auth id>": { options } }` map
    pub fn from_config(config: &Value, http_client: C) -> OpenIdReturnType<Self>
    where
        C: Clone,
    {
        let sources = config.as_object().ok_or_else(|| {
            OpenIdError::new_config_error("authentication sources must be a map of auth id to options")
        })?;

        let mut registry = Self::new();

        for (auth_id, options) in sources {
            let config = ConsumerConfig::from_value(auth_id, options.clone())?;
            registry.register(OpenIdConsumer::new(auth_id, config, http_client.clone())?);
        }

        Ok(registry)
    }
}
