use std::collections::BTreeMap;

use tracing::debug;

use crate::association::Association;
use crate::helpers::now;
use crate::source::{StatePersistence, Transaction, AUTH_STAGE};
use crate::types::OpenIdReturnType;

use super::OpenIdStore;

/// # StateStore
/// [OpenIdStore] keeping associations inside the login transaction.
///
/// The transaction is borrowed for the lifetime of the store, every stored association
/// is persisted right away by saving the transaction again under [AUTH_STAGE].
pub struct StateStore<'a, P: StatePersistence + ?Sized> {
    state: &'a mut Transaction,
    persistence: &'a P,
}

impl<'a, P: StatePersistence + ?Sized> StateStore<'a, P> {
    /// Creates a store over `state`
    pub fn new(state: &'a mut Transaction, persistence: &'a P) -> Self {
        Self { state, persistence }
    }

    /// Usable associations of `server_url` by handle
    fn server_associations(&self, server_url: &str) -> BTreeMap<&str, Association> {
        let Some(serialized) = self.state.associations.get(server_url) else {
            return BTreeMap::new();
        };

        let now = now();

        serialized
            .iter()
            .filter_map(|(handle, serialized)| match Association::deserialize(serialized) {
                Ok(association) => Some((handle.as_str(), association)),
                Err(e) => {
                    debug!("skipping stored association {handle}: {e}");
                    None
                }
            })
            .filter(|(_, association)| association.expires_in_at(now) > 0)
            .collect()
    }
}

impl<P: StatePersistence + ?Sized> OpenIdStore for StateStore<'_, P> {
    fn get_association(&self, server_url: &str, handle: Option<&str>) -> Option<Association> {
        let mut associations = self.server_associations(server_url);

        if let Some(handle) = handle {
            return associations.remove(handle);
        }

        let mut recent: Option<Association> = None;

        for association in associations.into_values() {
            match &recent {
                Some(r) if association.issued <= r.issued => {}
                _ => recent = Some(association),
            }
        }

        recent
    }

    fn store_association(
        &mut self,
        server_url: &str,
        association: &Association,
    ) -> OpenIdReturnType<()> {
        self.state
            .associations
            .entry(server_url.to_string())
            .or_default()
            .insert(association.handle.clone(), association.serialize()?);

        self.persistence.save_state(self.state, AUTH_STAGE)?;

        Ok(())
    }

    /// Accepts every nonce. Replays are stopped by the host discarding the transaction
    /// once the login completes.
    fn accept_nonce(&mut self, _server_url: &str, _timestamp: i64, _salt: &str) -> bool {
        true
    }
}
