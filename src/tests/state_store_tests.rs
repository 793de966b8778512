use crate::source::{Transaction, AUTH_STAGE};
use crate::store::{OpenIdStore, StateStore};

use crate::tests::fixtures::{association, SERVER_URL};
use crate::tests::test_host::{MemoryHost, STATE_ID_KEY};

#[cfg(test)]
mod get_association {
    use super::*;

    #[test]
    fn expired_associations_are_hidden() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        let mut store = StateStore::new(&mut state, &host);

        store
            .store_association(SERVER_URL, &association("old", 7200, 3600))
            .unwrap();

        assert_eq!(None, store.get_association(SERVER_URL, Some("old")));
        assert_eq!(None, store.get_association(SERVER_URL, None));
    }

    #[test]
    fn most_recently_issued_wins_without_handle() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        let mut store = StateStore::new(&mut state, &host);

        store
            .store_association(SERVER_URL, &association("a", 100, 3600))
            .unwrap();
        store
            .store_association(SERVER_URL, &association("b", 10, 3600))
            .unwrap();
        store
            .store_association(SERVER_URL, &association("c", 50, 3600))
            .unwrap();

        let recent = store.get_association(SERVER_URL, None).unwrap();

        assert_eq!("b", recent.handle);
    }

    #[test]
    fn unknown_server_or_handle_has_no_association() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        let mut store = StateStore::new(&mut state, &host);

        store
            .store_association(SERVER_URL, &association("a", 0, 3600))
            .unwrap();

        assert_eq!(None, store.get_association("https://other.example.com/", None));
        assert_eq!(None, store.get_association(SERVER_URL, Some("b")));
    }

    #[test]
    fn undeserializable_entries_are_skipped() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        state
            .associations
            .entry(SERVER_URL.to_string())
            .or_default()
            .insert("broken".to_string(), "not an association".to_string());

        let mut store = StateStore::new(&mut state, &host);
        store
            .store_association(SERVER_URL, &association("good", 0, 3600))
            .unwrap();

        assert_eq!(None, store.get_association(SERVER_URL, Some("broken")));
        assert_eq!("good", store.get_association(SERVER_URL, None).unwrap().handle);
    }
}

#[cfg(test)]
mod store_association {
    use super::*;

    #[test]
    fn stored_association_reads_back_identical() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        let mut store = StateStore::new(&mut state, &host);

        let stored = association("h", 0, 3600);
        store.store_association(SERVER_URL, &stored).unwrap();

        assert_eq!(Some(stored), store.get_association(SERVER_URL, Some("h")));
    }

    #[test]
    fn same_handle_overwrites() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        let mut store = StateStore::new(&mut state, &host);

        store
            .store_association(SERVER_URL, &association("h", 100, 3600))
            .unwrap();
        let newer = association("h", 0, 60);
        store.store_association(SERVER_URL, &newer).unwrap();

        assert_eq!(Some(newer), store.get_association(SERVER_URL, Some("h")));
        assert_eq!(1, state.associations[SERVER_URL].len());
    }

    #[test]
    fn saves_the_transaction_under_the_same_id() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        state.set_transport(STATE_ID_KEY, "state-7");

        let mut store = StateStore::new(&mut state, &host);
        store
            .store_association(SERVER_URL, &association("a", 0, 3600))
            .unwrap();
        store
            .store_association(SERVER_URL, &association("b", 0, 3600))
            .unwrap();

        assert_eq!(
            vec![
                ("state-7".to_string(), AUTH_STAGE.to_string()),
                ("state-7".to_string(), AUTH_STAGE.to_string()),
            ],
            *host.saves.borrow()
        );

        let (stage, saved) = host.stored_state("state-7").unwrap();
        assert_eq!(AUTH_STAGE, stage);
        assert_eq!(2, saved.associations[SERVER_URL].len());
    }
}

#[cfg(test)]
mod accept_nonce {
    use super::*;

    #[test]
    fn every_nonce_is_accepted() {
        let host = MemoryHost::new();
        let mut state = Transaction::default();
        let mut store = StateStore::new(&mut state, &host);

        assert!(store.accept_nonce(SERVER_URL, 0, "salt"));
        assert!(store.accept_nonce(SERVER_URL, 0, "salt"));
        assert!(store.accept_nonce("", i64::MAX, ""));
    }
}
