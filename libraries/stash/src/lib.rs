//! Durable, synchronous, origin-scoped key/value storage for Margin's
//! engagement state.
//!
//! The browser's `localStorage` is the real backing store; everywhere else
//! (native builds, tests) an in-memory map stands in. Both sit behind the
//! [`Ledger`] trait, which deliberately cannot fail loudly: a missing or
//! unreadable key reads as "never interacted", and a write that doesn't
//! stick reports `false` instead of raising. Callers decide how much they
//! care.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Synchronous string key/value persistence.
///
/// Absence of a key is indistinguishable from "never written" on purpose:
/// the conservative default for every consumer is "this client has not
/// acted yet".
pub trait Ledger {
    /// Read a key. `None` on a missing key *or* on any storage failure.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a key. Returns `true` iff the value was durably written.
    /// Quota exhaustion and unavailable storage report `false`.
    fn set(&self, key: &str, value: &str) -> bool;

    /// Delete a key. Idempotent; deleting a missing key is not an error.
    fn remove(&self, key: &str);
}

/// In-memory ledger used by native builds and tests.
#[derive(Debug, Default)]
pub struct Memory {
    entries: RefCell<BTreeMap<String, String>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Ledger for Memory {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// `window.localStorage`, degraded to no-ops wherever the browser withholds
/// it (private browsing, workers, storage disabled).
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

#[cfg(target_arch = "wasm32")]
impl Ledger for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let Some(storage) = Self::storage() else {
            return false;
        };
        match storage.set_item(key, value) {
            Ok(()) => true,
            Err(_) => {
                // Quota, mostly. The caller owns the retry policy.
                log::warn!("localStorage write for {key} failed");
                false
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// The ledger appropriate for the current target: `localStorage` in the
/// browser, an in-memory map elsewhere.
pub fn default_ledger() -> Rc<dyn Ledger> {
    #[cfg(target_arch = "wasm32")]
    {
        Rc::new(LocalStorage)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Rc::new(Memory::new())
    }
}
