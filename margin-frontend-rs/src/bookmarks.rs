//! The reading-list bookmarks: an ordered set with a capacity, persisted
//! as one JSON blob under the `bookmarks` ledger key.
//!
//! [`BookmarkShelf`] is the pure set — membership, ordering, eviction.
//! [`BookmarkStore`] wraps it with persistence and change notification:
//! in-process listeners for components on the same page, and a
//! `bookmarksUpdated` CustomEvent on `window` because the browser's
//! `storage` event never fires in the tab that did the writing (it does
//! fire in the others, which is the cross-tab half of the signal).

use std::rc::Rc;

use chrono::{DateTime, Utc};
use slotmap::SlotMap;
use stash::Ledger;

pub(crate) const BOOKMARKS_KEY: &str = "bookmarks";
pub(crate) const BOOKMARKS_UPDATED_EVENT: &str = "bookmarksUpdated";
pub(crate) const DEFAULT_CAPACITY: usize = 50;

slotmap::new_key_type! {
    pub struct ListenerKey;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub post_id: String,
    /// Title as it read at bookmark time; a later rename goes stale here.
    pub title: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct BookmarkFile {
    bookmarks: Vec<BookmarkRecord>,
}

/// Ordered bookmark set, newest first, bounded by `capacity`.
#[derive(Debug, Clone)]
pub struct BookmarkShelf {
    capacity: usize,
    records: Vec<BookmarkRecord>,
}

impl BookmarkShelf {
    pub fn new(capacity: usize) -> Self {
        Self {
            // a shelf that can hold nothing would make `add` spin
            capacity: capacity.max(1),
            records: Vec::new(),
        }
    }

    fn with_records(capacity: usize, records: Vec<BookmarkRecord>) -> Self {
        let mut shelf = Self::new(capacity);
        shelf.records = records;
        shelf.trim_to_capacity();
        shelf
    }

    /// `false` (and no change) when the post is already bookmarked. When
    /// the shelf is full, the oldest records make room first.
    pub fn add(&mut self, post_id: &str, title: &str, now: DateTime<Utc>) -> bool {
        if self.is_bookmarked(post_id) {
            return false;
        }
        while self.records.len() + 1 > self.capacity {
            self.evict_oldest();
        }
        self.records.insert(
            0,
            BookmarkRecord {
                post_id: post_id.to_string(),
                title: title.to_string(),
                added_at: now,
            },
        );
        true
    }

    /// `false` when the post was not bookmarked.
    pub fn remove(&mut self, post_id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.post_id != post_id);
        self.records.len() != before
    }

    pub fn is_bookmarked(&self, post_id: &str) -> bool {
        self.records.iter().any(|record| record.post_id == post_id)
    }

    /// Newest first.
    pub fn list(&self) -> &[BookmarkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop oldest-by-`added_at` records until the shelf fits. Eviction
    /// goes by timestamp, not position, in case persisted data arrived
    /// out of order.
    pub fn trim_to_capacity(&mut self) {
        while self.records.len() > self.capacity {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .records
            .iter()
            .enumerate()
            .min_by_key(|(_, record)| record.added_at)
            .map(|(index, _)| index);
        if let Some(index) = oldest {
            self.records.remove(index);
        }
    }
}

/// The shelf plus its ledger persistence and change signals.
///
/// Listener callbacks are *not* invoked from inside the mutating methods;
/// callers drain [`listener_callbacks`](Self::listener_callbacks) after
/// releasing their borrow, because a callback may immediately call back
/// into the store.
pub struct BookmarkStore {
    ledger: Rc<dyn Ledger>,
    shelf: BookmarkShelf,
    listeners: SlotMap<ListenerKey, Rc<dyn Fn()>>,
}

impl BookmarkStore {
    /// Load whatever the ledger has. Corrupt data degrades to an empty
    /// shelf rather than wedging the feature.
    pub fn load(ledger: Rc<dyn Ledger>, capacity: usize) -> Self {
        let records = match ledger.get(BOOKMARKS_KEY) {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<BookmarkFile>(&raw) {
                Ok(file) => file.bookmarks,
                Err(e) => {
                    log::warn!("stored bookmarks were unreadable, starting empty: {e}");
                    Vec::new()
                }
            },
        };
        Self {
            ledger,
            shelf: BookmarkShelf::with_records(capacity, records),
            listeners: SlotMap::with_key(),
        }
    }

    pub fn add(&mut self, post_id: &str, title: &str, now: DateTime<Utc>) -> bool {
        if !self.shelf.add(post_id, title, now) {
            return false;
        }
        self.persist();
        announce_same_document();
        true
    }

    pub fn remove(&mut self, post_id: &str) -> bool {
        if !self.shelf.remove(post_id) {
            return false;
        }
        self.persist();
        announce_same_document();
        true
    }

    pub fn is_bookmarked(&self, post_id: &str) -> bool {
        self.shelf.is_bookmarked(post_id)
    }

    pub fn list(&self) -> &[BookmarkRecord] {
        self.shelf.list()
    }

    pub fn len(&self) -> usize {
        self.shelf.len()
    }

    pub fn register_listener(&mut self, listener: impl Fn() + 'static) -> ListenerKey {
        self.listeners.insert(Rc::new(listener))
    }

    pub fn unregister_listener(&mut self, key: ListenerKey) {
        self.listeners.remove(key);
    }

    /// Snapshot of the registered callbacks, for invoking after the
    /// mutating borrow has been released.
    pub fn listener_callbacks(&self) -> Vec<Rc<dyn Fn()>> {
        self.listeners.values().cloned().collect()
    }

    /// Write the shelf to the ledger. A refused write gets one
    /// trim-to-capacity retry; a second refusal is logged and swallowed,
    /// so in the worst case the newest bookmark exists only in memory.
    fn persist(&mut self) {
        if self.write_shelf() {
            return;
        }
        self.shelf.trim_to_capacity();
        if !self.write_shelf() {
            log::warn!("bookmark write failed twice; the latest change may not survive reload");
        }
    }

    fn write_shelf(&self) -> bool {
        let file = BookmarkFile {
            bookmarks: self.shelf.list().to_vec(),
        };
        match serde_json::to_string(&file) {
            Ok(payload) => self.ledger.set(BOOKMARKS_KEY, &payload),
            Err(e) => {
                log::error!("failed to serialize bookmarks: {e}");
                false
            }
        }
    }
}

/// The same-document half of the change signal. Other tabs hear the native
/// `storage` event instead.
fn announce_same_document() {
    #[cfg(target_arch = "wasm32")]
    {
        let Some(window) = web_sys::window() else {
            return;
        };
        match web_sys::CustomEvent::new(BOOKMARKS_UPDATED_EVENT) {
            Ok(event) => {
                if let Err(e) = window.dispatch_event(&event) {
                    log::error!("failed to dispatch {BOOKMARKS_UPDATED_EVENT}: {e:?}");
                }
            }
            Err(e) => log::error!("failed to create {BOOKMARKS_UPDATED_EVENT} event: {e:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;
    use stash::Memory;

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn add_then_remove_round_trips_membership() {
        let mut shelf = BookmarkShelf::new(10);
        assert!(!shelf.is_bookmarked("post-1"));
        assert!(shelf.add("post-1", "Hello", ts(1)));
        assert!(shelf.is_bookmarked("post-1"));
        assert!(shelf.remove("post-1"));
        assert!(!shelf.is_bookmarked("post-1"));
    }

    #[test]
    fn duplicate_add_is_refused_without_change() {
        let mut shelf = BookmarkShelf::new(10);
        assert!(shelf.add("post-1", "Hello", ts(1)));
        assert!(!shelf.add("post-1", "Hello again", ts(2)));
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf.list()[0].title, "Hello");
    }

    #[test]
    fn removing_missing_post_is_refused() {
        let mut shelf = BookmarkShelf::new(10);
        shelf.add("post-1", "Hello", ts(1));
        assert!(!shelf.remove("post-2"));
        assert_eq!(shelf.len(), 1);
    }

    #[test]
    fn list_is_newest_first() {
        let mut shelf = BookmarkShelf::new(10);
        shelf.add("post-1", "Hello", ts(1));
        shelf.add("post-2", "World", ts(2));

        let ids: Vec<&str> = shelf
            .list()
            .iter()
            .map(|record| record.post_id.as_str())
            .collect();
        assert_eq!(ids, vec!["post-2", "post-1"]);
        assert_eq!(shelf.list()[0].added_at, ts(2));
    }

    #[test]
    fn capacity_evicts_oldest_by_added_at() {
        let mut shelf = BookmarkShelf::new(3);
        shelf.add("post-1", "a", ts(1));
        shelf.add("post-2", "b", ts(2));
        shelf.add("post-3", "c", ts(3));
        shelf.add("post-4", "d", ts(4));

        assert_eq!(shelf.len(), 3);
        assert!(!shelf.is_bookmarked("post-1"));
        let ids: Vec<&str> = shelf
            .list()
            .iter()
            .map(|record| record.post_id.as_str())
            .collect();
        assert_eq!(ids, vec!["post-4", "post-3", "post-2"]);
    }

    #[test]
    fn never_exceeds_capacity_under_any_add_sequence() {
        let mut shelf = BookmarkShelf::new(5);
        for i in 0..100 {
            shelf.add(&format!("post-{i}"), "t", ts(i));
            assert!(shelf.len() <= 5);
        }
    }

    #[test]
    fn store_persists_and_reloads() {
        let ledger: Rc<dyn Ledger> = Rc::new(Memory::new());
        {
            let mut store = BookmarkStore::load(Rc::clone(&ledger), 10);
            store.add("post-1", "Hello", ts(1));
            store.add("post-2", "World", ts(2));
        }

        let store = BookmarkStore::load(Rc::clone(&ledger), 10);
        assert_eq!(store.len(), 2);
        assert!(store.is_bookmarked("post-1"));
        assert_eq!(store.list()[0].post_id, "post-2");
    }

    #[test]
    fn corrupt_persisted_bookmarks_load_as_empty() {
        let ledger: Rc<dyn Ledger> = Rc::new(Memory::new());
        ledger.set(BOOKMARKS_KEY, "{not json");
        let store = BookmarkStore::load(Rc::clone(&ledger), 10);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn listener_callbacks_snapshot_survives_unregister() {
        let ledger: Rc<dyn Ledger> = Rc::new(Memory::new());
        let mut store = BookmarkStore::load(ledger, 10);

        let hits = Rc::new(Cell::new(0));
        let hits_in_listener = Rc::clone(&hits);
        let key = store.register_listener(move || {
            hits_in_listener.set(hits_in_listener.get() + 1);
        });

        store.add("post-1", "Hello", ts(1));
        for callback in store.listener_callbacks() {
            callback();
        }
        assert_eq!(hits.get(), 1);

        store.unregister_listener(key);
        assert!(store.listener_callbacks().is_empty());
    }

    /// Ledger that refuses a configurable number of writes, for the
    /// quota-pressure path.
    struct Flaky {
        inner: Memory,
        failures_left: Cell<u32>,
    }

    impl Ledger for Flaky {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> bool {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return false;
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) {
            self.inner.remove(key);
        }
    }

    #[test]
    fn one_failed_write_retries_and_succeeds() {
        let ledger: Rc<dyn Ledger> = Rc::new(Flaky {
            inner: Memory::new(),
            failures_left: Cell::new(1),
        });
        let mut store = BookmarkStore::load(Rc::clone(&ledger), 10);
        assert!(store.add("post-1", "Hello", ts(1)));
        // The retry went through: a reload sees the bookmark.
        let reloaded = BookmarkStore::load(ledger, 10);
        assert!(reloaded.is_bookmarked("post-1"));
    }

    #[test]
    fn two_failed_writes_keep_memory_state_but_not_persistence() {
        let ledger: Rc<dyn Ledger> = Rc::new(Flaky {
            inner: Memory::new(),
            failures_left: Cell::new(2),
        });
        let mut store = BookmarkStore::load(Rc::clone(&ledger), 10);
        // The add itself still reports success; only durability is lost.
        assert!(store.add("post-1", "Hello", ts(1)));
        assert!(store.is_bookmarked("post-1"));

        let reloaded = BookmarkStore::load(ledger, 10);
        assert!(!reloaded.is_bookmarked("post-1"));
    }
}
