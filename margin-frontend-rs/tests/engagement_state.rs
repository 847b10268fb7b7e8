//! The engagement pieces working against one shared ledger, the way a
//! page uses them.

use std::rc::Rc;

use chrono::{TimeZone, Utc};
use margin_frontend_rs::{BookmarkStore, mark_counted, should_count};
use stash::{Ledger, Memory};

#[test]
fn bookmark_scenario_hello_then_world() {
    let mut store = BookmarkStore::load(Rc::new(Memory::new()), 10);

    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    assert!(store.add("post-1", "Hello", t1));
    {
        let list = store.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].post_id, "post-1");
        assert_eq!(list[0].title, "Hello");
        assert_eq!(list[0].added_at, t1);
    }

    let t2 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
    assert!(store.add("post-2", "World", t2));
    let ids: Vec<&str> = store
        .list()
        .iter()
        .map(|record| record.post_id.as_str())
        .collect();
    assert_eq!(ids, vec!["post-2", "post-1"]);
}

#[test]
fn bookmarks_persist_in_the_page_wire_format() {
    let ledger: Rc<dyn Ledger> = Rc::new(Memory::new());
    let mut store = BookmarkStore::load(Rc::clone(&ledger), 10);

    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    store.add("post-1", "Hello", t1);

    // Other readers of the `bookmarks` key (the storage event handler on
    // other tabs) see `{ "bookmarks": [...] }` with camelCase records.
    let raw = ledger.get("bookmarks").expect("shelf was persisted");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");
    let records = value["bookmarks"].as_array().expect("bookmarks array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["postId"], "post-1");
    assert_eq!(records[0]["title"], "Hello");
    assert!(records[0]["addedAt"].is_string());
}

#[test]
fn view_window_and_bookmarks_share_a_ledger_without_collisions() {
    let ledger: Rc<dyn Ledger> = Rc::new(Memory::new());
    let mut store = BookmarkStore::load(Rc::clone(&ledger), 10);

    // A counted view and a bookmark for the same post live under
    // different keys.
    assert!(should_count(ledger.as_ref(), "post-1", 0.0));
    mark_counted(ledger.as_ref(), "post-1", 0.0);
    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    assert!(store.add("post-1", "Hello", t1));

    assert!(!should_count(ledger.as_ref(), "post-1", 1000.0));
    assert!(store.is_bookmarked("post-1"));
    assert!(ledger.get("post_view_post-1").is_some());
    assert!(ledger.get("bookmarks").is_some());
}
