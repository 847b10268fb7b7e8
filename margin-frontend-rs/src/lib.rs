#![deny(clippy::string_slice)]

//! Margin's client-side engagement core.
//!
//! Everything here runs in the reader's browser: view counting behind a
//! 24-hour local window, optimistic like toggling, the bookmark shelf,
//! and the debounced search boundary. The server's counter API stays
//! authoritative for every number; the local ledger only answers "has
//! this client already acted".

mod bookmarks;
mod engagement;
mod likes;
mod search;
mod utils;
mod views;

pub use bookmarks::{BookmarkRecord, BookmarkShelf, BookmarkStore, ListenerKey};
pub use engagement::{EngagementError, LikeStatus, ViewStatus};
pub use likes::{LikeSnapshot, LikeState, Toggle, locally_liked};
pub use search::{SearchSuggestion, fetch_suggestions};
pub use views::{ViewFreshness, classify, mark_counted, should_count};

// The rate limiters ship in the same bundle so pages can construct them
// straight from JS.
#[cfg(target_arch = "wasm32")]
pub use simmer::{DebouncedFunction, ThrottledFunction};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use gloo_timers::callback::Timeout;
use stash::Ledger;
use wasm_bindgen::prelude::*;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

struct EngagementInner {
    // we never hold a borrow across an .await; that guarantees the absence
    // of "already borrowed" panics when callbacks re-enter us
    ledger: Rc<dyn Ledger>,
    likes: RefCell<BTreeMap<String, LikeState>>,
    bookmarks: RefCell<BookmarkStore>,
    view_timers: RefCell<BTreeMap<String, Timeout>>,
    toast: Option<js_sys::Function>,
}

impl EngagementInner {
    /// Non-blocking failure signal for the page to render as a toast.
    fn emit_toast(&self, message: &str) {
        if let Some(callback) = &self.toast {
            let this = JsValue::null();
            let _ = callback.call1(&this, &JsValue::from_str(message));
        }
    }

    /// Collect the callbacks first, call them after the borrow is gone:
    /// many of them will synchronously call back into methods that
    /// themselves borrow the store.
    fn flush_bookmark_listeners(&self) {
        let callbacks = self.bookmarks.borrow().listener_callbacks();
        for callback in callbacks {
            callback();
        }
    }
}

/// One per page. Owns the ledger, the per-post like states, the bookmark
/// shelf, and the pending view timers; drops with the page.
#[wasm_bindgen]
pub struct Engagement {
    inner: Rc<EngagementInner>,
}

/// Handle returned by [`Engagement::subscribe_bookmarks`]; hand it back to
/// stop receiving updates.
#[wasm_bindgen]
pub struct BookmarkSubscription {
    key: ListenerKey,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Engagement {
    /// `toast` is called with a human-readable message whenever a server
    /// call fails; pass `None` to drop those on the floor.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new(toast: Option<js_sys::Function>) -> Engagement {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        let ledger = stash::default_ledger();
        let bookmarks = BookmarkStore::load(Rc::clone(&ledger), bookmarks::DEFAULT_CAPACITY);

        Engagement {
            inner: Rc::new(EngagementInner {
                ledger,
                likes: RefCell::new(BTreeMap::new()),
                bookmarks: RefCell::new(bookmarks),
                view_timers: RefCell::new(BTreeMap::new()),
                toast,
            }),
        }
    }

    // =======
    // views
    // =======

    /// Declare view intent for a post. If the local window allows it, the
    /// actual increment fires after a short delay; leaving the page first
    /// (`cancel_view` / `dispose`) discards it.
    #[cfg(target_arch = "wasm32")]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn track_view(&self, slug: String) {
        let now = js_sys::Date::now();
        if !views::should_count(self.inner.ledger.as_ref(), &slug, now) {
            return;
        }

        let inner = Rc::clone(&self.inner);
        let timer_slug = slug.clone();
        let timeout = Timeout::new(views::VIEW_COUNT_DELAY_MS, move || {
            inner.view_timers.borrow_mut().remove(&timer_slug);

            let inner = Rc::clone(&inner);
            let slug = timer_slug.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match engagement::record_view(&slug).await {
                    Ok(view_count) => {
                        views::mark_counted(inner.ledger.as_ref(), &slug, js_sys::Date::now());
                        log::debug!("view counted for {slug}, total {view_count}");
                    }
                    Err(e) => {
                        // Ledger stays unwritten, so the next visit retries.
                        log::warn!("view increment for {slug} failed: {e}");
                        inner.emit_toast("Couldn't record your visit");
                    }
                }
            });
        });

        // Replacing a pending timer for the same post drops it, which
        // cancels the scheduled call.
        self.inner.view_timers.borrow_mut().insert(slug, timeout);
    }

    /// Cancel a pending view increment. Returns whether one was pending.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn cancel_view(&self, slug: String) -> bool {
        self.inner.view_timers.borrow_mut().remove(&slug).is_some()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn view_status(&self, slug: String) -> Result<ViewStatus, JsValue> {
        match engagement::view_status(&slug).await {
            Ok(status) => Ok(status),
            Err(e) => {
                self.inner.emit_toast("Couldn't load view counts");
                Err(JsValue::from_str(&format!("Request error: {e}")))
            }
        }
    }

    // =======
    // likes
    // =======

    /// Flip the like for a post, optimistically. Resolves to the state the
    /// UI should show: the server's pair on success, the restored
    /// pre-toggle values on failure (also signalled via the toast
    /// callback). While a toggle is in flight further calls are blocked
    /// and return the current state unchanged.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn toggle_like(&self, slug: String) -> Result<LikeStatus, JsValue> {
        let began = {
            let mut likes = self.inner.likes.borrow_mut();
            let state = likes
                .entry(slug.clone())
                .or_insert_with(|| LikeState::from_ledger(self.inner.ledger.as_ref(), &slug));
            state.begin_toggle()
        };

        if began.is_none() {
            let likes = self.inner.likes.borrow();
            let current = likes.get(&slug).map(LikeState::status).unwrap_or_default();
            return Ok(current);
        }

        match engagement::toggle_like(&slug).await {
            Ok(server) => {
                likes::mirror_liked(self.inner.ledger.as_ref(), &slug, server.liked);
                let mut likes = self.inner.likes.borrow_mut();
                if let Some(state) = likes.get_mut(&slug) {
                    state.commit(server);
                }
                Ok(server)
            }
            Err(e) => {
                {
                    let mut likes = self.inner.likes.borrow_mut();
                    if let Some(state) = likes.get_mut(&slug) {
                        state.rollback();
                    }
                }
                log::warn!("like toggle for {slug} failed, rolled back: {e}");
                self.inner.emit_toast("Couldn't update your like");
                Err(JsValue::from_str(&format!("Request error: {e}")))
            }
        }
    }

    /// The like state the UI should currently show, without touching the
    /// network: in-memory if this page already interacted, otherwise the
    /// ledger's liked flag with a zero count awaiting hydration.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn like_status(&self, slug: String) -> LikeStatus {
        let likes = self.inner.likes.borrow();
        match likes.get(&slug) {
            Some(state) => state.status(),
            None => LikeState::from_ledger(self.inner.ledger.as_ref(), &slug).status(),
        }
    }

    /// Fetch the server's like state and adopt it (unless a toggle is in
    /// flight), reconciling the ledger's liked flag with server truth.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn hydrate_like(&self, slug: String) -> Result<LikeStatus, JsValue> {
        let server = match engagement::like_status(&slug).await {
            Ok(server) => server,
            Err(e) => {
                self.inner.emit_toast("Couldn't load like state");
                return Err(JsValue::from_str(&format!("Request error: {e}")));
            }
        };

        let adopted = {
            let mut likes = self.inner.likes.borrow_mut();
            let state = likes.entry(slug.clone()).or_insert_with(LikeState::default);
            state.hydrate(server)
        };
        if adopted {
            likes::mirror_liked(self.inner.ledger.as_ref(), &slug, server.liked);
        }
        Ok(server)
    }

    // =======
    // bookmarks
    // =======

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn add_bookmark(&self, post_id: String, title: String) -> bool {
        let added = self
            .inner
            .bookmarks
            .borrow_mut()
            .add(&post_id, &title, chrono::Utc::now());
        if added {
            self.inner.flush_bookmark_listeners();
        }
        added
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn remove_bookmark(&self, post_id: String) -> bool {
        let removed = self.inner.bookmarks.borrow_mut().remove(&post_id);
        if removed {
            self.inner.flush_bookmark_listeners();
        }
        removed
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn is_bookmarked(&self, post_id: String) -> bool {
        self.inner.bookmarks.borrow().is_bookmarked(&post_id)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn bookmark_count(&self) -> usize {
        self.inner.bookmarks.borrow().len()
    }

    /// The shelf, newest first, as `BookmarkRecord[]`.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn list_bookmarks(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.bookmarks.borrow().list())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e:?}")))
    }

    /// Be told whenever the shelf changes on this page. Other pages listen
    /// for the `bookmarksUpdated` CustomEvent / `storage` event instead.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn subscribe_bookmarks(&self, callback: js_sys::Function) -> BookmarkSubscription {
        let key = self.inner.bookmarks.borrow_mut().register_listener(move || {
            let this = JsValue::null();
            let _ = callback.call0(&this);
        });
        BookmarkSubscription { key }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn unsubscribe_bookmarks(&self, subscription: BookmarkSubscription) {
        self.inner
            .bookmarks
            .borrow_mut()
            .unregister_listener(subscription.key);
    }

    /// Drop every pending view timer. Call on page teardown.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn dispose(&self) {
        self.inner.view_timers.borrow_mut().clear();
    }
}
