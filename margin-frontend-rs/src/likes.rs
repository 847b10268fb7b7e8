//! Optimistic like toggling.
//!
//! The UI flips immediately; the server answers with the authoritative
//! `{liked, likeCount}` pair, which either confirms the guess or replaces
//! it. A failed request restores the exact pre-toggle values. The pending
//! snapshot doubles as the per-post in-flight lock: while it is held, new
//! toggle attempts are refused, and both `commit` and `rollback` release
//! it, so no outcome leaves the lock wedged.
//!
//! The lock is per tab. Two tabs that both read "not liked" can still race
//! each other into a double flip at the server; there is no request id or
//! compare-and-swap on this protocol.

use stash::Ledger;

use crate::engagement::LikeStatus;

pub(crate) fn like_key(slug: &str) -> String {
    format!("post_like_{slug}")
}

/// The ledger's optimistic echo of "has this client liked the post".
/// Presence of `"true"` means liked; anything else means not.
pub fn locally_liked(ledger: &dyn Ledger, slug: &str) -> bool {
    ledger.get(&like_key(slug)).as_deref() == Some("true")
}

pub(crate) fn mirror_liked(ledger: &dyn Ledger, slug: &str, liked: bool) {
    if liked {
        if !ledger.set(&like_key(slug), "true") {
            log::debug!("like flag for {slug} was not persisted");
        }
    } else {
        ledger.remove(&like_key(slug));
    }
}

/// The values a toggle has to restore if the server says no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSnapshot {
    pub liked: bool,
    pub like_count: u32,
}

/// Where a toggle ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Optimistically applied, request not yet settled.
    Pending { snapshot: LikeSnapshot },
    /// The server's pair overwrote local state.
    Committed(LikeStatus),
    /// The pre-toggle snapshot was restored.
    RolledBack(LikeSnapshot),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LikeState {
    liked: bool,
    like_count: u32,
    pending: Option<LikeSnapshot>,
}

impl LikeState {
    pub fn new(liked: bool, like_count: u32) -> Self {
        Self {
            liked,
            like_count,
            pending: None,
        }
    }

    /// Seed state before any server contact: the ledger remembers whether
    /// this client liked the post, the count waits for hydration.
    pub fn from_ledger(ledger: &dyn Ledger, slug: &str) -> Self {
        Self::new(locally_liked(ledger, slug), 0)
    }

    pub fn status(&self) -> LikeStatus {
        LikeStatus {
            liked: self.liked,
            like_count: self.like_count,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply the optimistic flip and take the lock. `None` while a toggle
    /// is already in flight: the second of two rapid toggles is blocked
    /// outright rather than queued or coalesced.
    pub fn begin_toggle(&mut self) -> Option<Toggle> {
        if self.pending.is_some() {
            return None;
        }
        let snapshot = LikeSnapshot {
            liked: self.liked,
            like_count: self.like_count,
        };
        self.liked = !self.liked;
        self.like_count = if self.liked {
            self.like_count.saturating_add(1)
        } else {
            self.like_count.saturating_sub(1)
        };
        self.pending = Some(snapshot);
        Some(Toggle::Pending { snapshot })
    }

    /// The server answered: its pair wins, whatever the optimistic guess
    /// was. Releases the lock.
    pub fn commit(&mut self, server: LikeStatus) -> Toggle {
        self.liked = server.liked;
        self.like_count = server.like_count;
        self.pending = None;
        Toggle::Committed(server)
    }

    /// The request failed: restore the pre-toggle values. Releases the
    /// lock. Without a pending toggle this is a no-op report of current
    /// state.
    pub fn rollback(&mut self) -> Toggle {
        let snapshot = self.pending.take().unwrap_or(LikeSnapshot {
            liked: self.liked,
            like_count: self.like_count,
        });
        self.liked = snapshot.liked;
        self.like_count = snapshot.like_count;
        Toggle::RolledBack(snapshot)
    }

    /// Adopt server truth outside a toggle (page-load hydration). Refused
    /// while a toggle is in flight so it cannot clobber the snapshot.
    pub fn hydrate(&mut self, server: LikeStatus) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.liked = server.liked;
        self.like_count = server.like_count;
        true
    }
}
