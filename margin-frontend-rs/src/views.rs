//! View counting with a local de-duplication window.
//!
//! The ledger remembers when this client last had a view counted for each
//! post (`post_view_<slug>`, stringified epoch milliseconds). A repeat
//! visit within 24 hours is suppressed locally and never reaches the
//! server. There is no timer watching the window expire; freshness is
//! re-derived from the stored timestamp whenever someone asks.

use stash::Ledger;

pub(crate) const VIEW_DEDUP_WINDOW_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// How long a page has to stay open before its view counts. Immediate
/// back-navigation and crawler prefetch bounce off this.
pub(crate) const VIEW_COUNT_DELAY_MS: u32 = 1_000;

pub(crate) fn view_key(slug: &str) -> String {
    format!("post_view_{slug}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewFreshness {
    /// No usable timestamp in the ledger (never counted here, storage
    /// unavailable, or the stored value was garbage).
    NeverViewed,
    /// Counted within the window; suppress.
    RecentlyViewed,
    /// Counted, but long enough ago that it counts again.
    Stale,
}

pub fn classify(ledger: &dyn Ledger, slug: &str, now_ms: f64) -> ViewFreshness {
    let Some(raw) = ledger.get(&view_key(slug)) else {
        return ViewFreshness::NeverViewed;
    };
    let Ok(last_ms) = raw.parse::<f64>() else {
        return ViewFreshness::NeverViewed;
    };
    if now_ms - last_ms >= VIEW_DEDUP_WINDOW_MS {
        ViewFreshness::Stale
    } else {
        ViewFreshness::RecentlyViewed
    }
}

pub fn should_count(ledger: &dyn Ledger, slug: &str, now_ms: f64) -> bool {
    classify(ledger, slug, now_ms) != ViewFreshness::RecentlyViewed
}

/// Open the suppression window. Called only after the server confirmed the
/// increment, so a failed call stays retryable on the next visit.
pub fn mark_counted(ledger: &dyn Ledger, slug: &str, now_ms: f64) {
    if !ledger.set(&view_key(slug), &format!("{}", now_ms as u64)) {
        // Worst case the next visit counts again; the server de-duplicates
        // by caller address too.
        log::debug!("view timestamp for {slug} was not persisted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash::Memory;

    const HOUR_MS: f64 = 60.0 * 60.0 * 1000.0;

    #[test]
    fn first_visit_counts() {
        let ledger = Memory::new();
        assert_eq!(
            classify(&ledger, "hello-world", 0.0),
            ViewFreshness::NeverViewed
        );
        assert!(should_count(&ledger, "hello-world", 0.0));
    }

    #[test]
    fn second_visit_within_window_is_suppressed() {
        let ledger = Memory::new();
        let mut increments = 0;

        let mut visit = |now_ms: f64| {
            if should_count(&ledger, "hello-world", now_ms) {
                increments += 1;
                mark_counted(&ledger, "hello-world", now_ms);
            }
        };

        visit(0.0);
        visit(23.0 * HOUR_MS);
        assert_eq!(increments, 1);
    }

    #[test]
    fn visit_after_window_counts_again() {
        let ledger = Memory::new();
        let mut increments = 0;

        let mut visit = |now_ms: f64| {
            if should_count(&ledger, "hello-world", now_ms) {
                increments += 1;
                mark_counted(&ledger, "hello-world", now_ms);
            }
        };

        visit(0.0);
        visit(25.0 * HOUR_MS);
        assert_eq!(increments, 2);
    }

    #[test]
    fn window_boundary_is_stale() {
        let ledger = Memory::new();
        mark_counted(&ledger, "hello-world", 0.0);
        assert_eq!(
            classify(&ledger, "hello-world", VIEW_DEDUP_WINDOW_MS),
            ViewFreshness::Stale
        );
    }

    #[test]
    fn garbage_timestamp_reads_as_never_viewed() {
        let ledger = Memory::new();
        ledger.set(&view_key("hello-world"), "not-a-number");
        assert_eq!(
            classify(&ledger, "hello-world", 0.0),
            ViewFreshness::NeverViewed
        );
    }

    #[test]
    fn slugs_do_not_share_windows() {
        let ledger = Memory::new();
        mark_counted(&ledger, "first-post", 0.0);
        assert!(!should_count(&ledger, "first-post", 1.0));
        assert!(should_count(&ledger, "second-post", 1.0));
    }
}
