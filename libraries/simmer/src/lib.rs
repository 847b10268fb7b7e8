//! Rate limiting for bursty UI events.
//!
//! Two primitives, each in two layers. The cores ([`Debounce`],
//! [`Throttle`]) are pure state machines driven by an explicit clock in
//! epoch milliseconds, generic over whatever payload the caller wants
//! delivered to the wrapped function. The wasm layer wraps a
//! `js_sys::Function` around a core and does the actual timer plumbing.
//!
//! Keeping the clock out of the cores means the timing semantics are
//! testable with plain numbers, no timers involved.

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{DebouncedFunction, ThrottledFunction};

/// Collapses a burst of calls into a single invocation, `wait` after the
/// *last* call of the burst.
///
/// Each `call` replaces any pending payload and pushes the deadline back.
/// `fire` only releases the payload once the clock has reached the
/// deadline of the most recent call, so a firing scheduled for an older
/// deadline comes back empty.
#[derive(Debug)]
pub struct Debounce<T> {
    wait_ms: f64,
    pending: Option<(f64, T)>,
}

impl<T> Debounce<T> {
    pub fn new(wait_ms: f64) -> Self {
        Self {
            wait_ms,
            pending: None,
        }
    }

    /// Record a call at `now_ms`, replacing any pending one. Returns the
    /// deadline at which the wrapped function should run.
    pub fn call(&mut self, now_ms: f64, payload: T) -> f64 {
        let deadline = now_ms + self.wait_ms;
        self.pending = Some((deadline, payload));
        deadline
    }

    /// Release the pending payload if `now_ms` has reached its deadline.
    pub fn fire(&mut self, now_ms: f64) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now_ms >= *deadline => {
                self.pending.take().map(|(_, payload)| payload)
            }
            _ => None,
        }
    }

    /// Discard any pending payload without invoking. Returns whether
    /// something was discarded.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// What a [`Throttle`] decided to do with a call.
#[derive(Debug, PartialEq)]
pub enum ThrottleDecision<T> {
    /// Leading edge: run the wrapped function right now.
    Invoke(T),
    /// Inside the suppression window; the payload was kept as the
    /// trailing candidate. `trailing_at` is when the window ends.
    Suppressed { trailing_at: f64 },
}

/// Leading-edge throttle with a trailing call.
///
/// The first call of a burst runs immediately and opens a suppression
/// window of `limit_ms`. Calls inside the window are swallowed, but the
/// most recent payload is kept; when the window closes it runs exactly
/// once. An invocation on either edge restarts the window.
#[derive(Debug)]
pub struct Throttle<T> {
    limit_ms: f64,
    window_until: Option<f64>,
    trailing: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(limit_ms: f64) -> Self {
        Self {
            limit_ms,
            window_until: None,
            trailing: None,
        }
    }

    pub fn call(&mut self, now_ms: f64, payload: T) -> ThrottleDecision<T> {
        match self.window_until {
            Some(until) if now_ms < until => {
                self.trailing = Some(payload);
                ThrottleDecision::Suppressed { trailing_at: until }
            }
            _ => {
                self.window_until = Some(now_ms + self.limit_ms);
                self.trailing = None;
                ThrottleDecision::Invoke(payload)
            }
        }
    }

    /// Close the window at `now_ms`: if any call was suppressed, its
    /// payload comes back for the trailing invocation, which itself
    /// restarts the window.
    pub fn trailing_fire(&mut self, now_ms: f64) -> Option<T> {
        let payload = self.trailing.take()?;
        self.window_until = Some(now_ms + self.limit_ms);
        Some(payload)
    }

    pub fn has_trailing(&self) -> bool {
        self.trailing.is_some()
    }
}
