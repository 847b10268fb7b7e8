//! Browser wrappers: a core plus a `js_sys::Function` plus a gloo timer.
//!
//! Both wrappers forward the caller's `this` and full argument list via
//! `Function::apply`, so they can stand in for the wrapped function in
//! event-handler positions.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;

use crate::{Debounce, Throttle, ThrottleDecision};

type JsPayload = (JsValue, js_sys::Array);

struct DebouncedInner {
    target: js_sys::Function,
    wait_ms: u32,
    core: RefCell<Debounce<JsPayload>>,
    timer: RefCell<Option<Timeout>>,
}

/// A debounced wrapper around a JS function: bursts of `call`s collapse
/// into one invocation `wait_ms` after the last of them.
#[wasm_bindgen]
pub struct DebouncedFunction {
    inner: Rc<DebouncedInner>,
}

#[wasm_bindgen]
impl DebouncedFunction {
    #[wasm_bindgen(constructor)]
    pub fn new(target: js_sys::Function, wait_ms: u32) -> Self {
        Self {
            inner: Rc::new(DebouncedInner {
                target,
                wait_ms,
                core: RefCell::new(Debounce::new(wait_ms as f64)),
                timer: RefCell::new(None),
            }),
        }
    }

    /// Record a call. `this_arg` and `args` reach the wrapped function
    /// unchanged if this call turns out to be the last of its burst.
    pub fn call(&self, this_arg: JsValue, args: js_sys::Array) {
        let deadline = self
            .inner
            .core
            .borrow_mut()
            .call(js_sys::Date::now(), (this_arg, args));

        let inner = Rc::clone(&self.inner);
        let timeout = Timeout::new(self.inner.wait_ms, move || {
            inner.timer.borrow_mut().take();
            // Take the payload before calling into JS: the callback may
            // synchronously call us again, and no borrow may be live then.
            let fired = inner.core.borrow_mut().fire(deadline);
            if let Some((this_arg, args)) = fired {
                if let Err(e) = inner.target.apply(&this_arg, &args) {
                    log::error!("debounced function threw: {e:?}");
                }
            }
        });
        // Replacing the previous timeout drops it, which cancels it.
        *self.inner.timer.borrow_mut() = Some(timeout);
    }

    /// Discard any pending invocation without running it.
    pub fn cancel(&self) {
        self.inner.core.borrow_mut().cancel();
        if let Some(timeout) = self.inner.timer.borrow_mut().take() {
            timeout.cancel();
        }
    }

    #[wasm_bindgen(getter)]
    pub fn pending(&self) -> bool {
        self.inner.core.borrow().is_pending()
    }
}

struct ThrottledInner {
    target: js_sys::Function,
    core: RefCell<Throttle<JsPayload>>,
    trailing_timer: RefCell<Option<Timeout>>,
}

/// A throttled wrapper around a JS function: leading edge runs
/// immediately, at most one trailing run per window with the arguments of
/// the last suppressed call.
#[wasm_bindgen]
pub struct ThrottledFunction {
    inner: Rc<ThrottledInner>,
}

#[wasm_bindgen]
impl ThrottledFunction {
    #[wasm_bindgen(constructor)]
    pub fn new(target: js_sys::Function, limit_ms: u32) -> Self {
        Self {
            inner: Rc::new(ThrottledInner {
                target,
                core: RefCell::new(Throttle::new(limit_ms as f64)),
                trailing_timer: RefCell::new(None),
            }),
        }
    }

    pub fn call(&self, this_arg: JsValue, args: js_sys::Array) {
        let now = js_sys::Date::now();
        let decision = self.inner.core.borrow_mut().call(now, (this_arg, args));
        match decision {
            ThrottleDecision::Invoke((this_arg, args)) => {
                if let Err(e) = self.inner.target.apply(&this_arg, &args) {
                    log::error!("throttled function threw: {e:?}");
                }
            }
            ThrottleDecision::Suppressed { trailing_at } => {
                if self.inner.trailing_timer.borrow().is_some() {
                    // The window's trailing timer is already armed; the
                    // core keeps only the newest payload.
                    return;
                }
                let delay = (trailing_at - now).max(0.0).ceil() as u32;
                let inner = Rc::clone(&self.inner);
                let timeout = Timeout::new(delay, move || {
                    inner.trailing_timer.borrow_mut().take();
                    let fired = inner.core.borrow_mut().trailing_fire(trailing_at);
                    if let Some((this_arg, args)) = fired {
                        if let Err(e) = inner.target.apply(&this_arg, &args) {
                            log::error!("throttled function threw: {e:?}");
                        }
                    }
                });
                *self.inner.trailing_timer.borrow_mut() = Some(timeout);
            }
        }
    }
}
