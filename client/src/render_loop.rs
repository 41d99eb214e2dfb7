use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests into at most one `requestAnimationFrame` per vsync.
///
/// The frame callback returns `true` while it still has work (an animation
/// in flight, a viewport change waiting to settle) and is then re-armed.
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    dirty: Cell<bool>,
    scheduled: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Inner {
    fn request_frame(&self) {
        if self.scheduled.get() {
            return;
        }
        self.scheduled.set(true);
        let callback = self.callback.borrow();
        let (Some(cb), Some(window)) = (callback.as_ref(), self.window.as_ref()) else {
            self.scheduled.set(false);
            return;
        };
        match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => self.raf_id.set(Some(id)),
            Err(_) => self.scheduled.set(false),
        }
    }
}

impl RenderScheduler {
    pub fn new(frame: impl Fn() -> bool + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            dirty: Cell::new(false),
            scheduled: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let inner_cb = inner.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            inner_cb.scheduled.set(false);
            inner_cb.raf_id.set(None);
            if !inner_cb.dirty.replace(false) {
                return;
            }
            if frame() {
                inner_cb.dirty.set(true);
                inner_cb.request_frame();
            }
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    pub fn mark_dirty(&self) {
        self.inner.dirty.set(true);
        self.inner.request_frame();
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.scheduled.set(false);
        self.inner.dirty.set(false);
        // Break the callback -> inner reference cycle.
        self.inner.callback.borrow_mut().take();
    }
}
