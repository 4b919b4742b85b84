//! Browser adapter for pagecue.
//!
//! `PageCue` owns a [`PageContext`] over the live DOM, wires one native
//! `IntersectionObserver` per registered observer, forwards window and
//! document events, and drives simulated time from `performance.now()`.
//! Host requests emitted by the core (navigation, smooth scrolling) are
//! carried out after every call into it.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Array;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Element, Event, EventTarget, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, KeyboardEvent, ScrollBehavior, ScrollIntoViewOptions,
    ScrollLogicalPosition, Window,
};

use pagecue_core::counter::TICK_MS;
use pagecue_core::tracker::ratio_reaches;
use pagecue_core::{
    Config, HostRequest, IntersectionEntry, ObserverSummary, PageContext, PageEvent, Rect,
};

mod dom;
mod logger;

pub use dom::DomDocument;

type Shared = Rc<RefCell<PageContext<DomDocument>>>;

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn js_error(what: &str, e: JsValue) -> JsError {
    JsError::new(&format!("{what} error: {e:?}"))
}

struct Watcher {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    capture: bool,
    callback: Closure<dyn FnMut(Event)>,
}

struct Clock {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
pub struct PageCue {
    ctx: Shared,
    window: Window,
    watchers: Vec<Watcher>,
    listeners: Vec<Listener>,
    clock: Option<Clock>,
}

#[wasm_bindgen]
impl PageCue {
    /// Create a page context over `window.document`. Pass a config object or
    /// undefined/null for the defaults.
    /// Example:
    ///   new PageCue({ index_mode: "snapshot", navbar: { offset_px: 80 } })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PageCue, JsError> {
        console_error_panic_hook::set_once();
        logger::init(log::LevelFilter::Info);

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        let window = web_sys::window().ok_or_else(|| JsError::new("no window available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsError::new("window has no document"))?;
        let ctx = PageContext::new(cfg, DomDocument::new(window.clone(), document))
            .map_err(|e| JsError::new(&format!("config error: {e}")))?;

        Ok(PageCue {
            ctx: Rc::new(RefCell::new(ctx)),
            window,
            watchers: Vec::new(),
            listeners: Vec::new(),
            clock: None,
        })
    }

    /// Bind every configured feature and start watching the page.
    /// Calling it again is a no-op.
    #[wasm_bindgen]
    pub fn init(&mut self) -> Result<(), JsError> {
        if self.ctx.borrow().is_initialized() {
            return Ok(());
        }
        self.ctx
            .borrow_mut()
            .init()
            .map_err(|e| JsError::new(&format!("init error: {e}")))?;
        self.watch()?;
        self.listen()?;
        self.start_clock()?;
        Ok(())
    }

    /// Move time forward by hand, for hosts that pause the built-in clock.
    /// Returns the number of timer callbacks run.
    #[wasm_bindgen]
    pub fn advance(&mut self, dt_ms: f64) -> u32 {
        let fired = self.ctx.borrow_mut().advance(dt_ms.max(0.0) as u64);
        flush_requests(&self.ctx, &self.window);
        fired as u32
    }

    /// Feed an event object such as `{ type: "key_down", key: "Escape" }`.
    /// Returns the outcome (`"ignored"`, `"handled"` or `"prevent_default"`).
    #[wasm_bindgen(js_name = handle_event)]
    pub fn handle_event(&mut self, event: JsValue) -> Result<JsValue, JsError> {
        let event: PageEvent =
            swb::from_value(event).map_err(|e| JsError::new(&format!("event error: {e}")))?;
        let outcome = self.ctx.borrow_mut().handle(event);
        flush_requests(&self.ctx, &self.window);
        swb::to_value(&outcome).map_err(|e| JsError::new(&format!("outcome error: {e}")))
    }

    #[wasm_bindgen(js_name = open_modal)]
    pub fn open_modal(&mut self, id: String, content: Option<String>) -> bool {
        self.ctx.borrow_mut().open_modal(&id, content.as_deref())
    }

    #[wasm_bindgen(js_name = close_modal)]
    pub fn close_modal(&mut self, id: String) -> bool {
        self.ctx.borrow_mut().close_modal(&id)
    }

    /// Open modal ids, oldest first.
    #[wasm_bindgen(js_name = open_modals)]
    pub fn open_modals(&self) -> Vec<String> {
        self.ctx
            .borrow()
            .modals()
            .open_ids()
            .map(str::to_string)
            .collect()
    }

    /// Snapshot of the observer registry.
    #[wasm_bindgen]
    pub fn observers(&self) -> Result<JsValue, JsError> {
        let summaries: Vec<ObserverSummary> = self.ctx.borrow().observers();
        swb::to_value(&summaries).map_err(|e| JsError::new(&format!("observers error: {e}")))
    }

    #[wasm_bindgen(js_name = now_ms)]
    pub fn now_ms(&self) -> f64 {
        self.ctx.borrow().now_ms() as f64
    }

    #[wasm_bindgen(js_name = native_observers)]
    pub fn native_observers(&self) -> u32 {
        self.watchers.len() as u32
    }

    #[wasm_bindgen(js_name = pending_tasks)]
    pub fn pending_tasks(&self) -> u32 {
        self.ctx.borrow().pending_tasks() as u32
    }

    /// Set the console log level (`"off"`, `"error"`, ... `"trace"`).
    #[wasm_bindgen(js_name = set_log_level)]
    pub fn set_log_level(&self, level: String) -> Result<(), JsError> {
        let filter = logger::parse_level(&level)
            .ok_or_else(|| JsError::new(&format!("unknown log level '{level}'")))?;
        logger::init(filter);
        Ok(())
    }

    /// Stop watching, cancel all pending work and close open modals.
    #[wasm_bindgen]
    pub fn teardown(&mut self) {
        self.detach();
        self.ctx.borrow_mut().teardown();
    }
}

impl PageCue {
    /// One native observer per registered observer, including ones whose
    /// query matched nothing.
    fn watch(&mut self) -> Result<(), JsError> {
        let summaries = self.ctx.borrow().observers();
        for summary in summaries {
            let ctx = self.ctx.clone();
            let window = self.window.clone();
            let id = summary.id;
            let threshold = summary.threshold;
            let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
                move |entries: Array, _: IntersectionObserver| {
                    let Ok(mut page) = ctx.try_borrow_mut() else {
                        log::warn!("intersection delivery dropped: context busy");
                        return;
                    };
                    let converted: Vec<IntersectionEntry> = entries
                        .iter()
                        .filter_map(|v| v.dyn_into::<IntersectionObserverEntry>().ok())
                        .map(|e| convert_entry(page.document(), &window, &e, threshold))
                        .collect();
                    page.deliver(id, &converted);
                    drop(page);
                    flush_requests(&ctx, &window);
                },
            );

            let init = IntersectionObserverInit::new();
            init.set_threshold(&JsValue::from_f64(summary.threshold));
            init.set_root_margin(&summary.root_margin);
            let observer =
                IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                    .map_err(|e| js_error("IntersectionObserver", e))?;
            {
                let page = self.ctx.borrow();
                for target in &summary.targets {
                    if let Some(el) = page.document().element(*target) {
                        observer.observe(&el);
                    }
                }
            }
            self.watchers.push(Watcher {
                observer,
                _callback: callback,
            });
        }
        log::debug!("pagecue: {} native observers attached", self.watchers.len());
        Ok(())
    }

    fn listen(&mut self) -> Result<(), JsError> {
        let window: EventTarget = self.window.clone().into();
        let document: EventTarget = self
            .window
            .document()
            .ok_or_else(|| JsError::new("window has no document"))?
            .into();

        self.add_listener(&window, "scroll", false, |_, w, _| {
            Some(PageEvent::Scroll {
                y: w.scroll_y().unwrap_or(0.0),
            })
        })?;
        self.add_listener(&document, "click", false, |doc, _, ev| {
            target_element(ev).map(|el| PageEvent::Click {
                target: doc.id_of(&el),
            })
        })?;
        self.add_listener(&document, "keydown", false, |_, _, ev| {
            ev.dyn_ref::<KeyboardEvent>()
                .map(|k| PageEvent::KeyDown { key: k.key() })
        })?;
        // enter/leave do not bubble; catch them on the way down
        self.add_listener(&document, "pointerenter", true, |doc, _, ev| {
            target_element(ev).map(|el| PageEvent::PointerEnter {
                target: doc.id_of(&el),
            })
        })?;
        self.add_listener(&document, "pointerleave", true, |doc, _, ev| {
            target_element(ev).map(|el| PageEvent::PointerLeave {
                target: doc.id_of(&el),
            })
        })?;
        Ok(())
    }

    fn add_listener<F>(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        capture: bool,
        to_event: F,
    ) -> Result<(), JsError>
    where
        F: Fn(&DomDocument, &Window, &Event) -> Option<PageEvent> + 'static,
    {
        let ctx = self.ctx.clone();
        let window = self.window.clone();
        let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let outcome = match ctx.try_borrow_mut() {
                Ok(mut page) => match to_event(page.document(), &window, &event) {
                    Some(page_event) => page.handle(page_event),
                    None => return,
                },
                Err(_) => return,
            };
            if outcome.prevents_default() {
                event.prevent_default();
            }
            flush_requests(&ctx, &window);
        });
        target
            .add_event_listener_with_callback_and_bool(
                kind,
                callback.as_ref().unchecked_ref(),
                capture,
            )
            .map_err(|e| js_error(kind, e))?;
        self.listeners.push(Listener {
            target: target.clone(),
            kind,
            capture,
            callback,
        });
        Ok(())
    }

    fn start_clock(&mut self) -> Result<(), JsError> {
        let performance = self
            .window
            .performance()
            .ok_or_else(|| JsError::new("performance API unavailable"))?;
        let ctx = self.ctx.clone();
        let window = self.window.clone();
        let mut last = performance.now();
        let callback = Closure::<dyn FnMut()>::new(move || {
            let dt = (performance.now() - last).max(0.0).floor();
            if dt < 1.0 {
                return;
            }
            match ctx.try_borrow_mut() {
                Ok(mut page) => {
                    page.advance(dt as u64);
                }
                Err(_) => return,
            }
            last += dt;
            flush_requests(&ctx, &window);
        });
        let handle = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                TICK_MS as i32,
            )
            .map_err(|e| js_error("setInterval", e))?;
        self.clock = Some(Clock {
            handle,
            _callback: callback,
        });
        Ok(())
    }

    fn detach(&mut self) {
        for w in self.watchers.drain(..) {
            w.observer.disconnect();
        }
        for l in self.listeners.drain(..) {
            let _ = l.target.remove_event_listener_with_callback_and_bool(
                l.kind,
                l.callback.as_ref().unchecked_ref(),
                l.capture,
            );
        }
        if let Some(clock) = self.clock.take() {
            self.window.clear_interval_with_handle(clock.handle);
        }
    }
}

impl Drop for PageCue {
    fn drop(&mut self) {
        self.detach();
    }
}

fn target_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

/// Native entries report `isIntersecting` for any overlap; the core expects
/// it to mean the threshold was reached.
fn convert_entry(
    doc: &DomDocument,
    window: &Window,
    entry: &IntersectionObserverEntry,
    threshold: f64,
) -> IntersectionEntry {
    let r = entry.bounding_client_rect();
    let sx = window.scroll_x().unwrap_or(0.0);
    let sy = window.scroll_y().unwrap_or(0.0);
    let ratio = entry.intersection_ratio();
    IntersectionEntry {
        target: doc.id_of(&entry.target()),
        is_intersecting: entry.is_intersecting() && ratio_reaches(ratio, threshold),
        ratio,
        bounds: Rect::new(r.x() + sx, r.y() + sy, r.width(), r.height()),
        time_ms: entry.time().max(0.0) as u64,
    }
}

/// Carry out whatever the core asked the host to do.
fn flush_requests(ctx: &Shared, window: &Window) {
    let (requests, elements) = {
        let Ok(mut page) = ctx.try_borrow_mut() else {
            return;
        };
        let requests = page.drain_requests();
        let elements: Vec<Option<Element>> = requests
            .iter()
            .map(|req| match req {
                HostRequest::ScrollIntoView { element } => page.document().element(*element),
                HostRequest::Navigate { .. } => None,
            })
            .collect();
        (requests, elements)
    };
    for (req, el) in requests.into_iter().zip(elements) {
        match req {
            HostRequest::Navigate { href } => {
                if let Err(e) = window.location().set_href(&href) {
                    log::warn!("navigation to {href} failed: {e:?}");
                }
            }
            HostRequest::ScrollIntoView { .. } => {
                if let Some(el) = el {
                    let opts = ScrollIntoViewOptions::new();
                    opts.set_behavior(ScrollBehavior::Smooth);
                    opts.set_block(ScrollLogicalPosition::Start);
                    el.scroll_into_view_with_scroll_into_view_options(&opts);
                }
            }
        }
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    pagecue_core::ABI_VERSION
}
