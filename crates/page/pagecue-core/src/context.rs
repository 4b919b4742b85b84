//! PageContext: owns the document, timers, observers and modal stack, and is
//! the single entry point hosts drive.
//!
//! Hosts call [`PageContext::init`] once, then feed it time
//! ([`PageContext::advance`]), events ([`PageContext::handle`]) and either
//! native intersection entries ([`PageContext::deliver`]) or viewport changes
//! for the headless tracker ([`PageContext::set_viewport`]).
//! [`PageContext::teardown`] cancels everything the context started.

use log::{debug, info};

use crate::bindings::{bind_bars, bind_counters, bind_reveal};
use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use crate::events::{EventOutcome, PageEvent};
use crate::geometry::Viewport;
use crate::ids::{ElementId, IdAllocator, ObserverId};
use crate::modal::ModalStack;
use crate::navigation::{self, NavbarShadow};
use crate::observer::{
    FiredSet, IntersectionEntry, Observer, ObserverHandle, ObserverOptions, ObserverRegistry,
    ObserverSummary, Scope,
};
use crate::selector::Selector;
use crate::stage::{HostRequest, Stage};
use crate::timers::TimerQueue;
use crate::tracker::IntersectionTracker;

pub struct PageContext<D: Document> {
    cfg: Config,
    ids: IdAllocator,
    stage: Stage<D>,
    timers: TimerQueue<Stage<D>>,
    observers: ObserverRegistry<D>,
    fired: FiredSet,
    tracker: IntersectionTracker,
    modals: ModalStack,
    navbar: Option<NavbarShadow>,
    selectors: Selectors,
    initialized: bool,
}

/// Pre-parsed selectors used by event handling.
#[derive(Debug, Clone)]
struct Selectors {
    modal: Selector,
    modal_close: Selector,
    anchor: Selector,
    page_link: Selector,
    glow: Selector,
}

impl Selectors {
    fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            modal: Selector::parse(&cfg.modals.selector)?,
            modal_close: Selector::parse(&cfg.modals.close_selector)?,
            anchor: Selector::parse(&cfg.anchors.selector)?,
            page_link: Selector::parse(&cfg.transitions.link_selector)?,
            glow: Selector::parse(&cfg.glow.selector)?,
        })
    }
}

impl<D: Document> std::fmt::Debug for PageContext<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("now_ms", &self.timers.now_ms())
            .field("observers", &self.observers.len())
            .field("pending_tasks", &self.timers.len())
            .field("open_modals", &self.modals.len())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl<D: Document> PageContext<D> {
    /// Create a context over `document`. Validates the configuration.
    pub fn new(cfg: Config, document: D) -> Result<Self> {
        cfg.validate()?;
        let selectors = Selectors::new(&cfg)?;
        Ok(Self {
            modals: ModalStack::new(&cfg.modals),
            selectors,
            cfg,
            ids: IdAllocator::new(),
            stage: Stage::new(document),
            timers: TimerQueue::new(),
            observers: ObserverRegistry::new(),
            fired: FiredSet::new(),
            tracker: IntersectionTracker::default(),
            navbar: None,
            initialized: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn document(&self) -> &D {
        &self.stage.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.stage.document
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn pending_tasks(&self) -> usize {
        self.timers.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Wire every configured feature. Calling it again is a no-op.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        info!("pagecue: initializing");

        navigation::mark_loaded(&mut self.stage.document, &self.cfg.transitions);
        self.navbar = Some(NavbarShadow::new(&self.cfg.navbar, &self.stage.document));

        let counters = self.cfg.counters.clone();
        bind_counters(self, &counters)?;

        let mode = self.cfg.index_mode;
        for binding in self.cfg.reveals.clone() {
            bind_reveal(self, &binding, mode)?;
        }

        let bars = self.cfg.bars.clone();
        bind_bars(self, &bars)?;

        self.initialized = true;
        info!("pagecue: {} observers registered", self.observers.len());
        Ok(())
    }

    /// Observe `selector`, invoking `on_enter` for every intersecting entry
    /// of every delivery. `options` defaults to the configured observer options.
    pub fn observe<F>(
        &mut self,
        selector: &str,
        options: Option<ObserverOptions>,
        on_enter: F,
    ) -> Result<ObserverHandle>
    where
        F: FnMut(&mut Scope<'_, D>, ElementId, &IntersectionEntry) + 'static,
    {
        let selector = Selector::parse(selector)?;
        let options = options.unwrap_or(self.cfg.observer);
        self.register(selector, options, false, Box::new(on_enter))
    }

    /// Like [`observe`](Self::observe), but `on_enter` runs at most once per element.
    pub fn observe_once<F>(
        &mut self,
        selector: &str,
        options: Option<ObserverOptions>,
        on_enter: F,
    ) -> Result<ObserverHandle>
    where
        F: FnMut(&mut Scope<'_, D>, ElementId, &IntersectionEntry) + 'static,
    {
        let selector = Selector::parse(selector)?;
        let options = options.unwrap_or(self.cfg.observer);
        self.register(selector, options, true, Box::new(on_enter))
    }

    pub(crate) fn observe_once_with<F>(
        &mut self,
        selector: Selector,
        options: ObserverOptions,
        on_enter: F,
    ) -> Result<ObserverHandle>
    where
        F: FnMut(&mut Scope<'_, D>, ElementId, &IntersectionEntry) + 'static,
    {
        self.register(selector, options, true, Box::new(on_enter))
    }

    fn register(
        &mut self,
        selector: Selector,
        options: ObserverOptions,
        once: bool,
        on_enter: crate::observer::OnEnter<D>,
    ) -> Result<ObserverHandle> {
        options.validate()?;
        let targets = self.stage.document.query_all(&selector);
        if targets.is_empty() {
            debug!("observer on `{selector}` has no targets and will never fire");
        }
        let id = self.ids.alloc_observer();
        let observer = Observer::new(id, selector, options, targets, once, on_enter);
        Ok(self.observers.register(observer))
    }

    /// Registered observers, for hosts wiring native watchers and for debugging.
    pub fn observers(&self) -> Vec<ObserverSummary> {
        self.observers.summaries()
    }

    /// Feed entries from the host watcher behind `observer`.
    /// Returns how many callbacks ran.
    pub fn deliver(&mut self, observer: ObserverId, entries: &[IntersectionEntry]) -> usize {
        let Some(obs) = self.observers.get_mut(observer) else {
            debug!("delivery for unknown observer {observer:?} dropped");
            return 0;
        };
        let mut scope = Scope {
            stage: &mut self.stage,
            timers: &mut self.timers,
        };
        obs.dispatch(&mut self.fired, &mut scope, entries)
    }

    pub fn viewport(&self) -> Viewport {
        self.tracker.viewport()
    }

    /// Headless hosts: move the viewport and deliver whatever changed.
    pub fn set_viewport(&mut self, viewport: Viewport) -> usize {
        self.tracker.set_viewport(viewport);
        self.refresh_intersections()
    }

    /// Headless hosts: scroll to `y`, update intersections and raise a
    /// scroll event.
    pub fn scroll_to(&mut self, y: f64) -> usize {
        let vp = self.tracker.viewport();
        let calls = self.set_viewport(vp.scrolled_to(vp.scroll_x, y));
        self.handle(PageEvent::Scroll { y });
        calls
    }

    /// Recompute intersections with the headless tracker and dispatch them.
    pub fn refresh_intersections(&mut self) -> usize {
        let now = self.timers.now_ms();
        let deliveries = self
            .tracker
            .compute(&self.observers, &self.stage.document, now);
        deliveries
            .iter()
            .map(|(id, entries)| self.deliver(*id, entries))
            .sum()
    }

    /// Advance simulated time, running due timers. Returns callbacks run.
    pub fn advance(&mut self, dt_ms: u64) -> usize {
        self.timers.advance(dt_ms, &mut self.stage)
    }

    /// Requests queued for the host since the last drain.
    pub fn drain_requests(&mut self) -> Vec<HostRequest> {
        self.stage.drain_requests()
    }

    pub fn handle(&mut self, event: PageEvent) -> EventOutcome {
        match event {
            PageEvent::Scroll { y } => match self.navbar.as_mut() {
                Some(nav) => nav.on_scroll(&mut self.timers, y),
                None => EventOutcome::Ignored,
            },
            PageEvent::KeyDown { key } => {
                if key != self.cfg.modals.close_key {
                    return EventOutcome::Ignored;
                }
                match self.modals.close_top(&mut self.stage.document) {
                    Some(_) => EventOutcome::Handled,
                    None => EventOutcome::Ignored,
                }
            }
            PageEvent::Click { target } => self.click(target),
            PageEvent::PointerEnter { target } => self.hover(target, true),
            PageEvent::PointerLeave { target } => self.hover(target, false),
        }
    }

    fn click(&mut self, target: ElementId) -> EventOutcome {
        let doc = &self.stage.document;
        let mut outcome = EventOutcome::Ignored;

        if let Some(close) = doc.closest(target, &self.selectors.modal_close) {
            if let Some(modal) = doc.closest(close, &self.selectors.modal) {
                if let Some(id) = doc.dom_id(modal) {
                    self.modals.close(&mut self.stage.document, &id);
                    outcome = EventOutcome::Handled;
                }
            }
        } else if doc.matches(target, &self.selectors.modal) {
            // backdrop click: the modal element itself, not its content
            if let Some(id) = doc.dom_id(target) {
                self.modals.close(&mut self.stage.document, &id);
                outcome = EventOutcome::Handled;
            }
        }

        let doc = &self.stage.document;
        if let Some(anchor) = doc.closest(target, &self.selectors.anchor) {
            return navigation::anchor_click(&mut self.stage, anchor).max_with(outcome);
        }
        if let Some(link) = doc.closest(target, &self.selectors.page_link) {
            return navigation::transition_click(
                &mut self.stage,
                &mut self.timers,
                link,
                &self.cfg.transitions,
            )
            .max_with(outcome);
        }
        outcome
    }

    fn hover(&mut self, target: ElementId, on: bool) -> EventOutcome {
        if !self.stage.document.matches(target, &self.selectors.glow) {
            return EventOutcome::Ignored;
        }
        navigation::glow(&mut self.stage.document, target, &self.cfg.glow, on)
    }

    /// Open a modal by DOM id, optionally replacing its body HTML.
    pub fn open_modal(&mut self, id: &str, content: Option<&str>) -> bool {
        self.modals.open(&mut self.stage.document, id, content)
    }

    pub fn close_modal(&mut self, id: &str) -> bool {
        self.modals.close(&mut self.stage.document, id)
    }

    pub fn modals(&self) -> &ModalStack {
        &self.modals
    }

    /// Remove `element` from the document and cancel the work pending on it.
    /// Returns the number of cancelled tasks.
    pub fn dispose_element(&mut self, element: ElementId) -> usize {
        // removal detaches the subtree, so collect it first
        let mut subtree = vec![element];
        subtree.extend(self.stage.document.descendants(element));
        let mut cancelled = 0;
        for &el in &subtree {
            cancelled += self.timers.cancel_owned_by(el);
            self.fired.forget_element(el);
            self.tracker.forget_element(el);
        }
        self.stage.document.remove(element);
        if cancelled > 0 {
            debug!("disposed {element:?}, cancelled {cancelled} pending tasks");
        }
        cancelled
    }

    /// Cancel all timers, drop every observer and close all modals.
    /// The context can be initialized again afterwards.
    pub fn teardown(&mut self) {
        if let Some(nav) = self.navbar.as_mut() {
            nav.cancel(&mut self.timers);
        }
        self.navbar = None;
        self.timers.clear();
        self.observers.clear();
        self.fired.clear();
        self.tracker.clear();
        let open: Vec<String> = self.modals.open_ids().map(str::to_string).collect();
        for id in open.iter().rev() {
            self.modals.close(&mut self.stage.document, id);
        }
        self.modals.clear();
        self.stage.document.set_scroll_lock(false);
        self.initialized = false;
        info!("pagecue: torn down");
    }
}
