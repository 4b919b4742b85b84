//! Scroll observer factory: registrations, intersection entries and dispatch.
//!
//! An observer snapshots the elements matching its selector when it is
//! created and never re-queries; elements added later are not observed.
//! Each registration stands for one shared host watcher over all of its
//! targets. Raw observers invoke their callback for every intersecting entry
//! of every delivery; once-observers additionally consult the [`FiredSet`]
//! so a given element triggers at most one callback over the page lifetime.

use hashbrown::HashSet;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{CueError, Result};
use crate::geometry::{Rect, RootMargin};
use crate::ids::{ElementId, ObserverId};
use crate::selector::Selector;
use crate::stage::Stage;
use crate::timers::TimerQueue;

pub const DEFAULT_THRESHOLD: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverOptions {
    /// Fraction of the element's area that must be visible, in [0, 1].
    pub threshold: f64,
    pub root_margin: RootMargin,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            root_margin: RootMargin::ZERO,
        }
    }
}

impl ObserverOptions {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(CueError::Threshold {
                value: self.threshold,
            });
        }
        Ok(())
    }
}

/// One element's intersection state as reported by a watcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntersectionEntry {
    pub target: ElementId,
    pub is_intersecting: bool,
    pub ratio: f64,
    pub bounds: Rect,
    pub time_ms: u64,
}

/// Mutable access handed to observer callbacks.
pub struct Scope<'a, D: Document> {
    pub stage: &'a mut Stage<D>,
    pub timers: &'a mut TimerQueue<Stage<D>>,
}

impl<D: Document> Scope<'_, D> {
    pub fn document(&self) -> &D {
        &self.stage.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.stage.document
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }
}

pub type OnEnter<D> = Box<dyn FnMut(&mut Scope<'_, D>, ElementId, &IntersectionEntry)>;

pub struct Observer<D: Document> {
    pub id: ObserverId,
    pub selector: Selector,
    pub options: ObserverOptions,
    /// Elements matched at registration time, in document order.
    pub targets: Vec<ElementId>,
    pub once: bool,
    on_enter: OnEnter<D>,
}

impl<D: Document> Observer<D> {
    pub(crate) fn new(
        id: ObserverId,
        selector: Selector,
        options: ObserverOptions,
        targets: Vec<ElementId>,
        once: bool,
        on_enter: OnEnter<D>,
    ) -> Self {
        Self {
            id,
            selector,
            options,
            targets,
            once,
            on_enter,
        }
    }

    pub fn handle(&self) -> ObserverHandle {
        ObserverHandle {
            id: self.id,
            targets: self.targets.len(),
        }
    }

    pub fn summary(&self) -> ObserverSummary {
        ObserverSummary {
            id: self.id,
            selector: self.selector.to_string(),
            threshold: self.options.threshold,
            root_margin: self.options.root_margin.to_string(),
            targets: self.targets.clone(),
            once: self.once,
        }
    }

    /// Run the callback for each intersecting entry that targets this observer.
    pub(crate) fn dispatch(
        &mut self,
        fired: &mut FiredSet,
        scope: &mut Scope<'_, D>,
        entries: &[IntersectionEntry],
    ) -> usize {
        let mut calls = 0;
        for entry in entries {
            if !entry.is_intersecting || !self.targets.contains(&entry.target) {
                continue;
            }
            if self.once && !fired.mark(self.id, entry.target) {
                trace!("observer {:?}: {:?} already fired", self.id, entry.target);
                continue;
            }
            (self.on_enter)(scope, entry.target, entry);
            calls += 1;
        }
        calls
    }
}

impl<D: Document> std::fmt::Debug for Observer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("selector", &self.selector.as_str())
            .field("options", &self.options)
            .field("targets", &self.targets.len())
            .field("once", &self.once)
            .finish()
    }
}

/// Returned from `observe`; identifies the registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverHandle {
    pub id: ObserverId,
    /// Number of elements observed.
    pub targets: usize,
}

/// Serializable view of a registration, for hosts and debugging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObserverSummary {
    pub id: ObserverId,
    pub selector: String,
    pub threshold: f64,
    pub root_margin: String,
    pub targets: Vec<ElementId>,
    pub once: bool,
}

/// Observers owned by one page context, in registration order.
pub struct ObserverRegistry<D: Document> {
    observers: Vec<Observer<D>>,
}

impl<D: Document> Default for ObserverRegistry<D> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<D: Document> ObserverRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Observer<D>) -> ObserverHandle {
        let handle = observer.handle();
        self.observers.push(observer);
        handle
    }

    pub fn get(&self, id: ObserverId) -> Option<&Observer<D>> {
        self.observers.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObserverId) -> Option<&mut Observer<D>> {
        self.observers.iter_mut().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observer<D>> {
        self.observers.iter()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn summaries(&self) -> Vec<ObserverSummary> {
        self.observers.iter().map(Observer::summary).collect()
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

/// One-shot markers keyed by (observer, element).
#[derive(Default, Debug, Clone)]
pub struct FiredSet {
    fired: HashSet<(ObserverId, ElementId)>,
}

impl FiredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the marker. Returns true only the first time for a given pair.
    pub fn mark(&mut self, observer: ObserverId, element: ElementId) -> bool {
        self.fired.insert((observer, element))
    }

    pub fn contains(&self, observer: ObserverId, element: ElementId) -> bool {
        self.fired.contains(&(observer, element))
    }

    /// Forget all markers for a disposed element.
    pub fn forget_element(&mut self, element: ElementId) {
        self.fired.retain(|(_, e)| *e != element);
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    fn entry(target: ElementId, is_intersecting: bool) -> IntersectionEntry {
        IntersectionEntry {
            target,
            is_intersecting,
            ratio: if is_intersecting { 1.0 } else { 0.0 },
            bounds: Rect::default(),
            time_ms: 0,
        }
    }

    fn counting_observer(once: bool, targets: Vec<ElementId>) -> Observer<MemoryDocument> {
        Observer::new(
            ObserverId(7),
            Selector::parse(".x").unwrap(),
            ObserverOptions::default(),
            targets,
            once,
            Box::new(|scope: &mut Scope<'_, MemoryDocument>, el: ElementId, _: &IntersectionEntry| {
                let n = scope.document().text(el).unwrap_or_default().len();
                scope.document_mut().set_text(el, &"x".repeat(n + 1));
            }),
        )
    }

    #[test]
    fn options_validate_threshold() {
        assert!(ObserverOptions::default().validate().is_ok());
        assert!(ObserverOptions::with_threshold(1.0).validate().is_ok());
        assert!(ObserverOptions::with_threshold(1.5).validate().is_err());
        assert!(ObserverOptions::with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn raw_observer_fires_per_delivery() {
        let mut stage = Stage::new(MemoryDocument::new());
        let el = stage
            .document
            .append(ElementId(0), crate::document::ElementSpec::new("div").class("x"));
        let mut timers = TimerQueue::new();
        let mut fired = FiredSet::new();
        let mut obs = counting_observer(false, vec![el]);
        for _ in 0..3 {
            let mut scope = Scope {
                stage: &mut stage,
                timers: &mut timers,
            };
            obs.dispatch(&mut fired, &mut scope, &[entry(el, true), entry(el, false)]);
        }
        assert_eq!(stage.document.text(el).as_deref(), Some("xxx"));
        assert!(fired.is_empty());
    }

    #[test]
    fn once_observer_fires_once_and_ignores_strangers() {
        let mut stage = Stage::new(MemoryDocument::new());
        let el = stage
            .document
            .append(ElementId(0), crate::document::ElementSpec::new("div").class("x"));
        let stranger = ElementId(99);
        let mut timers = TimerQueue::new();
        let mut fired = FiredSet::new();
        let mut obs = counting_observer(true, vec![el]);
        let mut calls = 0;
        for _ in 0..3 {
            let mut scope = Scope {
                stage: &mut stage,
                timers: &mut timers,
            };
            calls += obs.dispatch(&mut fired, &mut scope, &[entry(el, true), entry(stranger, true)]);
        }
        assert_eq!(calls, 1);
        assert_eq!(stage.document.text(el).as_deref(), Some("x"));
        assert!(fired.contains(ObserverId(7), el));
        fired.forget_element(el);
        assert!(fired.is_empty());
    }
}
