//! Headless viewport watcher.
//!
//! Hosts with a native intersection primitive feed entries straight into the
//! page context. Without one (tests, fixtures, server-side simulation) this
//! tracker derives the same entries from element bounds and the viewport.
//!
//! Delivery follows host semantics: the first computation after an element
//! is observed always produces an entry, and afterwards an entry is produced
//! only when the element's intersecting state flips.

use hashbrown::HashMap;

use crate::document::Document;
use crate::geometry::{intersection_ratio, Viewport};
use crate::ids::{ElementId, ObserverId};
use crate::observer::{IntersectionEntry, ObserverOptions, ObserverRegistry};

#[derive(Debug, Default)]
pub struct IntersectionTracker {
    viewport: Viewport,
    last: HashMap<(ObserverId, ElementId), bool>,
}

/// Entries for one observer, in target order.
pub type Delivery = (ObserverId, Vec<IntersectionEntry>);

/// Slack for ratios reported just under a threshold after pixel snapping.
pub const RATIO_EPSILON: f64 = 1e-6;

/// Whether `ratio` (None when not touching) satisfies `options`.
pub fn meets_threshold(ratio: Option<f64>, options: &ObserverOptions) -> bool {
    match ratio {
        None => false,
        Some(_) if options.threshold <= 0.0 => true,
        Some(r) => ratio_reaches(r, options.threshold),
    }
}

pub fn ratio_reaches(ratio: f64, threshold: f64) -> bool {
    ratio + RATIO_EPSILON >= threshold
}

impl IntersectionTracker {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Compute pending deliveries for every registered observer.
    /// Detached targets produce nothing.
    pub fn compute<D: Document>(
        &mut self,
        registry: &ObserverRegistry<D>,
        document: &D,
        now_ms: u64,
    ) -> Vec<Delivery> {
        let view = self.viewport.rect();
        let mut out = Vec::new();
        for observer in registry.iter() {
            let root = observer.options.root_margin.expand(view);
            let mut entries = Vec::new();
            for &target in &observer.targets {
                let Some(bounds) = document.bounds(target) else {
                    continue;
                };
                let ratio = intersection_ratio(bounds, root);
                let is_intersecting = meets_threshold(ratio, &observer.options);
                let prev = self.last.insert((observer.id, target), is_intersecting);
                if prev == Some(is_intersecting) {
                    continue;
                }
                entries.push(IntersectionEntry {
                    target,
                    is_intersecting,
                    ratio: ratio.unwrap_or(0.0),
                    bounds,
                    time_ms: now_ms,
                });
            }
            if !entries.is_empty() {
                out.push((observer.id, entries));
            }
        }
        out
    }

    pub fn forget_element(&mut self, element: ElementId) {
        self.last.retain(|(_, e), _| *e != element);
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RootMargin;

    #[test]
    fn threshold_rules() {
        let half = ObserverOptions::with_threshold(0.5);
        assert!(!meets_threshold(None, &half));
        assert!(!meets_threshold(Some(0.49), &half));
        assert!(meets_threshold(Some(0.5), &half));
        assert!(meets_threshold(Some(0.5 - 1e-9), &half));
        assert!(!meets_threshold(Some(0.5 - 1e-4), &half));
        let zero = ObserverOptions {
            threshold: 0.0,
            root_margin: RootMargin::ZERO,
        };
        assert!(meets_threshold(Some(0.0), &zero));
        assert!(!meets_threshold(None, &zero));
    }
}
