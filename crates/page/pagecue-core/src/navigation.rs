//! Small page behaviors: navbar shadow, in-page anchors, page transitions
//! and icon glows. None of them keep state beyond the navbar's debounce.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::debounce::Debouncer;
use crate::document::Document;
use crate::events::EventOutcome;
use crate::ids::ElementId;
use crate::stage::{HostRequest, Stage};
use crate::timers::TimerQueue;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavbarConfig {
    pub element_id: String,
    pub scrolled_class: String,
    /// Scroll offset beyond which the navbar counts as scrolled.
    pub offset_px: f64,
    pub debounce_ms: u64,
}

impl Default for NavbarConfig {
    fn default() -> Self {
        Self {
            element_id: "navbar".to_string(),
            scrolled_class: "scrolled".to_string(),
            offset_px: 50.0,
            debounce_ms: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub selector: String,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            selector: r##"a[href^="#"]"##.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub link_selector: String,
    pub delay_ms: u64,
    pub loaded_class: String,
    pub transitioning_class: String,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            link_selector: r#"a[href$=".html"]"#.to_string(),
            delay_ms: 300,
            loaded_class: "page-loaded".to_string(),
            transitioning_class: "page-transitioning".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowConfig {
    pub selector: String,
    pub class: String,
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            selector: ".finding-icon, .objective-number, .citation-number".to_string(),
            class: "glow".to_string(),
        }
    }
}

/// Toggles the navbar's scrolled class from debounced scroll offsets.
#[derive(Debug, Clone)]
pub struct NavbarShadow {
    navbar: Option<ElementId>,
    class: String,
    offset_px: f64,
    debounce: Debouncer,
}

impl NavbarShadow {
    pub fn new<D: Document>(cfg: &NavbarConfig, doc: &D) -> Self {
        let navbar = doc.by_id(&cfg.element_id);
        if navbar.is_none() {
            debug!("navbar `#{}` not found; scroll shadow disabled", cfg.element_id);
        }
        Self {
            navbar,
            class: cfg.scrolled_class.clone(),
            offset_px: cfg.offset_px,
            debounce: Debouncer::new(cfg.debounce_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.navbar.is_some()
    }

    pub fn on_scroll<D: Document>(&mut self, timers: &mut TimerQueue<Stage<D>>, y: f64) -> EventOutcome {
        let Some(navbar) = self.navbar else {
            return EventOutcome::Ignored;
        };
        let class = self.class.clone();
        let scrolled = y > self.offset_px;
        self.debounce.call(timers, move |stage: &mut Stage<D>| {
            if scrolled {
                stage.document.add_class(navbar, &class);
            } else {
                stage.document.remove_class(navbar, &class);
            }
        });
        EventOutcome::Handled
    }

    pub fn cancel<D: Document>(&mut self, timers: &mut TimerQueue<Stage<D>>) {
        self.debounce.cancel(timers);
    }
}

/// Click on an in-page anchor. A bare `#` is left to the browser; any other
/// fragment suppresses the jump and asks the host to scroll smoothly to the
/// target, if it exists.
pub fn anchor_click<D: Document>(stage: &mut Stage<D>, anchor: ElementId) -> EventOutcome {
    let Some(href) = stage.document.attribute(anchor, "href") else {
        return EventOutcome::Ignored;
    };
    if href == "#" {
        return EventOutcome::Ignored;
    }
    let fragment = href.trim_start_matches('#');
    match stage.document.by_id(fragment) {
        Some(element) => stage.request(HostRequest::ScrollIntoView { element }),
        None => debug!("anchor `{href}` has no target"),
    }
    EventOutcome::PreventDefault
}

/// Add the loaded class to the body.
pub fn mark_loaded<D: Document>(doc: &mut D, cfg: &TransitionConfig) {
    if let Some(body) = doc.body() {
        doc.add_class(body, &cfg.loaded_class);
    }
}

/// Click on a same-window page link: fade the body out and navigate after
/// the configured delay. Links with a `target` attribute are left alone.
pub fn transition_click<D: Document>(
    stage: &mut Stage<D>,
    timers: &mut TimerQueue<Stage<D>>,
    link: ElementId,
    cfg: &TransitionConfig,
) -> EventOutcome {
    if stage
        .document
        .attribute(link, "target")
        .is_some_and(|t| !t.is_empty())
    {
        return EventOutcome::Ignored;
    }
    let Some(href) = stage.document.attribute(link, "href").filter(|h| !h.is_empty()) else {
        return EventOutcome::Ignored;
    };
    if let Some(body) = stage.document.body() {
        stage.document.add_class(body, &cfg.transitioning_class);
    }
    timers.set_timeout(cfg.delay_ms, None, move |stage: &mut Stage<D>| {
        stage.request(HostRequest::Navigate { href: href.clone() })
    });
    EventOutcome::PreventDefault
}

pub fn glow<D: Document>(doc: &mut D, icon: ElementId, cfg: &GlowConfig, on: bool) -> EventOutcome {
    if on {
        doc.add_class(icon, &cfg.class);
    } else {
        doc.remove_class(icon, &cfg.class);
    }
    EventOutcome::Handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementSpec, MemoryDocument};

    fn stage() -> Stage<MemoryDocument> {
        let mut doc = MemoryDocument::new();
        doc.append(ElementId(0), ElementSpec::new("nav").id("navbar"));
        doc.append(ElementId(0), ElementSpec::new("section").id("findings"));
        Stage::new(doc)
    }

    #[test]
    fn navbar_follows_last_offset_after_debounce() {
        let mut stage = stage();
        let mut timers = TimerQueue::new();
        let mut nav = NavbarShadow::new(&NavbarConfig::default(), &stage.document);
        let navbar = stage.document.by_id("navbar").unwrap();
        assert!(nav.is_enabled());

        nav.on_scroll(&mut timers, 120.0);
        timers.advance(5, &mut stage);
        assert!(!stage.document.has_class(navbar, "scrolled"));
        timers.advance(5, &mut stage);
        assert!(stage.document.has_class(navbar, "scrolled"));

        nav.on_scroll(&mut timers, 300.0);
        nav.on_scroll(&mut timers, 10.0);
        timers.advance(10, &mut stage);
        assert!(!stage.document.has_class(navbar, "scrolled"));

        // exactly at the offset is not scrolled
        nav.on_scroll(&mut timers, 50.0);
        timers.advance(10, &mut stage);
        assert!(!stage.document.has_class(navbar, "scrolled"));
    }

    #[test]
    fn navbar_missing_is_ignored() {
        let stage = Stage::new(MemoryDocument::new());
        let mut timers: TimerQueue<Stage<MemoryDocument>> = TimerQueue::new();
        let mut nav = NavbarShadow::new(&NavbarConfig::default(), &stage.document);
        assert_eq!(nav.on_scroll(&mut timers, 500.0), EventOutcome::Ignored);
        assert!(timers.is_empty());
    }

    #[test]
    fn anchors() {
        let mut stage = stage();
        let bare = stage
            .document
            .append(ElementId(0), ElementSpec::new("a").attr("href", "#"));
        let good = stage
            .document
            .append(ElementId(0), ElementSpec::new("a").attr("href", "#findings"));
        let dead = stage
            .document
            .append(ElementId(0), ElementSpec::new("a").attr("href", "#nowhere"));

        assert_eq!(anchor_click(&mut stage, bare), EventOutcome::Ignored);
        assert_eq!(anchor_click(&mut stage, good), EventOutcome::PreventDefault);
        assert_eq!(anchor_click(&mut stage, dead), EventOutcome::PreventDefault);
        let findings = stage.document.by_id("findings").unwrap();
        assert_eq!(
            stage.drain_requests(),
            vec![HostRequest::ScrollIntoView { element: findings }]
        );
    }

    #[test]
    fn page_transition_navigates_after_delay() {
        let mut stage = stage();
        let mut timers = TimerQueue::new();
        let cfg = TransitionConfig::default();
        let link = stage
            .document
            .append(ElementId(0), ElementSpec::new("a").attr("href", "about.html"));
        let external = stage.document.append(
            ElementId(0),
            ElementSpec::new("a")
                .attr("href", "paper.html")
                .attr("target", "_blank"),
        );

        assert_eq!(
            transition_click(&mut stage, &mut timers, external, &cfg),
            EventOutcome::Ignored
        );
        assert_eq!(
            transition_click(&mut stage, &mut timers, link, &cfg),
            EventOutcome::PreventDefault
        );
        let body = stage.document.body().unwrap();
        assert!(stage.document.has_class(body, "page-transitioning"));
        timers.advance(299, &mut stage);
        assert!(stage.pending_requests().is_empty());
        timers.advance(1, &mut stage);
        assert_eq!(
            stage.drain_requests(),
            vec![HostRequest::Navigate {
                href: "about.html".into()
            }]
        );
    }

    #[test]
    fn glow_toggles() {
        let mut stage = stage();
        let icon = stage
            .document
            .append(ElementId(0), ElementSpec::new("span").class("finding-icon"));
        let cfg = GlowConfig::default();
        glow(&mut stage.document, icon, &cfg, true);
        assert!(stage.document.has_class(icon, "glow"));
        glow(&mut stage.document, icon, &cfg, false);
        assert!(!stage.document.has_class(icon, "glow"));
    }
}
