//! Feature bindings: one selector wired to one viewport-triggered behavior.
//!
//! Every staggered card reveal on the site is an instance of
//! [`RevealBinding`]; counters and racing bars have their own small
//! bindings. All of them register through `observe_once`, so the core marks
//! each element as handled the first time it becomes visible.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::context::PageContext;
use crate::counter::{self, parse_float_prefix, parse_int_prefix};
use crate::document::Document;
use crate::error::Result;
use crate::ids::ElementId;
use crate::observer::{IntersectionEntry, ObserverHandle, ObserverOptions, Scope};
use crate::selector::Selector;
use crate::stage::Stage;
use crate::stagger;

/// How a revealed element's stagger position is found.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Re-query the selector when the element fires and use its current
    /// position. Follows document changes made after binding.
    #[default]
    Live,
    /// Use the position in the set captured at bind time.
    Snapshot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealBinding {
    pub selector: String,
    pub reveal_class: String,
    #[serde(default)]
    pub stagger_ms: u64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    crate::observer::DEFAULT_THRESHOLD
}

impl RevealBinding {
    pub fn new(selector: &str, reveal_class: &str, stagger_ms: u64, threshold: f64) -> Self {
        Self {
            selector: selector.to_string(),
            reveal_class: reveal_class.to_string(),
            stagger_ms,
            threshold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterBinding {
    pub selector: String,
    pub threshold: f64,
    pub target_attr: String,
    pub duration_attr: String,
    /// Class marking a counter that has started.
    pub marker_class: String,
    pub default_duration_ms: u64,
    pub tick_ms: u64,
}

impl Default for CounterBinding {
    fn default() -> Self {
        Self {
            selector: "[data-counter]".to_string(),
            threshold: 0.5,
            target_attr: "data-counter".to_string(),
            duration_attr: "data-duration".to_string(),
            marker_class: "counted".to_string(),
            default_duration_ms: counter::DEFAULT_DURATION_MS,
            tick_ms: counter::TICK_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarBinding {
    pub selector: String,
    pub threshold: f64,
    pub width_attr: String,
    pub marker_class: String,
}

impl Default for BarBinding {
    fn default() -> Self {
        Self {
            selector: "[data-bar-width]".to_string(),
            threshold: 0.5,
            width_attr: "data-bar-width".to_string(),
            marker_class: "animated".to_string(),
        }
    }
}

/// The staggered reveals used across the site's pages.
pub fn default_reveals() -> Vec<RevealBinding> {
    vec![
        RevealBinding::new(".stat-card", "visible", 120, 0.3),
        RevealBinding::new(".comparison-card", "animated", 0, 0.15),
        RevealBinding::new(".finding-card", "visible", 150, 0.2),
        RevealBinding::new(".case-card", "visible", 200, 0.1),
        RevealBinding::new(".objective-card", "visible", 100, 0.2),
        RevealBinding::new(".takeaway-block", "visible", 120, 0.15),
        RevealBinding::new(".implication-card", "visible", 100, 0.2),
        RevealBinding::new(".citation-card", "visible", 80, 0.1),
        RevealBinding::new(".info-card", "visible", 100, 0.2),
    ]
}

/// Selectors with no matches are skipped without creating an observer.
fn matched<D: Document>(ctx: &PageContext<D>, selector: &Selector) -> bool {
    if ctx.document().query_all(selector).is_empty() {
        debug!("binding `{selector}`: no matches, skipped");
        return false;
    }
    true
}

/// Register a staggered reveal. Returns `Ok(None)` when nothing matches.
pub fn bind_reveal<D: Document>(
    ctx: &mut PageContext<D>,
    binding: &RevealBinding,
    mode: IndexMode,
) -> Result<Option<ObserverHandle>> {
    let selector = Selector::parse(&binding.selector)?;
    let options = ObserverOptions::with_threshold(binding.threshold);
    options.validate()?;
    if !matched(ctx, &selector) {
        return Ok(None);
    }
    let snapshot = ctx.document().query_all(&selector);
    let class = binding.reveal_class.clone();
    let delay = binding.stagger_ms;
    let live = selector.clone();
    let handle = ctx.observe_once_with(
        selector,
        options,
        move |scope: &mut Scope<'_, D>, el: ElementId, _: &IntersectionEntry| {
            let index = match mode {
                IndexMode::Live => scope
                    .document()
                    .query_all(&live)
                    .iter()
                    .position(|e| *e == el),
                IndexMode::Snapshot => snapshot.iter().position(|e| *e == el),
            };
            // an element that left the match-set reveals without delay
            let index = index.unwrap_or(0);
            let class = class.clone();
            stagger::schedule_at(
                &mut *scope.timers,
                el,
                index,
                delay,
                move |stage: &mut Stage<D>, el| stage.document.add_class(el, &class),
            );
        },
    )?;
    Ok(Some(handle))
}

/// Register the counter binding.
pub fn bind_counters<D: Document>(
    ctx: &mut PageContext<D>,
    binding: &CounterBinding,
) -> Result<Option<ObserverHandle>> {
    let selector = Selector::parse(&binding.selector)?;
    let options = ObserverOptions::with_threshold(binding.threshold);
    options.validate()?;
    if !matched(ctx, &selector) {
        return Ok(None);
    }
    let b = binding.clone();
    let handle = ctx.observe_once_with(
        selector,
        options,
        move |scope: &mut Scope<'_, D>, el: ElementId, _: &IntersectionEntry| {
            if scope.document().has_class(el, &b.marker_class) {
                return;
            }
            let target = scope
                .document()
                .attribute(el, &b.target_attr)
                .map(|raw| parse_float_prefix(&raw))
                .unwrap_or(f64::NAN);
            let duration = scope
                .document()
                .attribute(el, &b.duration_attr)
                .and_then(|raw| parse_int_prefix(&raw))
                .filter(|d| *d > 0)
                .map(|d| d as u64)
                .unwrap_or(b.default_duration_ms);
            counter::animate(&mut *scope.timers, el, target, duration, b.tick_ms);
            scope.document_mut().add_class(el, &b.marker_class);
        },
    )?;
    Ok(Some(handle))
}

/// Register the racing-bar binding.
pub fn bind_bars<D: Document>(
    ctx: &mut PageContext<D>,
    binding: &BarBinding,
) -> Result<Option<ObserverHandle>> {
    let selector = Selector::parse(&binding.selector)?;
    let options = ObserverOptions::with_threshold(binding.threshold);
    options.validate()?;
    if !matched(ctx, &selector) {
        return Ok(None);
    }
    let b = binding.clone();
    let handle = ctx.observe_once_with(
        selector,
        options,
        move |scope: &mut Scope<'_, D>, el: ElementId, _: &IntersectionEntry| {
            if scope.document().has_class(el, &b.marker_class) {
                return;
            }
            if let Some(width) = scope.document().attribute(el, &b.width_attr) {
                scope.document_mut().set_inline_width(el, &width);
            }
            scope.document_mut().add_class(el, &b.marker_class);
        },
    )?;
    Ok(Some(handle))
}
