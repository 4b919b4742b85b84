//! Cascading per-element scheduling.
//!
//! Element `i` of a sequence is acted on `i * delay_ms` after scheduling,
//! each on its own one-shot timer owned by that element. Timers never fire
//! early, and equal due times keep sequence order, so actions run in
//! non-decreasing index order.

use crate::document::Document;
use crate::ids::ElementId;
use crate::stage::Stage;
use crate::timers::{TaskHandle, TimerQueue};

/// Nominal delay for position `index`.
#[inline]
pub fn offset_ms(index: usize, delay_ms: u64) -> u64 {
    (index as u64).saturating_mul(delay_ms)
}

/// Schedule `action` for every element, staggered by `delay_ms`.
pub fn schedule<T, F>(
    timers: &mut TimerQueue<T>,
    elements: &[ElementId],
    delay_ms: u64,
    action: F,
) -> Vec<TaskHandle>
where
    F: Fn(&mut T, ElementId) + Clone + 'static,
{
    elements
        .iter()
        .enumerate()
        .map(|(index, &el)| schedule_at(timers, el, index, delay_ms, action.clone()))
        .collect()
}

/// Schedule `action` for a single element sitting at `index` of a sequence.
pub fn schedule_at<T, F>(
    timers: &mut TimerQueue<T>,
    element: ElementId,
    index: usize,
    delay_ms: u64,
    action: F,
) -> TaskHandle
where
    F: Fn(&mut T, ElementId) + 'static,
{
    timers.set_timeout(offset_ms(index, delay_ms), Some(element), move |t| {
        action(t, element)
    })
}

/// Add `class` to `element` after `delay_ms`.
pub fn add_class_with_delay<D: Document>(
    timers: &mut TimerQueue<Stage<D>>,
    element: ElementId,
    class: &str,
    delay_ms: u64,
) -> TaskHandle {
    let class = class.to_string();
    timers.set_timeout(delay_ms, Some(element), move |stage: &mut Stage<D>| {
        stage.document.add_class(element, &class)
    })
}

/// Stagger adding `class` across `elements`.
pub fn reveal_all<D: Document>(
    timers: &mut TimerQueue<Stage<D>>,
    elements: &[ElementId],
    class: &str,
    delay_ms: u64,
) -> Vec<TaskHandle> {
    let class = class.to_string();
    schedule(timers, elements, delay_ms, move |stage: &mut Stage<D>, el| {
        stage.document.add_class(el, &class)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementSpec, MemoryDocument};

    #[test]
    fn fire_times_follow_index() {
        let mut timers: TimerQueue<Vec<(u64, ElementId)>> = TimerQueue::new();
        let els: Vec<ElementId> = (1..=4).map(ElementId).collect();
        let now = std::rc::Rc::new(std::cell::Cell::new(0u64));
        let clock = now.clone();
        schedule(&mut timers, &els, 100, move |log: &mut Vec<(u64, ElementId)>, el| {
            log.push((clock.get(), el))
        });
        let mut log = Vec::new();
        for step in 1..=40u64 {
            now.set(step * 10);
            timers.advance(10, &mut log);
        }
        let ids: Vec<ElementId> = log.iter().map(|(_, e)| *e).collect();
        assert_eq!(ids, els);
        for (i, (t, _)) in log.iter().enumerate() {
            let nominal = offset_ms(i, 100);
            assert!(*t >= nominal, "index {i} fired at {t} before {nominal}");
            assert!(*t < nominal + 100, "index {i} fired late at {t}");
        }
    }

    #[test]
    fn reveal_tolerates_detached_elements() {
        let mut stage = Stage::new(MemoryDocument::new());
        let a = stage.document.append(ElementId(0), ElementSpec::new("div"));
        let b = stage.document.append(ElementId(0), ElementSpec::new("div"));
        let mut timers = TimerQueue::new();
        let handles = reveal_all(&mut timers, &[a, b], "visible", 50);
        assert_eq!(handles.len(), 2);
        stage.document.remove(b);
        timers.advance(200, &mut stage);
        assert!(stage.document.has_class(a, "visible"));
        assert!(!stage.document.has_class(b, "visible"));
        assert!(timers.is_empty());
    }

    #[test]
    fn empty_sequence_schedules_nothing() {
        let mut timers: TimerQueue<Stage<MemoryDocument>> = TimerQueue::new();
        assert!(reveal_all(&mut timers, &[], "visible", 50).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn delayed_class() {
        let mut stage = Stage::new(MemoryDocument::new());
        let a = stage.document.append(ElementId(0), ElementSpec::new("div"));
        let mut timers = TimerQueue::new();
        add_class_with_delay(&mut timers, a, "glow", 30);
        timers.advance(29, &mut stage);
        assert!(!stage.document.has_class(a, "glow"));
        timers.advance(1, &mut stage);
        assert!(stage.document.has_class(a, "glow"));
    }
}
