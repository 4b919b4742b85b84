//! Simulated-time timer queue with cancellable task handles.
//!
//! Tasks are one-shot timeouts or fixed-period intervals. Time only moves
//! when the owner calls [`TimerQueue::advance`]; due tasks run in due order,
//! ties broken by scheduling order. A task may be tagged with the element it
//! acts on so that disposing the element cancels its pending work.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use log::trace;

use crate::ids::{ElementId, IdAllocator, TaskId};

/// Returned by a timer callback to keep an interval running or stop it.
/// One-shot timeouts ignore the value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerControl {
    Continue,
    Stop,
}

pub type TimerCallback<T> = Box<dyn FnMut(&mut T) -> TimerControl>;

/// Handle to a scheduled task.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub id: TaskId,
}

/// Due-time key: (due_ms, sequence).
type Slot = (u64, u64);

struct Task<T> {
    id: TaskId,
    period_ms: Option<u64>,
    owner: Option<ElementId>,
    callback: TimerCallback<T>,
}

/// Ordered queue of pending tasks acting on a `T`.
pub struct TimerQueue<T> {
    now_ms: u64,
    seq: u64,
    ids: IdAllocator,
    tasks: BTreeMap<Slot, Task<T>>,
    slots: HashMap<TaskId, Slot>,
}

impl<T> std::fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now_ms", &self.now_ms)
            .field("pending", &self.tasks.len())
            .finish()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            seq: 0,
            ids: IdAllocator::new(),
            tasks: BTreeMap::new(),
            slots: HashMap::new(),
        }
    }

    /// Current simulated time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.slots.contains_key(&handle.id)
    }

    /// Run `callback` once after `delay_ms`.
    pub fn set_timeout<F>(&mut self, delay_ms: u64, owner: Option<ElementId>, mut callback: F) -> TaskHandle
    where
        F: FnMut(&mut T) + 'static,
    {
        self.insert(
            self.now_ms.saturating_add(delay_ms),
            None,
            owner,
            Box::new(move |t| {
                callback(t);
                TimerControl::Stop
            }),
        )
    }

    /// Run `callback` every `period_ms` (first run one period from now) until
    /// it returns [`TimerControl::Stop`] or the task is cancelled.
    /// A zero period is treated as one millisecond.
    pub fn set_interval<F>(&mut self, period_ms: u64, owner: Option<ElementId>, callback: F) -> TaskHandle
    where
        F: FnMut(&mut T) -> TimerControl + 'static,
    {
        let period = period_ms.max(1);
        self.insert(
            self.now_ms.saturating_add(period),
            Some(period),
            owner,
            Box::new(callback),
        )
    }

    fn insert(
        &mut self,
        due_ms: u64,
        period_ms: Option<u64>,
        owner: Option<ElementId>,
        callback: TimerCallback<T>,
    ) -> TaskHandle {
        let id = self.ids.alloc_task();
        let slot = (due_ms, self.next_seq());
        self.tasks.insert(
            slot,
            Task {
                id,
                period_ms,
                owner,
                callback,
            },
        );
        self.slots.insert(id, slot);
        TaskHandle { id }
    }

    fn next_seq(&mut self) -> u64 {
        let s = self.seq;
        self.seq = self.seq.wrapping_add(1);
        s
    }

    /// Cancel a pending task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.slots.remove(&handle.id) {
            Some(slot) => self.tasks.remove(&slot).is_some(),
            None => false,
        }
    }

    /// Cancel every pending task tagged with `owner`. Returns how many were dropped.
    pub fn cancel_owned_by(&mut self, owner: ElementId) -> usize {
        let doomed: Vec<Slot> = self
            .tasks
            .iter()
            .filter(|(_, t)| t.owner == Some(owner))
            .map(|(slot, _)| *slot)
            .collect();
        for slot in &doomed {
            if let Some(task) = self.tasks.remove(slot) {
                self.slots.remove(&task.id);
            }
        }
        doomed.len()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.slots.clear();
    }

    /// Move time forward by `dt_ms`, running every task that falls due on the
    /// way. Returns the number of callback invocations.
    pub fn advance(&mut self, dt_ms: u64, target: &mut T) -> usize {
        let until = self.now_ms.saturating_add(dt_ms);
        let mut fired = 0;
        loop {
            let slot = match self.tasks.keys().next() {
                Some(slot) if slot.0 <= until => *slot,
                _ => break,
            };
            let Some(mut task) = self.tasks.remove(&slot) else {
                break;
            };
            self.now_ms = slot.0;
            let control = (task.callback)(target);
            fired += 1;
            match (task.period_ms, control) {
                (Some(period), TimerControl::Continue) => {
                    let next = (slot.0.saturating_add(period), self.next_seq());
                    self.slots.insert(task.id, next);
                    self.tasks.insert(next, task);
                }
                _ => {
                    self.slots.remove(&task.id);
                }
            }
        }
        self.now_ms = until;
        if fired > 0 {
            trace!("timers: {fired} callbacks up to t={until}ms, {} pending", self.tasks.len());
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_fire_in_due_then_schedule_order() {
        let mut q: TimerQueue<Vec<&'static str>> = TimerQueue::new();
        q.set_timeout(20, None, |log| log.push("b"));
        q.set_timeout(10, None, |log| log.push("a"));
        q.set_timeout(20, None, |log| log.push("c"));
        let mut log = Vec::new();
        assert_eq!(q.advance(9, &mut log), 0);
        assert!(log.is_empty());
        assert_eq!(q.advance(11, &mut log), 3);
        assert_eq!(log, vec!["a", "b", "c"]);
        assert!(q.is_empty());
        assert_eq!(q.now_ms(), 20);
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let mut q: TimerQueue<u32> = TimerQueue::new();
        q.set_timeout(0, None, |n| *n += 1);
        let mut n = 0;
        q.advance(0, &mut n);
        assert_eq!(n, 1);
    }

    #[test]
    fn interval_runs_until_stop() {
        let mut q: TimerQueue<u32> = TimerQueue::new();
        let h = q.set_interval(16, None, |n| {
            *n += 1;
            if *n == 3 {
                TimerControl::Stop
            } else {
                TimerControl::Continue
            }
        });
        let mut n = 0;
        q.advance(1000, &mut n);
        assert_eq!(n, 3);
        assert!(!q.is_pending(h));
    }

    #[test]
    fn cancel_and_owner_cancel() {
        let mut q: TimerQueue<u32> = TimerQueue::new();
        let a = q.set_timeout(5, Some(ElementId(1)), |n| *n += 1);
        q.set_timeout(6, Some(ElementId(1)), |n| *n += 10);
        q.set_timeout(7, Some(ElementId(2)), |n| *n += 100);
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.cancel_owned_by(ElementId(1)), 1);
        let mut n = 0;
        q.advance(100, &mut n);
        assert_eq!(n, 100);
    }

    #[test]
    fn interval_survives_cancel_of_other_tasks() {
        let mut q: TimerQueue<u32> = TimerQueue::new();
        let iv = q.set_interval(10, None, |n| {
            *n += 1;
            TimerControl::Continue
        });
        let mut n = 0;
        q.advance(35, &mut n);
        assert_eq!(n, 3);
        assert!(q.is_pending(iv));
        assert!(q.cancel(iv));
        q.advance(100, &mut n);
        assert_eq!(n, 3);
    }
}
