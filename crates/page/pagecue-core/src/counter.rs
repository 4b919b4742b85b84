//! Counter animator: a fixed-tick numeric tween from 0 to a target.
//!
//! Each tick adds `target / (duration / tick)` and renders the floored value;
//! the tick that reaches the target renders the target itself and stops the
//! interval. The tween is bounded to `ceil(duration / tick)` ticks, so float
//! accumulation can never stretch it.

use log::debug;

use crate::document::Document;
use crate::ids::ElementId;
use crate::stage::Stage;
use crate::timers::{TaskHandle, TimerControl, TimerQueue};

pub const DEFAULT_DURATION_MS: u64 = 2000;
pub const TICK_MS: u64 = 16;

/// What a tick wants rendered.
#[derive(Clone, Debug, PartialEq)]
pub enum CounterFrame {
    Running(String),
    Finished(String),
}

impl CounterFrame {
    pub fn text(&self) -> &str {
        match self {
            CounterFrame::Running(s) | CounterFrame::Finished(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CounterState {
    pub current: f64,
    pub target: f64,
    pub increment: f64,
    ticks: u64,
    max_ticks: u64,
}

impl CounterState {
    /// `None` for a non-finite target. Durations shorter than one tick
    /// finish on the first tick.
    pub fn new(target: f64, duration_ms: u64, tick_ms: u64) -> Option<Self> {
        if !target.is_finite() {
            return None;
        }
        let tick_ms = tick_ms.max(1);
        let steps = duration_ms as f64 / tick_ms as f64;
        let max_ticks = duration_ms.div_ceil(tick_ms).max(1);
        let increment = if steps > 0.0 { target / steps } else { target };
        Some(Self {
            current: 0.0,
            target,
            increment,
            ticks: 0,
            max_ticks,
        })
    }

    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    pub fn is_finished(&self) -> bool {
        self.ticks >= self.max_ticks || self.current >= self.target
    }

    pub fn tick(&mut self) -> CounterFrame {
        self.current += self.increment;
        self.ticks += 1;
        if self.current >= self.target || self.ticks >= self.max_ticks {
            self.current = self.target;
            CounterFrame::Finished(format_final(self.target))
        } else {
            CounterFrame::Running(format!("{}", self.current.floor() as i64))
        }
    }
}

/// Whole numbers render without a fraction, everything else with one decimal.
/// Exact ties round away from zero.
pub fn format_final(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        return format!("{}", value as i64);
    }
    // only quarter fractions (x.25, x.75) are exact ties at one decimal;
    // `{:.1}` already rounds inexact values from their exact binary expansion
    let rounded = if (value * 4.0).fract() == 0.0 {
        (value * 10.0).round() / 10.0
    } else {
        value
    };
    format!("{rounded:.1}")
}

/// Start a counter on `element`. Returns `None` (and touches nothing) when
/// `target` is not finite.
pub fn animate<D: Document>(
    timers: &mut TimerQueue<Stage<D>>,
    element: ElementId,
    target: f64,
    duration_ms: u64,
    tick_ms: u64,
) -> Option<TaskHandle> {
    let Some(mut state) = CounterState::new(target, duration_ms, tick_ms) else {
        debug!("counter on {element:?}: non-finite target, skipped");
        return None;
    };
    Some(timers.set_interval(tick_ms, Some(element), move |stage: &mut Stage<D>| {
        match state.tick() {
            CounterFrame::Running(text) => {
                stage.document.set_text(element, &text);
                TimerControl::Continue
            }
            CounterFrame::Finished(text) => {
                stage.document.set_text(element, &text);
                TimerControl::Stop
            }
        }
    }))
}

/// Leading-number parse in the manner of HTML attribute readers: surrounding
/// whitespace is skipped and trailing junk after a valid prefix is ignored.
/// Returns NaN when no number prefix exists.
pub fn parse_float_prefix(raw: &str) -> f64 {
    let s = raw.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'+' | b'-' if i == 0 => {}
            b'0'..=b'9' => {
                seen_digit = true;
                end = i + 1;
            }
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => {
                seen_exp = true;
                if matches!(bytes.get(i + 1), Some(b'+') | Some(b'-')) {
                    i += 1;
                }
            }
            _ => break,
        }
        i += 1;
    }
    if !seen_digit {
        return if s.starts_with("Infinity") || s.starts_with("+Infinity") {
            f64::INFINITY
        } else if s.starts_with("-Infinity") {
            f64::NEG_INFINITY
        } else {
            f64::NAN
        };
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

/// Integer-prefix parse; `None` when there is no digit prefix.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}
