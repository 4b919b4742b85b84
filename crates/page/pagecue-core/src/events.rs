//! Host events fed into a page context.

use serde::{Deserialize, Serialize};

use crate::ids::ElementId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// Window scrolled to vertical offset `y`.
    Scroll { y: f64 },
    /// Click whose innermost target is `target`.
    Click { target: ElementId },
    KeyDown { key: String },
    PointerEnter { target: ElementId },
    PointerLeave { target: ElementId },
}

/// What the host should do with the native event afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Nothing in the page layer reacted.
    Ignored,
    /// Reacted; the default action may proceed.
    Handled,
    /// Reacted; the host must suppress the default action.
    PreventDefault,
}

impl EventOutcome {
    pub fn prevents_default(self) -> bool {
        matches!(self, EventOutcome::PreventDefault)
    }

    /// The stronger of two outcomes.
    pub(crate) fn max_with(self, other: EventOutcome) -> EventOutcome {
        use EventOutcome::*;
        match (self, other) {
            (PreventDefault, _) | (_, PreventDefault) => PreventDefault,
            (Handled, _) | (_, Handled) => Handled,
            _ => Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_ordering() {
        use EventOutcome::*;
        assert_eq!(Ignored.max_with(Handled), Handled);
        assert_eq!(Handled.max_with(PreventDefault), PreventDefault);
        assert_eq!(Ignored.max_with(Ignored), Ignored);
        assert!(PreventDefault.prevents_default());
    }

    #[test]
    fn events_are_tagged_json() {
        let ev: PageEvent = serde_json::from_str(r#"{"type":"key_down","key":"Escape"}"#).unwrap();
        assert_eq!(ev, PageEvent::KeyDown { key: "Escape".into() });
        let ev: PageEvent = serde_json::from_str(r#"{"type":"click","target":3}"#).unwrap();
        assert_eq!(ev, PageEvent::Click { target: ElementId(3) });
    }
}
