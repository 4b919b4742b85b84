//! pagecue core (host-agnostic)
//!
//! Scroll-triggered reveals, counters, racing bars, a modal stack and small
//! navigation behaviors for a static site. The core owns no DOM and no clock:
//! adapters implement [`Document`], feed time through [`PageContext::advance`]
//! and forward events and intersection entries.

pub mod bindings;
pub mod config;
pub mod context;
pub mod counter;
pub mod debounce;
pub mod document;
pub mod error;
pub mod events;
pub mod geometry;
pub mod ids;
pub mod modal;
pub mod navigation;
pub mod observer;
pub mod selector;
pub mod stage;
pub mod stagger;
pub mod timers;
pub mod tracker;

// Re-exports for adapters
pub use bindings::{BarBinding, CounterBinding, IndexMode, RevealBinding};
pub use config::Config;
pub use context::PageContext;
pub use document::{Document, ElementSpec, MemoryDocument, PageSpec};
pub use error::{CueError, Result};
pub use events::{EventOutcome, PageEvent};
pub use geometry::{Rect, RootMargin, Viewport};
pub use ids::{ElementId, ObserverId, TaskId};
pub use modal::{ModalConfig, ModalStack};
pub use observer::{IntersectionEntry, ObserverHandle, ObserverOptions, ObserverSummary, Scope};
pub use selector::Selector;
pub use stage::{HostRequest, Stage};
pub use timers::{TaskHandle, TimerControl, TimerQueue};

/// Bumped whenever the adapter-facing JSON shapes change.
pub const ABI_VERSION: u32 = 1;
