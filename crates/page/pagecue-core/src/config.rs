//! Configuration for a page context.
//!
//! `Config::default()` reproduces the research site's behavior. Every field
//! can be overridden from JSON; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::bindings::{default_reveals, BarBinding, CounterBinding, IndexMode, RevealBinding};
use crate::error::Result;
use crate::modal::ModalConfig;
use crate::navigation::{AnchorConfig, GlowConfig, NavbarConfig, TransitionConfig};
use crate::observer::ObserverOptions;
use crate::selector::Selector;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options used by `observe` when the caller passes none.
    pub observer: ObserverOptions,
    /// How staggered reveals find an element's position.
    pub index_mode: IndexMode,
    pub reveals: Vec<RevealBinding>,
    pub counters: CounterBinding,
    pub bars: BarBinding,
    pub modals: ModalConfig,
    pub anchors: AnchorConfig,
    pub navbar: NavbarConfig,
    pub transitions: TransitionConfig,
    pub glow: GlowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            observer: ObserverOptions::default(),
            index_mode: IndexMode::default(),
            reveals: default_reveals(),
            counters: CounterBinding::default(),
            bars: BarBinding::default(),
            modals: ModalConfig::default(),
            anchors: AnchorConfig::default(),
            navbar: NavbarConfig::default(),
            transitions: TransitionConfig::default(),
            glow: GlowConfig::default(),
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Config = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every selector and threshold up front so that `init` cannot
    /// fail halfway through wiring.
    pub fn validate(&self) -> Result<()> {
        self.observer.validate()?;
        for r in &self.reveals {
            Selector::parse(&r.selector)?;
            ObserverOptions::with_threshold(r.threshold).validate()?;
        }
        ObserverOptions::with_threshold(self.counters.threshold).validate()?;
        ObserverOptions::with_threshold(self.bars.threshold).validate()?;
        for sel in [
            &self.counters.selector,
            &self.bars.selector,
            &self.modals.selector,
            &self.modals.close_selector,
            &self.anchors.selector,
            &self.transitions.link_selector,
            &self.glow.selector,
        ] {
            Selector::parse(sel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CueError;

    #[test]
    fn default_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json(
            r#"{ "index_mode": "snapshot", "navbar": { "offset_px": 80 },
                 "observer": { "root_margin": "0px 0px -10% 0px" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.index_mode, IndexMode::Snapshot);
        assert_eq!(cfg.navbar.offset_px, 80.0);
        assert_eq!(cfg.navbar.element_id, "navbar");
        assert_eq!(cfg.observer.threshold, 0.1);
        assert_eq!(cfg.reveals.len(), 9);
        assert_eq!(cfg.transitions.delay_ms, 300);
    }

    #[test]
    fn rejects_bad_values() {
        let err = Config::from_json(r#"{ "counters": { "threshold": 2.0 } }"#).unwrap_err();
        assert!(matches!(err, CueError::Threshold { .. }));

        let err = Config::from_json(r#"{ "reveals": [ { "selector": "a b", "reveal_class": "x" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, CueError::Selector { .. }));

        let err = Config::from_json(r#"{ "observer": { "root_margin": "3em" } }"#).unwrap_err();
        assert!(matches!(err, CueError::Config(_)));

        assert!(Config::from_json("not json").is_err());
    }
}
