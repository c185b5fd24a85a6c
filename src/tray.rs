//! Tray process side: an independent mirror of the transported config
//!
//! Rendering is out of scope here; the tray keeps its own copy of the
//! selection and reports the status line it would draw.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::SubVariantConfig;
use crate::constants::events;
use crate::ipc::{NamedEvent, TransportConfig, TrayServer};

/// Tray-side copy of the selection, replaced wholesale on each `changeConfig`
#[derive(Debug, Clone, PartialEq)]
pub struct TrayMirror {
    pub active_script: bool,
    pub show_tray: bool,
    pub active_variant: u32,
    pub main: SubVariantConfig,
}

impl Default for TrayMirror {
    fn default() -> Self {
        Self {
            active_script: false,
            show_tray: true,
            active_variant: 0,
            main: SubVariantConfig::default(),
        }
    }
}

impl TrayMirror {
    /// Apply a named event; returns false for events the tray does not handle
    pub fn apply(&mut self, event: &NamedEvent<TransportConfig>) -> bool {
        if event.event != events::CHANGE_CONFIG {
            debug!(event = %event.event, "Ignoring unknown tray event");
            return false;
        }
        let payload = &event.payload;
        self.active_script = payload.active_script;
        self.show_tray = payload.show_tray;
        self.active_variant = payload.config.active_variant;
        self.main = payload.config.main.clone();
        true
    }

    /// Status line the overlay shows; empty when hidden
    pub fn status_line(&self) -> String {
        if !self.show_tray {
            return String::new();
        }
        let marker = if self.active_script { "\u{25CF}" } else { "\u{25CB}" };
        format!(
            "{marker} {}  sens {}  x{}  {}ms",
            self.active_variant, self.main.sensitivity, self.main.times, self.main.rate
        )
    }
}

/// Accept control panel connections and mirror their events until the
/// process is stopped
pub fn serve(server: &TrayServer) -> Result<()> {
    info!(socket = ?server.path(), "Tray listener started");
    let mut mirror = TrayMirror::default();

    loop {
        let mut client = server.accept().context("Tray accept failed")?;
        info!("Control panel connected to tray");

        loop {
            match client.recv_event() {
                Ok(event) => {
                    if mirror.apply(&event) {
                        info!(status = %mirror.status_line(), visible = mirror.show_tray, "Tray updated");
                    }
                }
                Err(e) => {
                    warn!(error = ?e, "Tray connection closed or error");
                    break;
                }
            }
        }

        info!("Control panel disconnected from tray");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiveConfig;

    fn change(config: TransportConfig) -> NamedEvent<TransportConfig> {
        NamedEvent {
            event: "changeConfig".to_string(),
            payload: config,
        }
    }

    #[test]
    fn test_apply_replaces_mirror() {
        let mut live = LiveConfig::default();
        live.active_sub_variant = 5;
        live.main.times = 3;

        let mut mirror = TrayMirror::default();
        assert!(mirror.apply(&change(TransportConfig::project(&live, true, true))));
        assert!(mirror.active_script);
        assert_eq!(mirror.active_variant, 5);
        assert_eq!(mirror.main.times, 3);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut mirror = TrayMirror::default();
        let mut event = change(TransportConfig::project(&LiveConfig::default(), true, false));
        event.event = "somethingElse".to_string();
        assert!(!mirror.apply(&event));
        assert_eq!(mirror, TrayMirror::default());
    }

    #[test]
    fn test_status_line() {
        let mut mirror = TrayMirror::default();
        assert_eq!(mirror.status_line(), "\u{25CB} 0  sens 1  x10  10ms");

        mirror.show_tray = false;
        assert!(mirror.status_line().is_empty());
    }
}
