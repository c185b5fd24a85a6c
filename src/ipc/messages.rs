//! Wire types for control panel → tray communication

use serde::{Deserialize, Serialize};

use crate::config::{LiveConfig, SubVariantConfig};

/// Reduced view of the live selection shown by the tray
///
/// Carries no main variant id, only the active sub-variant and its live snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    pub active_script: bool,
    pub show_tray: bool,
    pub config: TransportVariantsConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportVariantsConfig {
    pub active_variant: u32,
    pub main: SubVariantConfig,
}

impl TransportConfig {
    /// Pure projection of the live mirror
    pub fn project(live: &LiveConfig, script_active: bool, show_tray: bool) -> Self {
        Self {
            active_script: script_active,
            show_tray,
            config: TransportVariantsConfig {
                active_variant: live.active_sub_variant,
                main: live.main.clone(),
            },
        }
    }
}

/// Named event frame: `{"event": "...", "payload": ...}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NamedEvent<T> {
    pub event: String,
    pub payload: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_takes_sub_variant_and_snapshot() {
        let mut live = LiveConfig::default();
        live.active_main_variant = 4;
        live.active_sub_variant = 7;
        live.main.rate = 31;

        let transport = TransportConfig::project(&live, true, false);
        assert!(transport.active_script);
        assert!(!transport.show_tray);
        assert_eq!(transport.config.active_variant, 7);
        assert_eq!(transport.config.main, live.main);
    }

    #[test]
    fn test_wire_shape() {
        let transport = TransportConfig::project(&LiveConfig::default(), false, true);
        let json = serde_json::to_value(&transport).unwrap();
        assert_eq!(json["activeScript"], false);
        assert_eq!(json["showTray"], true);
        assert_eq!(json["config"]["activeVariant"], 0);
        assert_eq!(json["config"]["main"]["title"], "variant0");
        assert!(json.get("activeMainVariant").is_none());
    }
}
