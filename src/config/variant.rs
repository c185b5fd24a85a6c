//! Variant hierarchy: main variants holding ten sub-variant presets
//!
//! These are plain value types. The JSON shape (camelCase keys) is the
//! on-disk `config.json` format; unknown keys are ignored on read.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::defaults;

/// One of the ten automation presets inside a main variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubVariantConfig {
    pub title: String,
    pub id: u32,
    /// Pointer step per tick (accepts integer or float)
    #[serde(deserialize_with = "deserialize_sensitivity", serialize_with = "serialize_sensitivity")]
    pub sensitivity: f64,
    pub times: u32,
    pub rate: u32,
}

/// Click automation parameters, one per main variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickConfig {
    pub times: u32,
    pub rate: u32,
}

/// A named automation profile
///
/// `main` is a snapshot of the active sub-variant, not a reference to it.
/// It only changes through an explicit select or commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainVariantConfig {
    pub id: u32,
    pub title: String,
    pub active_sub_variant: u32,
    pub main: SubVariantConfig,
    pub click: ClickConfig,
    pub sub_variants: Vec<SubVariantConfig>,
}

/// Persisted form of the whole hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub active_main_variant: u32,
    pub main_variants: Vec<MainVariantConfig>,
}

/// Custom deserializer that accepts both integer and float sensitivity
fn deserialize_sensitivity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrFloat {
        Int(i64),
        Float(f64),
    }

    match IntOrFloat::deserialize(deserializer)? {
        IntOrFloat::Int(i) => Ok(i as f64),
        IntOrFloat::Float(f) => Ok(f),
    }
}

/// Custom serializer that writes whole numbers without decimal point
fn serialize_sensitivity<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if value.fract() == 0.0 && value.is_finite() {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl SubVariantConfig {
    /// Default preset for slot `id`
    pub fn new_default(id: u32) -> Self {
        Self {
            title: format!("{}{id}", defaults::SUB_VARIANT_TITLE_PREFIX),
            id,
            sensitivity: defaults::SENSITIVITY,
            times: defaults::TIMES,
            rate: defaults::RATE,
        }
    }

    /// The full batch of ten default presets, ids 0..9
    pub fn default_batch() -> Vec<Self> {
        (0..defaults::SUB_VARIANT_COUNT).map(Self::new_default).collect()
    }

    /// Copy the tunable parameters from `other`, keeping title and id
    pub fn assign_params(&mut self, other: &SubVariantConfig) {
        self.sensitivity = other.sensitivity;
        self.times = other.times;
        self.rate = other.rate;
    }
}

impl Default for SubVariantConfig {
    fn default() -> Self {
        Self::new_default(0)
    }
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            times: defaults::CLICK_TIMES,
            rate: defaults::CLICK_RATE,
        }
    }
}

impl MainVariantConfig {
    /// Fresh main variant with default click config and ten default presets
    pub fn new_default(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            active_sub_variant: 0,
            main: SubVariantConfig::default(),
            click: ClickConfig::default(),
            sub_variants: SubVariantConfig::default_batch(),
        }
    }

    /// First sub-variant with a matching id
    pub fn sub_variant(&self, id: u32) -> Option<&SubVariantConfig> {
        self.sub_variants.iter().find(|s| s.id == id)
    }

    pub fn sub_variant_mut(&mut self, id: u32) -> Option<&mut SubVariantConfig> {
        self.sub_variants.iter_mut().find(|s| s.id == id)
    }

    /// Repair the ten-slot invariant after reading an edited file
    /// Returns true if anything was changed
    pub(crate) fn normalize(&mut self) -> bool {
        let count = defaults::SUB_VARIANT_COUNT as usize;
        let well_formed = self.sub_variants.len() == count
            && self
                .sub_variants
                .iter()
                .enumerate()
                .all(|(pos, s)| s.id as usize == pos);

        let mut changed = false;
        if !well_formed {
            warn!(
                main_variant = self.id,
                count = self.sub_variants.len(),
                "sub variants malformed, rebuilding ten slots"
            );
            let mut slots = SubVariantConfig::default_batch();
            let mut filled = vec![false; count];
            for existing in self.sub_variants.drain(..) {
                let pos = existing.id as usize;
                // First entry wins, out-of-range ids are dropped
                if pos < count && !filled[pos] {
                    filled[pos] = true;
                    slots[pos] = existing;
                }
            }
            self.sub_variants = slots;
            changed = true;
        }

        if self.active_sub_variant >= defaults::SUB_VARIANT_COUNT {
            warn!(
                main_variant = self.id,
                active_sub_variant = self.active_sub_variant,
                "active sub variant out of range, resetting to 0"
            );
            self.active_sub_variant = 0;
            changed = true;
        }
        changed
    }
}

impl Default for MainVariantConfig {
    fn default() -> Self {
        Self::new_default(0, defaults::MAIN_VARIANT_TITLE)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            active_main_variant: 0,
            main_variants: vec![MainVariantConfig::default()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_batch_ids_match_positions() {
        let batch = SubVariantConfig::default_batch();
        assert_eq!(batch.len(), 10);
        for (pos, sub) in batch.iter().enumerate() {
            assert_eq!(sub.id as usize, pos);
            assert_eq!(sub.title, format!("variant{pos}"));
            assert_eq!(sub.sensitivity, 1.0);
            assert_eq!(sub.times, 10);
            assert_eq!(sub.rate, 10);
        }
    }

    #[test]
    fn test_default_click() {
        assert_eq!(ClickConfig::default(), ClickConfig { times: 5, rate: 15 });
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let variant = MainVariantConfig::new_default(3, "Sniper");
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "Sniper");
        assert_eq!(json["activeSubVariant"], 0);
        assert_eq!(json["click"]["times"], 5);
        assert_eq!(json["subVariants"].as_array().unwrap().len(), 10);
        // Whole sensitivity is written as an integer
        assert_eq!(json["main"]["sensitivity"].to_string(), "1");
    }

    #[test]
    fn test_sensitivity_accepts_int_and_float() {
        let sub: SubVariantConfig = serde_json::from_str(
            r#"{"title":"variant0","id":0,"sensitivity":3,"times":1,"rate":2}"#,
        )
        .unwrap();
        assert_eq!(sub.sensitivity, 3.0);

        let sub: SubVariantConfig = serde_json::from_str(
            r#"{"title":"variant0","id":0,"sensitivity":2.5,"times":1,"rate":2}"#,
        )
        .unwrap();
        assert_eq!(sub.sensitivity, 2.5);
        assert_eq!(serde_json::to_value(&sub).unwrap()["sensitivity"], 2.5);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "activeMainVariant": 0,
            "theme": "dark",
            "mainVariants": []
        }"#;
        let file: ConfigFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.active_main_variant, 0);
        assert!(file.main_variants.is_empty());
    }

    #[test]
    fn test_assign_params_keeps_identity() {
        let mut target = SubVariantConfig::new_default(4);
        let source = SubVariantConfig {
            title: "other".to_string(),
            id: 9,
            sensitivity: 7.0,
            times: 3,
            rate: 33,
        };
        target.assign_params(&source);
        assert_eq!(target.id, 4);
        assert_eq!(target.title, "variant4");
        assert_eq!(target.sensitivity, 7.0);
        assert_eq!(target.times, 3);
        assert_eq!(target.rate, 33);
    }

    #[test]
    fn test_normalize_noop_on_well_formed() {
        let mut variant = MainVariantConfig::default();
        let before = variant.clone();
        assert!(!variant.normalize());
        assert_eq!(variant, before);
    }

    #[test]
    fn test_normalize_fills_missing_slots() {
        let mut variant = MainVariantConfig::default();
        variant.sub_variants.truncate(3);
        variant.sub_variants[2].rate = 99;
        variant.active_sub_variant = 12;

        assert!(variant.normalize());
        assert_eq!(variant.sub_variants.len(), 10);
        assert_eq!(variant.sub_variants[2].rate, 99);
        assert_eq!(variant.sub_variants[7], SubVariantConfig::new_default(7));
        assert_eq!(variant.active_sub_variant, 0);
    }
}
