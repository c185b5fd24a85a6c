//! Config store: the variant hierarchy plus the live editing mirror
//!
//! The hierarchy (`variants`) is what gets persisted. `LiveConfig` is the
//! working copy the UI edits; nothing flows back into the hierarchy except
//! through the explicit `commit_*` and `select_*` operations.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::variant::{ClickConfig, ConfigFile, MainVariantConfig, SubVariantConfig};
use crate::constants;
use crate::error::{ConfigError, Lookup, Result};

/// Working copy of the selected main/sub variant plus runtime toggles
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub active_main_variant: u32,
    pub active_sub_variant: u32,
    pub main: SubVariantConfig,
    pub click: ClickConfig,

    /// Master switch for both automation actions
    pub script_active: bool,
    /// Click automation additionally requires this
    pub click_active: bool,
    /// Whether the tray overlay should be shown
    pub show_tray: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            active_main_variant: 0,
            active_sub_variant: 0,
            main: SubVariantConfig::default(),
            click: ClickConfig::default(),
            script_active: false,
            click_active: false,
            show_tray: true,
        }
    }
}

impl LiveConfig {
    /// Overwrite the selection fields from a stored main variant
    /// Runtime toggles are left as they are
    fn hydrate(&mut self, active_main_variant: u32, variant: &MainVariantConfig) {
        self.active_main_variant = active_main_variant;
        self.active_sub_variant = variant.active_sub_variant;
        self.main = variant.main.clone();
        self.click = variant.click;
    }
}

/// Owner of the variant hierarchy and the live mirror
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    variants: Vec<MainVariantConfig>,
    live: LiveConfig,
}

impl ConfigStore {
    /// Default location: `<config dir>/mouse-macros/config.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Store with the single default main variant, backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            variants: vec![MainVariantConfig::default()],
            live: LiveConfig::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn live(&self) -> &LiveConfig {
        &self.live
    }

    /// Mutable access for UI edits; changes stay here until committed
    pub fn live_mut(&mut self) -> &mut LiveConfig {
        &mut self.live
    }

    pub fn variants(&self) -> &[MainVariantConfig] {
        &self.variants
    }

    /// Stored main variant matching the live selection
    pub fn active_variant(&self) -> Option<&MainVariantConfig> {
        self.find(self.live.active_main_variant)
    }

    fn find(&self, id: u32) -> Option<&MainVariantConfig> {
        self.variants.iter().find(|v| v.id == id)
    }

    fn active_variant_mut(&mut self) -> Result<&mut MainVariantConfig> {
        let id = self.live.active_main_variant;
        self.variants
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(ConfigError::NotFound(Lookup::MainVariant(id)))
    }

    /// Read and apply the config file
    ///
    /// On failure the in-memory state is left untouched.
    pub fn load(&mut self) -> Result<()> {
        let contents = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut file: ConfigFile =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;

        for variant in &mut file.main_variants {
            variant.normalize();
        }

        let fallback;
        let resolved = match file
            .main_variants
            .iter()
            .find(|v| v.id == file.active_main_variant)
        {
            Some(variant) => variant,
            None => {
                info!(
                    active_main_variant = file.active_main_variant,
                    "active main variant not in file, using defaults"
                );
                fallback = MainVariantConfig::default();
                &fallback
            }
        };

        self.live.hydrate(file.active_main_variant, resolved);
        self.variants = file.main_variants;

        info!(
            path = %self.path.display(),
            main_variants = self.variants.len(),
            active_main_variant = self.live.active_main_variant,
            "Loaded config"
        );
        Ok(())
    }

    /// Load, or write the defaults first if the file does not exist yet
    pub fn load_or_create(&mut self) -> Result<()> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "Config file not found, creating default config");
            self.save()?;
        }
        self.load()
    }

    /// Serialize the hierarchy and replace the file atomically
    pub fn save(&self) -> Result<()> {
        let file = ConfigFile {
            active_main_variant: self.live.active_main_variant,
            main_variants: self.variants.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(ConfigError::Serialize)?;

        let write_err = |source: std::io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let temp = self.path.with_extension(constants::config::TEMP_SUFFIX);
        fs::write(&temp, json).map_err(write_err)?;
        fs::rename(&temp, &self.path).map_err(write_err)?;

        info!(path = %self.path.display(), main_variants = self.variants.len(), "Saved config");
        Ok(())
    }

    /// Append a default main variant with the next positional id
    pub fn add_main_variant(&mut self, title: &str) -> u32 {
        let id = self.variants.len() as u32;
        self.variants.push(MainVariantConfig::new_default(id, title));
        info!(id, title, "Added main variant");
        id
    }

    /// Switch the live mirror to another main variant, discarding uncommitted edits
    pub fn select_main_variant(&mut self, id: u32) -> Result<()> {
        let variant = self
            .variants
            .iter()
            .find(|v| v.id == id)
            .ok_or(ConfigError::NotFound(Lookup::MainVariant(id)))?;

        self.live.hydrate(id, variant);
        debug!(id, active_sub_variant = self.live.active_sub_variant, "Selected main variant");
        Ok(())
    }

    /// Make sub-variant `id` active within the active main variant
    ///
    /// Updates the stored selection and snapshot as well as the live mirror.
    pub fn select_sub_variant(&mut self, id: u32) -> Result<()> {
        let variant = self.active_variant_mut()?;
        let main = variant.id;
        let sub = variant
            .sub_variant(id)
            .cloned()
            .ok_or(ConfigError::NotFound(Lookup::SubVariant { main, sub: id }))?;

        variant.active_sub_variant = sub.id;
        variant.main = sub.clone();
        self.live.active_sub_variant = sub.id;
        self.live.main = sub;
        debug!(main, sub = id, "Selected sub variant");
        Ok(())
    }

    /// Store the live click config into the active main variant
    pub fn commit_click(&mut self) -> Result<()> {
        let click = self.live.click;
        let variant = self.active_variant_mut()?;
        variant.click = click;
        debug!(main = variant.id, times = click.times, rate = click.rate, "Committed click config");
        Ok(())
    }

    /// Store live parameters into the active sub-variant
    pub fn commit_active_sub_variant(&mut self) -> Result<()> {
        let id = self.live.active_sub_variant;
        self.commit_sub_variant(id)
    }

    /// Store live parameters into sub-variant `id` without switching to it
    pub fn commit_sub_variant(&mut self, id: u32) -> Result<()> {
        let params = self.live.main.clone();
        let variant = self.active_variant_mut()?;
        let main = variant.id;
        let sub = variant
            .sub_variant_mut(id)
            .ok_or(ConfigError::NotFound(Lookup::SubVariant { main, sub: id }))?;

        sub.assign_params(&params);
        debug!(
            main,
            sub = id,
            sensitivity = params.sensitivity,
            times = params.times,
            rate = params.rate,
            "Committed sub variant"
        );
        Ok(())
    }
}
