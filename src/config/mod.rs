//! Configuration management for MouseMacros
//!
//! - **variant**: the persisted hierarchy (main variants → sub-variants, click settings)
//! - **store**: ConfigStore owning that hierarchy plus the live editing mirror

pub mod store;
pub mod variant;

// Re-export commonly used types
pub use store::{ConfigStore, LiveConfig};
pub use variant::SubVariantConfig;
