//! Configuration module for SpaceOdT.
//!
//! This module handles:
//! - The stable export/cache configuration contract
//! - Runtime settings from `spaceodt.yaml`, `.env` and the environment
//! - Token resolution

mod contract;
mod settings;

pub use contract::{
    CONFIG_CONTRACT_VERSION, ENABLED_MODULES, FeatureToggles, SchemaVersions, SpaceOdtConfig,
};
pub use settings::{
    DEFAULT_BASE_URL, DEFAULT_OUT_DIR, DEFAULT_SETTINGS_FILE, JobSettings, Settings,
    TOKEN_ENV_VARS, UiSettings, load_dotenv, resolve_token, resolve_token_with,
};
