//! Command handler modules for lpm.
//!
//! Shared utilities used by multiple command paths live here.

pub mod replay;

use anyhow::Result;
use lpm_config::{ManagerSettings, UnusedKeyPolicy};
use tracing::{info, warn};

/// Settings from layered config, or defaults when no paths are given.
pub fn load_settings(config_paths: &[String], strict: bool) -> Result<ManagerSettings> {
    if config_paths.is_empty() {
        return Ok(ManagerSettings::default());
    }

    let loaded = lpm_config::load_files(config_paths)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    loaded.check_unused(policy)?;
    if !loaded.unused_keys.is_empty() {
        warn!(unused = ?loaded.unused_keys, "config keys not read by lpm");
    }

    let settings = loaded.settings;
    info!(
        settings_hash = %loaded.settings_hash,
        release_policy = %settings.release_policy,
        gateway = %settings.gateway_name,
        "config loaded"
    );
    Ok(settings)
}
