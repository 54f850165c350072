//! Layered YAML configuration for the `lpm` runner.
//!
//! Layers merge in order; a later layer overrides an earlier one key by key.
//! The merged document is resolved into [`ManagerSettings`] and only that
//! resolved form is hashed, so key order, comments, explicit defaults and
//! keys nothing reads never change [`LoadedConfig::settings_hash`].

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

mod settings;

pub use settings::{ManagerSettings, CONSUMED_KEYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Every layer applied, as JSON.
    pub merged: Value,
    pub settings: ManagerSettings,
    /// Dotted paths of leaves that [`ManagerSettings`] does not read, sorted.
    pub unused_keys: Vec<String>,
    /// Compact JSON of `settings`.
    pub canonical_json: String,
    /// Lowercase hex SHA-256 of `canonical_json`.
    pub settings_hash: String,
}

impl LoadedConfig {
    /// `Fail` turns any unused key into CONFIG_UNUSED_KEYS.
    pub fn check_unused(&self, policy: UnusedKeyPolicy) -> Result<()> {
        if policy == UnusedKeyPolicy::Fail && !self.unused_keys.is_empty() {
            bail!(
                "CONFIG_UNUSED_KEYS: {} key(s) not read by lpm: {}",
                self.unused_keys.len(),
                self.unused_keys.join(", ")
            );
        }
        Ok(())
    }
}

/// Read and merge YAML files in the given order.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for path in paths {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config layer: {}", path.display()))?;
        let layer = parse_layer(&raw).with_context(|| format!("config layer {}", path.display()))?;
        merge_into(&mut merged, layer);
    }
    resolve(merged)
}

/// Same as [`load_files`] with the layers already in memory.
pub fn load_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in layers.iter().enumerate() {
        let layer = parse_layer(raw).with_context(|| format!("config layer #{i}"))?;
        merge_into(&mut merged, layer);
    }
    resolve(merged)
}

fn parse_layer(raw: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
    let json = serde_json::to_value(yaml).context("yaml is not representable as json")?;
    match json {
        // A layer of only comments is empty, not an error.
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(json),
        other => bail!("top level must be a mapping (got {other})"),
    }
}

/// Mappings merge recursively; anything else in `overlay` replaces what
/// `base` held at that key.
fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn resolve(merged: Value) -> Result<LoadedConfig> {
    let settings = ManagerSettings::from_config_json(&merged)?;
    let unused_keys = unused_keys(&merged);
    let canonical_json =
        serde_json::to_string(&settings).context("settings serialization failed")?;
    let settings_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        merged,
        settings,
        unused_keys,
        canonical_json,
        settings_hash,
    })
}

/// Leaves of `merged` outside [`CONSUMED_KEYS`], as dotted paths. Sequence
/// elements appear as their index.
pub fn unused_keys(merged: &Value) -> Vec<String> {
    let mut leaves = Vec::new();
    collect_leaves(merged, String::new(), &mut leaves);
    leaves.retain(|leaf| !CONSUMED_KEYS.iter().any(|key| covers(key, leaf)));
    leaves.sort();
    leaves
}

fn collect_leaves(v: &Value, path: String, out: &mut Vec<String>) {
    let child = |seg: &str| {
        if path.is_empty() {
            seg.to_string()
        } else {
            format!("{path}.{seg}")
        }
    };
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, vv) in map {
                collect_leaves(vv, child(k), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, vv) in items.iter().enumerate() {
                collect_leaves(vv, child(&i.to_string()), out);
            }
        }
        _ if path.is_empty() => {}
        _ => out.push(path),
    }
}

/// "bus.capacity" covers itself and anything below it, never "bus.capacity_max".
fn covers(key: &str, leaf: &str) -> bool {
    leaf.strip_prefix(key)
        .map(|rest| rest.is_empty() || rest.starts_with('.'))
        .unwrap_or(false)
}
