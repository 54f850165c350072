use anyhow::{anyhow, Result};
use lpm_reconcile::ReleasePolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every dotted key `ManagerSettings::from_config_json` reads.
pub const CONSUMED_KEYS: &[&str] = &[
    "engine.release_policy",
    "gateway.name",
    "bus.capacity",
    "feed.capacity",
];

const DEFAULT_GATEWAY_NAME: &str = "PAPER";
const DEFAULT_BUS_CAPACITY: usize = 1024;
const DEFAULT_FEED_CAPACITY: usize = 256;
const MAX_CAPACITY: usize = 1 << 20;

/// Runtime settings for the position manager and its wiring. Every key is
/// optional; missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSettings {
    pub release_policy: ReleasePolicy,
    pub gateway_name: String,
    /// Unread events kept per bus subscriber.
    pub bus_capacity: usize,
    /// Queued deliveries before producers wait.
    pub feed_capacity: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            release_policy: ReleasePolicy::default(),
            gateway_name: DEFAULT_GATEWAY_NAME.to_string(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl ManagerSettings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let defaults = Self::default();

        let release_policy = match lookup(cfg, "engine.release_policy") {
            None | Some(Value::Null) => defaults.release_policy,
            Some(Value::String(s)) => s
                .parse::<ReleasePolicy>()
                .map_err(|e| anyhow!("engine.release_policy: {e}"))?,
            Some(other) => {
                return Err(anyhow!(
                    "engine.release_policy must be a string (got {other})"
                ))
            }
        };

        let gateway_name = match lookup(cfg, "gateway.name") {
            None | Some(Value::Null) => defaults.gateway_name,
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(other) => {
                return Err(anyhow!(
                    "gateway.name must be a non-empty string (got {other})"
                ))
            }
        };

        let bus_capacity = capacity(cfg, "bus.capacity", defaults.bus_capacity)?;
        let feed_capacity = capacity(cfg, "feed.capacity", defaults.feed_capacity)?;

        Ok(Self {
            release_policy,
            gateway_name,
            bus_capacity,
            feed_capacity,
        })
    }
}

fn lookup<'a>(cfg: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(cfg, |v, seg| v.get(seg))
}

/// Accepts a number or a numeric string, within 1..=MAX_CAPACITY.
fn capacity(cfg: &Value, key: &str, default: usize) -> Result<usize> {
    let raw = match lookup(cfg, key) {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    let n = raw.ok_or_else(|| anyhow!("{key} must be a positive integer"))?;
    if n == 0 || n > MAX_CAPACITY as u64 {
        return Err(anyhow!("{key} out of bounds (1..={MAX_CAPACITY}): {n}"));
    }
    Ok(n as usize)
}
