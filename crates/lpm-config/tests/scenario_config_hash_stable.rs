//! Settings hash stability.
//!
//! GREEN when:
//! - the same inputs always hash identically,
//! - key order inside a layer does not change the hash,
//! - keys nothing reads and explicit defaults do not change the hash,
//! - an overlay that changes a setting changes the hash and takes effect.

use lpm_config::{load_files, load_strings, ManagerSettings};
use lpm_reconcile::ReleasePolicy;

const BASE_YAML: &str = r#"
engine:
  release_policy: "outstanding"
gateway:
  name: "CTP"
bus:
  capacity: 1024
feed:
  capacity: 256
"#;

const BASE_YAML_REORDERED: &str = r#"
feed:
  capacity: 256
bus:
  capacity: 1024
gateway:
  name: "CTP"
engine:
  release_policy: "outstanding"
"#;

const OVERLAY_YAML: &str = r#"
engine:
  release_policy: "residual"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_strings(&[BASE_YAML]).unwrap();
    let b = load_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.settings_hash, b.settings_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_strings(&[BASE_YAML]).unwrap();
    let b = load_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.settings_hash, b.settings_hash);
}

#[test]
fn unread_keys_do_not_change_the_hash() {
    let noisy = "strategy:\n  window: 20\ngateway:\n  address: tcp://127.0.0.1:10130\n";
    let a = load_strings(&[BASE_YAML]).unwrap();
    let b = load_strings(&[BASE_YAML, noisy]).unwrap();
    assert_eq!(a.settings_hash, b.settings_hash);
    assert_eq!(b.unused_keys, vec!["gateway.address", "strategy.window"]);
}

#[test]
fn explicit_defaults_hash_like_no_config() {
    let empty = load_strings(&[]).unwrap();
    let explicit = load_strings(&["gateway:\n  name: PAPER\nbus:\n  capacity: 1024\n"]).unwrap();
    assert_eq!(empty.settings, ManagerSettings::default());
    assert_eq!(empty.settings_hash, explicit.settings_hash);
}

#[test]
fn overlay_changes_hash_and_policy() {
    let base = load_strings(&[BASE_YAML]).unwrap();
    let merged = load_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.settings_hash, merged.settings_hash);

    assert_eq!(merged.settings.release_policy, ReleasePolicy::Residual);
    // Untouched siblings survive the merge.
    assert_eq!(merged.settings.gateway_name, "CTP");
    assert_eq!(merged.settings.bus_capacity, 1024);
    assert!(merged.canonical_json.contains(r#""release_policy":"residual""#));
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.settings_hash.len(), 64);
    assert!(loaded.settings_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn files_load_like_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let from_files = load_files(&[&base, &overlay]).unwrap();
    let from_strings = load_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.settings_hash, from_strings.settings_hash);
    assert_eq!(from_files.merged, from_strings.merged);
}

#[test]
fn missing_file_names_the_path() {
    let err = load_files(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}

#[test]
fn invalid_setting_fails_the_load() {
    let err = load_strings(&[BASE_YAML, "feed:\n  capacity: 0\n"]).unwrap_err();
    assert!(err.to_string().contains("feed.capacity"), "{err}");
}
