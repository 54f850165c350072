//! JSONL journal of gateway events: one `GatewayEvent` object per line.
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use lpm_schemas::GatewayEvent;
use std::fs;
use std::path::Path;

/// An event together with its 1-based journal line.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub line: usize,
    pub event: GatewayEvent,
}

pub fn read_journal(path: &Path) -> Result<Vec<JournalEntry>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read journal: {}", path.display()))?;
    parse_journal(&raw).with_context(|| format!("invalid journal: {}", path.display()))
}

pub fn parse_journal(raw: &str) -> Result<Vec<JournalEntry>> {
    let mut out = Vec::new();
    for (idx, text) in raw.lines().enumerate() {
        let line = idx + 1;
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let event: GatewayEvent = serde_json::from_str(text)
            .with_context(|| format!("line {line}: not a gateway event"))?;
        out.push(JournalEntry { line, event });
    }
    Ok(out)
}
