//! `lpm replay`: drive a journal through the full gateway wiring.
//!
//! ```text
//!   journal ──► FeedHandle ──► EventFeed task ──► PaperGateway
//!                                                   └─► LocalManager ──► BusHandler ──► bus consumer
//! ```
//!
//! Stops at the first rejected event and names its journal line.

use anyhow::{Context, Result};
use lpm_config::ManagerSettings;
use lpm_gateway::{BusHandler, EventFeed, Gateway, LocalManager, PaperGateway};
use lpm_reconcile::ReleasePolicy;
use lpm_schemas::Position;
use serde::Serialize;
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::journal::read_journal;

#[derive(Debug, Serialize)]
pub struct ReplaySummary {
    pub gateway: String,
    pub release_policy: ReleasePolicy,
    /// Journal events applied.
    pub events: u64,
    /// Events observed downstream on the bus, corrected positions included.
    pub bus_events: u64,
    pub positions: Vec<Position>,
}

pub async fn run(journal: &Path, settings: &ManagerSettings) -> Result<ReplaySummary> {
    let entries = read_journal(journal)?;

    let mut gateway = PaperGateway::new(settings.gateway_name.clone());
    let (bus, mut rx) = BusHandler::channel(settings.bus_capacity);
    gateway.set_handler(Box::new(bus));
    let reader = LocalManager::install(&mut gateway, settings.release_policy);

    let consumer = tokio::spawn(async move {
        let mut seen: u64 = 0;
        loop {
            match rx.recv().await {
                Ok(_) => seen += 1,
                Err(RecvError::Lagged(n)) => {
                    warn!(skipped = n, "bus consumer lagged");
                    seen += n;
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    });

    let (feed, task) = EventFeed::spawn(gateway, settings.feed_capacity);

    for entry in entries {
        let kind = entry.event.kind();
        feed.deliver(entry.event)
            .await
            .with_context(|| format!("journal line {}: {kind} event rejected", entry.line))?;
    }

    // Dropping the last handle ends the feed task; dropping the gateway it
    // returns closes the bus.
    drop(feed);
    let gateway = task.await.context("event feed task failed")?;
    let events = gateway.delivered();
    let gateway_name = gateway.gateway_name().to_string();
    drop(gateway);
    let bus_events = consumer.await.context("bus consumer task failed")?;

    let positions = reader.positions();
    info!(events, bus_events, positions = positions.len(), "replay complete");

    Ok(ReplaySummary {
        gateway: gateway_name,
        release_policy: settings.release_policy,
        events,
        bus_events,
        positions,
    })
}
