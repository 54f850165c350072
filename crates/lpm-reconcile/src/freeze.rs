//! Freeze ledger: per-order reservation state for closing orders.
//!
//! # State machine (per order id)
//!
//! ```text
//!   Unseen ──(first active CLOSE update)──► Reserved ──(first inactive update)──► Released
//! ```
//!
//! `Released` is terminal. Repeated active updates for a `Reserved` order and
//! any update for a `Released` order are no-ops, so replaying order
//! notifications can never freeze or release twice.
//!
//! # Release accounting
//!
//! A reservation can be consumed from two sides: closing fills that belong
//! to the order, and the order's terminal update. [`ReleasePolicy`] decides
//! how the two combine.

use std::collections::BTreeMap;

use lpm_schemas::PositionKey;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ReleasePolicy
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Track the quantity each order still holds frozen. Fills release
    /// `min(fill, outstanding)`; the terminal update releases whatever is
    /// still outstanding. Every reserved unit is released exactly once,
    /// whatever the interleaving of fills and order updates.
    #[default]
    Outstanding,
    /// Gateway arithmetic: fills of any seen order release their full
    /// volume, the terminal update releases `volume - traded`. Releases
    /// saturate at zero frozen volume.
    Residual,
}

impl ReleasePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleasePolicy::Outstanding => "outstanding",
            ReleasePolicy::Residual => "residual",
        }
    }
}

impl std::str::FromStr for ReleasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outstanding" => Ok(ReleasePolicy::Outstanding),
            "residual" => Ok(ReleasePolicy::Residual),
            other => Err(format!(
                "unknown release policy '{other}' (expected outstanding|residual)"
            )),
        }
    }
}

impl std::fmt::Display for ReleasePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-order state
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FreezeState {
    #[default]
    Unseen,
    Reserved,
    Released,
}

/// Reservation record for one closing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderFreeze {
    /// Position the order froze volume against.
    pub position_id: PositionKey,
    pub state: FreezeState,
    /// Quantity frozen when the order was first seen.
    pub reserved: i64,
    /// Part of `reserved` not yet released by fills or termination.
    pub outstanding: i64,
}

// ---------------------------------------------------------------------------
// FreezeLedger
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct FreezeLedger {
    orders: BTreeMap<String, OrderFreeze>,
}

impl FreezeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, order_id: &str) -> FreezeState {
        self.orders
            .get(order_id)
            .map(|f| f.state)
            .unwrap_or(FreezeState::Unseen)
    }

    pub fn get(&self, order_id: &str) -> Option<&OrderFreeze> {
        self.orders.get(order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// `Unseen -> Reserved`. Returns `false` (and records nothing) if the
    /// order was already seen.
    pub(crate) fn reserve(&mut self, order_id: &str, position_id: PositionKey, qty: i64) -> bool {
        if self.orders.contains_key(order_id) {
            return false;
        }
        self.orders.insert(
            order_id.to_string(),
            OrderFreeze {
                position_id,
                state: FreezeState::Reserved,
                reserved: qty,
                outstanding: qty,
            },
        );
        true
    }

    /// Frozen volume a closing fill of `fill_qty` releases from
    /// `position_id`. Zero for orders that never reserved against it.
    pub(crate) fn release_for_fill(
        &mut self,
        order_id: &str,
        position_id: &PositionKey,
        fill_qty: i64,
        policy: ReleasePolicy,
    ) -> i64 {
        let Some(entry) = self.orders.get_mut(order_id) else {
            return 0;
        };
        if &entry.position_id != position_id {
            return 0;
        }

        match policy {
            ReleasePolicy::Outstanding => {
                let released = fill_qty.min(entry.outstanding).max(0);
                entry.outstanding -= released;
                released
            }
            ReleasePolicy::Residual => {
                entry.outstanding = (entry.outstanding - fill_qty).max(0);
                fill_qty
            }
        }
    }

    /// `Reserved -> Released`. Returns the frozen volume to release, or
    /// `None` when the order is not currently `Reserved`.
    ///
    /// `residual` is the order's `volume - traded` at termination.
    pub(crate) fn release_terminal(
        &mut self,
        order_id: &str,
        residual: i64,
        policy: ReleasePolicy,
    ) -> Option<i64> {
        let entry = self.orders.get_mut(order_id)?;
        if entry.state != FreezeState::Reserved {
            return None;
        }

        let released = match policy {
            ReleasePolicy::Outstanding => entry.outstanding,
            ReleasePolicy::Residual => residual.max(0),
        };
        entry.state = FreezeState::Released;
        entry.outstanding = 0;
        Some(released)
    }
}
