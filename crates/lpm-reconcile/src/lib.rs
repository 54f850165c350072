//! lpm-reconcile
//!
//! Local position reconciliation engine.
//!
//! - Contracts and gateway position snapshots are stored as ground truth.
//! - Every fill updates the affected position with weighted-average cost.
//! - Closing orders reserve (freeze) position volume until they fill or
//!   terminate; the freeze ledger guarantees each order reserves at most
//!   once and releases at most once.
//! - Gateway snapshots are compared with the local view before they replace
//!   it, and any drift is reported.
//!
//! Synchronous and single-threaded by contract: callers deliver one event
//! at a time, in arrival order.

mod drift;
mod engine;
mod error;
mod freeze;
mod validate;

pub use drift::{compare_positions, DriftField, PositionDrift, SnapshotOutcome};
pub use engine::{affected_direction, ReconciliationEngine};
pub use error::{EngineError, Malformed};
pub use freeze::{FreezeLedger, FreezeState, OrderFreeze, ReleasePolicy};
