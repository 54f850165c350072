//! Shared fixtures for scenario tests.
//!
//! - `fixtures`: terse constructors for contracts, trades, orders, snapshots.
//! - [`RecordingHandler`]: stands in for the strategy; records everything
//!   the manager forwards.
//! - [`Harness`]: a paper gateway with a recorder installed behind a
//!   [`lpm_gateway::LocalManager`].

pub mod fixtures;
mod harness;
mod recording;

pub use harness::Harness;
pub use recording::RecordingHandler;
