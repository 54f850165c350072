//! lpm-gateway
//!
//! Gateway-side wiring for the local position manager.
//!
//! A gateway exposes one replaceable [`EventHandler`] slot. Installing a
//! [`LocalManager`] takes whatever handler was registered, wraps it, and puts
//! the wrapper back:
//!
//! ```text
//!   gateway ──► LocalManager ──► prior handler (strategy, bus, ...)
//!                   │
//!                   └── ReconciliationEngine (Arc<RwLock<_>>) ◄── PositionReader
//! ```
//!
//! Multiple producers are funnelled through [`EventFeed`], which owns the
//! gateway and applies events strictly one at a time.

mod feed;
mod manager;
mod paper;
mod sinks;

pub use feed::{EventFeed, FeedHandle};
pub use manager::{LocalManager, PositionReader};
pub use paper::PaperGateway;
pub use sinks::{BusHandler, NullHandler};

use lpm_reconcile::EngineError;
use lpm_schemas::{Contract, GatewayEvent, Order, Position, Trade};

// ---------------------------------------------------------------------------
// Handler chain
// ---------------------------------------------------------------------------

/// The four gateway callbacks as one object.
///
/// `Send` so a handler chain can be moved onto the feed task.
pub trait EventHandler: Send {
    fn on_contract(&mut self, contract: &Contract) -> Result<(), GatewayError>;
    fn on_position(&mut self, position: &Position) -> Result<(), GatewayError>;
    fn on_trade(&mut self, trade: &Trade) -> Result<(), GatewayError>;
    fn on_order(&mut self, order: &Order) -> Result<(), GatewayError>;

    /// Route one event to the matching callback.
    fn dispatch(&mut self, event: &GatewayEvent) -> Result<(), GatewayError> {
        match event {
            GatewayEvent::Contract(c) => self.on_contract(c),
            GatewayEvent::Position(p) => self.on_position(p),
            GatewayEvent::Trade(t) => self.on_trade(t),
            GatewayEvent::Order(o) => self.on_order(o),
        }
    }
}

/// A source of gateway events with a single handler slot.
pub trait Gateway {
    fn gateway_name(&self) -> &str;

    /// Remove the current handler, leaving a [`NullHandler`] in the slot.
    fn take_handler(&mut self) -> Box<dyn EventHandler>;

    fn set_handler(&mut self, handler: Box<dyn EventHandler>);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The reconciliation engine rejected the event.
    Engine(EngineError),
    /// A previous handler panicked while holding the engine lock.
    Poisoned,
    /// The feed task has stopped; the event was not applied.
    FeedClosed,
    /// A downstream handler failed.
    Sink(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Engine(e) => write!(f, "{e}"),
            GatewayError::Poisoned => {
                write!(f, "ENGINE_POISONED: engine lock poisoned by an earlier panic")
            }
            GatewayError::FeedClosed => write!(f, "FEED_CLOSED: event feed is no longer running"),
            GatewayError::Sink(msg) => write!(f, "SINK_FAILED: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for GatewayError {
    fn from(e: EngineError) -> Self {
        GatewayError::Engine(e)
    }
}
