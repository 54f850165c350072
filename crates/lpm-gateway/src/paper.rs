//! Deterministic in-memory gateway.
//!
//! - No connectivity; events are pushed in by the caller.
//! - Each event goes straight to the handler slot, synchronously.
//! - No randomness. No timestamps are added.

use lpm_schemas::{Contract, GatewayEvent, Order, Position, Trade};
use tracing::debug;

use crate::{EventHandler, Gateway, GatewayError, NullHandler};

pub struct PaperGateway {
    name: String,
    handler: Box<dyn EventHandler>,
    delivered: u64,
}

impl PaperGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: Box::new(NullHandler),
            delivered: 0,
        }
    }

    /// Deliver one event to the handler slot.
    pub fn push(&mut self, event: &GatewayEvent) -> Result<(), GatewayError> {
        debug!(gateway = %self.name, kind = event.kind(), instrument_id = event.instrument_id(), "push");
        self.delivered += 1;
        self.handler.dispatch(event)
    }

    /// Push events in order, stopping at the first error. Returns the number
    /// of events applied.
    pub fn replay<I>(&mut self, events: I) -> Result<usize, GatewayError>
    where
        I: IntoIterator<Item = GatewayEvent>,
    {
        let mut applied = 0;
        for event in events {
            self.push(&event)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Events pushed so far, including rejected ones.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl Gateway for PaperGateway {
    fn gateway_name(&self) -> &str {
        &self.name
    }

    fn take_handler(&mut self) -> Box<dyn EventHandler> {
        std::mem::replace(&mut self.handler, Box::new(NullHandler))
    }

    fn set_handler(&mut self, handler: Box<dyn EventHandler>) {
        self.handler = handler;
    }
}

/// A paper gateway is itself a handler: whatever it is handed goes through
/// its slot. This is what lets [`crate::EventFeed`] own it.
impl EventHandler for PaperGateway {
    fn on_contract(&mut self, contract: &Contract) -> Result<(), GatewayError> {
        self.push(&GatewayEvent::Contract(contract.clone()))
    }

    fn on_position(&mut self, position: &Position) -> Result<(), GatewayError> {
        self.push(&GatewayEvent::Position(position.clone()))
    }

    fn on_trade(&mut self, trade: &Trade) -> Result<(), GatewayError> {
        self.push(&GatewayEvent::Trade(trade.clone()))
    }

    fn on_order(&mut self, order: &Order) -> Result<(), GatewayError> {
        self.push(&GatewayEvent::Order(order.clone()))
    }

    fn dispatch(&mut self, event: &GatewayEvent) -> Result<(), GatewayError> {
        self.push(event)
    }
}

impl std::fmt::Debug for PaperGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperGateway")
            .field("name", &self.name)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}
