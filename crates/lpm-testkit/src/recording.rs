use std::sync::{Arc, Mutex, PoisonError};

use lpm_gateway::{EventHandler, GatewayError};
use lpm_schemas::{Contract, GatewayEvent, Order, Position, Trade};

/// Records every callback it receives. Clones share one log, so a test
/// keeps a clone while the boxed copy sits inside the handler chain.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    log: Arc<Mutex<Vec<GatewayEvent>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: GatewayEvent) -> Result<(), GatewayError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<GatewayEvent> {
        std::mem::take(&mut *self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(GatewayEvent::kind).collect()
    }

    /// Positions forwarded so far, in order.
    pub fn positions(&self) -> Vec<Position> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                GatewayEvent::Position(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl EventHandler for RecordingHandler {
    fn on_contract(&mut self, contract: &Contract) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Contract(contract.clone()))
    }

    fn on_position(&mut self, position: &Position) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Position(position.clone()))
    }

    fn on_trade(&mut self, trade: &Trade) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Trade(trade.clone()))
    }

    fn on_order(&mut self, order: &Order) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Order(order.clone()))
    }
}
