use lpm_schemas::{Contract, GatewayEvent, Order, Position, Trade};
use tokio::sync::broadcast;

use crate::{EventHandler, GatewayError};

/// Empty handler slot. Accepts and drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHandler;

impl EventHandler for NullHandler {
    fn on_contract(&mut self, _contract: &Contract) -> Result<(), GatewayError> {
        Ok(())
    }

    fn on_position(&mut self, _position: &Position) -> Result<(), GatewayError> {
        Ok(())
    }

    fn on_trade(&mut self, _trade: &Trade) -> Result<(), GatewayError> {
        Ok(())
    }

    fn on_order(&mut self, _order: &Order) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Publishes every event on the downstream event bus.
///
/// Having no subscribers is not an error: the bus is fire-and-forget, the
/// same as the daemon's heartbeat channel.
#[derive(Clone, Debug)]
pub struct BusHandler {
    bus: broadcast::Sender<GatewayEvent>,
}

impl BusHandler {
    /// Create a bus with room for `capacity` unread events per subscriber.
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<GatewayEvent>) {
        let (bus, rx) = broadcast::channel(capacity.max(1));
        (Self { bus }, rx)
    }

    fn publish(&self, event: GatewayEvent) -> Result<(), GatewayError> {
        let _ = self.bus.send(event);
        Ok(())
    }
}

impl EventHandler for BusHandler {
    fn on_contract(&mut self, contract: &Contract) -> Result<(), GatewayError> {
        self.publish(GatewayEvent::Contract(contract.clone()))
    }

    fn on_position(&mut self, position: &Position) -> Result<(), GatewayError> {
        self.publish(GatewayEvent::Position(position.clone()))
    }

    fn on_trade(&mut self, trade: &Trade) -> Result<(), GatewayError> {
        self.publish(GatewayEvent::Trade(trade.clone()))
    }

    fn on_order(&mut self, order: &Order) -> Result<(), GatewayError> {
        self.publish(GatewayEvent::Order(order.clone()))
    }
}
