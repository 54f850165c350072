use lpm_gateway::{Gateway, GatewayError, LocalManager, PaperGateway, PositionReader};
use lpm_reconcile::ReleasePolicy;
use lpm_schemas::{Contract, Direction, GatewayEvent, Order, Position, PositionKey, Trade};

use crate::fixtures;
use crate::RecordingHandler;

/// Paper gateway → LocalManager → RecordingHandler.
pub struct Harness {
    pub gateway: PaperGateway,
    pub reader: PositionReader,
    pub recorder: RecordingHandler,
}

impl Harness {
    pub fn new(policy: ReleasePolicy) -> Self {
        let recorder = RecordingHandler::new();
        let mut gateway = PaperGateway::new(fixtures::GATEWAY);
        gateway.set_handler(Box::new(recorder.clone()));
        let reader = LocalManager::install(&mut gateway, policy);
        Self {
            gateway,
            reader,
            recorder,
        }
    }

    /// A harness with [`fixtures::contract`] already registered and the
    /// recorder drained.
    pub fn with_contract(policy: ReleasePolicy) -> Self {
        let mut h = Self::new(policy);
        h.contract(&fixtures::contract())
            .unwrap_or_else(|e| panic!("fixture contract rejected: {e}"));
        h.recorder.take();
        h
    }

    pub fn push(&mut self, event: GatewayEvent) -> Result<(), GatewayError> {
        self.gateway.push(&event)
    }

    pub fn contract(&mut self, c: &Contract) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Contract(c.clone()))
    }

    pub fn snapshot(&mut self, p: &Position) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Position(p.clone()))
    }

    pub fn trade(&mut self, t: &Trade) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Trade(t.clone()))
    }

    pub fn order(&mut self, o: &Order) -> Result<(), GatewayError> {
        self.push(GatewayEvent::Order(o.clone()))
    }

    /// Local position of `X.LOCAL` on `direction`, if one exists.
    pub fn position(&self, direction: Direction) -> Option<Position> {
        self.reader
            .get_position(&PositionKey::new(fixtures::X, direction))
    }

    pub fn volume(&self, direction: Direction) -> i64 {
        self.position(direction).map(|p| p.volume).unwrap_or(0)
    }

    pub fn frozen(&self, direction: Direction) -> i64 {
        self.position(direction)
            .map(|p| p.frozen_volume)
            .unwrap_or(0)
    }
}
