//! LocalManager: wraps a gateway's handler and keeps the local position view.
//!
//! # Delivery order
//!
//! | event    | 1st                    | 2nd                 | 3rd                          |
//! |----------|------------------------|---------------------|------------------------------|
//! | contract | engine                 | prior `on_contract` |                              |
//! | position | engine (overwrite)     | prior `on_position` |                              |
//! | trade    | prior `on_trade` (raw) | engine              | prior `on_position` (local)  |
//! | order    | prior `on_order` (raw) | engine              | prior `on_position` (local)  |
//!
//! Every event reaches the prior handler, whatever the engine made of it,
//! and the engine sees every event, whatever the prior handler returned.
//! The first error in delivery order is returned. A corrected position is
//! only emitted when the engine accepted the event.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use lpm_reconcile::{EngineError, ReconciliationEngine, ReleasePolicy};
use lpm_schemas::{Contract, Order, Position, PositionKey, Trade};
use tracing::{info, warn};

use crate::{EventHandler, Gateway, GatewayError};

pub struct LocalManager {
    engine: Arc<RwLock<ReconciliationEngine>>,
    prior: Box<dyn EventHandler>,
}

impl LocalManager {
    /// Wrap `prior` directly, without a gateway.
    pub fn new(prior: Box<dyn EventHandler>, policy: ReleasePolicy) -> (Self, PositionReader) {
        let engine = Arc::new(RwLock::new(ReconciliationEngine::with_policy(policy)));
        let reader = PositionReader {
            engine: Arc::clone(&engine),
        };
        (Self { engine, prior }, reader)
    }

    /// Chain onto the gateway's current handler and take its slot.
    pub fn install<G: Gateway + ?Sized>(gateway: &mut G, policy: ReleasePolicy) -> PositionReader {
        let prior = gateway.take_handler();
        let (manager, reader) = Self::new(prior, policy);
        gateway.set_handler(Box::new(manager));
        info!(gateway = gateway.gateway_name(), %policy, "local position manager installed");
        reader
    }

    /// Run one engine update. The write guard is dropped before returning,
    /// so the prior handler may read positions while it is called.
    fn apply<T>(
        &self,
        f: impl FnOnce(&mut ReconciliationEngine) -> Result<T, EngineError>,
    ) -> Result<T, GatewayError> {
        let mut engine: RwLockWriteGuard<'_, ReconciliationEngine> =
            self.engine.write().map_err(|_| GatewayError::Poisoned)?;
        Ok(f(&mut engine)?)
    }

    fn emit(&mut self, position: Option<Position>) -> Result<(), GatewayError> {
        match position {
            Some(p) => self.prior.on_position(&p),
            None => Ok(()),
        }
    }
}

/// Keep the earlier error; log the later one.
fn first_error(
    earlier: Result<(), GatewayError>,
    later: Result<(), GatewayError>,
) -> Result<(), GatewayError> {
    match (earlier, later) {
        (Err(e), Err(dropped)) => {
            warn!(error = %e, dropped = %dropped, "second delivery error in one event");
            Err(e)
        }
        (earlier, later) => earlier.and(later),
    }
}

impl EventHandler for LocalManager {
    fn on_contract(&mut self, contract: &Contract) -> Result<(), GatewayError> {
        let applied = self.apply(|e| e.on_contract(contract));
        let forwarded = self.prior.on_contract(contract);
        first_error(applied, forwarded)
    }

    fn on_position(&mut self, position: &Position) -> Result<(), GatewayError> {
        let applied = self.apply(|e| e.on_position_snapshot(position)).map(drop);
        let forwarded = self.prior.on_position(position);
        first_error(applied, forwarded)
    }

    fn on_trade(&mut self, trade: &Trade) -> Result<(), GatewayError> {
        let forwarded = self.prior.on_trade(trade);
        let applied = match self.apply(|e| e.on_trade(trade)) {
            Ok(corrected) => self.emit(Some(corrected)),
            Err(e) => Err(e),
        };
        first_error(forwarded, applied)
    }

    fn on_order(&mut self, order: &Order) -> Result<(), GatewayError> {
        let forwarded = self.prior.on_order(order);
        let applied = match self.apply(|e| e.on_order(order)) {
            Ok(corrected) => self.emit(corrected),
            Err(e) => Err(e),
        };
        first_error(forwarded, applied)
    }
}

/// Read handle onto the locally computed positions. Returns copies.
#[derive(Clone)]
pub struct PositionReader {
    engine: Arc<RwLock<ReconciliationEngine>>,
}

impl PositionReader {
    fn read<T>(&self, f: impl FnOnce(&ReconciliationEngine) -> T) -> T {
        // Handlers never leave the engine half-updated, so a poisoned lock
        // still guards consistent state.
        let guard = self.engine.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }

    pub fn get_position(&self, key: &PositionKey) -> Option<Position> {
        self.read(|e| e.get_position(key))
    }

    /// Look up by `"<instrument_id>.<DIRECTION>"`.
    pub fn get_position_by_id(&self, position_id: &str) -> Option<Position> {
        let key = PositionKey::parse(position_id)?;
        self.get_position(&key)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.read(|e| e.positions())
    }

    pub fn contract(&self, instrument_id: &str) -> Option<Contract> {
        self.read(|e| e.contract(instrument_id))
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.read(|e| e.policy())
    }
}

impl std::fmt::Debug for PositionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionReader").finish_non_exhaustive()
    }
}
