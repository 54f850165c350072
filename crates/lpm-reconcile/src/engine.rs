//! Reconciliation engine: the four inbound handlers.
//!
//! # Direction of the affected position
//!
//! ```text
//!   trade/order direction   offset   position touched
//!   LONG                    OPEN     LONG
//!   SHORT                   OPEN     SHORT
//!   LONG                    CLOSE    SHORT   (buying back a short)
//!   SHORT                   CLOSE    LONG    (selling out a long)
//! ```
//!
//! # Atomicity
//!
//! Each handler validates, works on a *copy* of the position, and writes the
//! copy back only once every step succeeded. An `Err` leaves the book, the
//! contract index and the freeze ledger exactly as they were.

use lpm_book::{ContractIndex, PositionBook};
use lpm_schemas::{Contract, Direction, Offset, Order, Position, PositionKey, Trade};
use tracing::{debug, warn};

use crate::drift::{compare_positions, SnapshotOutcome};
use crate::freeze::{FreezeLedger, FreezeState, ReleasePolicy};
use crate::{validate, EngineError, Malformed};

/// Direction of the position a trade/order with this direction and offset
/// acts on.
pub fn affected_direction(direction: Direction, offset: Offset) -> Direction {
    if offset.is_close() {
        direction.opposite()
    } else {
        direction
    }
}

/// Keeps `0 <= frozen_volume <= volume`.
fn clamp_frozen(position: &mut Position) {
    let clamped = position.frozen_volume.clamp(0, position.volume.max(0));
    if clamped != position.frozen_volume {
        warn!(
            position_id = %position.position_id(),
            frozen = position.frozen_volume,
            volume = position.volume,
            "frozen volume outside [0, volume]; clamped"
        );
        position.frozen_volume = clamped;
    }
}

#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    contracts: ContractIndex,
    book: PositionBook,
    freezes: FreezeLedger,
    policy: ReleasePolicy,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ReleasePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    // -----------------------------------------------------------------------
    // Inbound handlers
    // -----------------------------------------------------------------------

    pub fn on_contract(&mut self, contract: &Contract) -> Result<(), EngineError> {
        validate::contract(contract)?;
        if self.contracts.upsert(contract.clone()).is_some() {
            debug!(instrument_id = %contract.instrument_id, "contract replaced");
        }
        Ok(())
    }

    /// Gateway snapshot: ground truth for its key, replaces local state
    /// outright. Any disagreement with the local view is reported as drift.
    pub fn on_position_snapshot(
        &mut self,
        position: &Position,
    ) -> Result<SnapshotOutcome, EngineError> {
        validate::position(position)?;
        if !self.contracts.contains(&position.instrument_id) {
            return Err(EngineError::UnknownInstrument {
                instrument_id: position.instrument_id.clone(),
            });
        }

        let key = position.position_id();
        let drift = self
            .book
            .get(&key)
            .and_then(|local| compare_positions(local, position));

        if let Some(d) = &drift {
            warn!(position_id = %key, fields = ?d.fields, "local position drifted from gateway snapshot");
        }

        let previous = self.book.overwrite(position.clone());
        Ok(SnapshotOutcome { previous, drift })
    }

    /// Apply one fill and return the corrected position.
    pub fn on_trade(&mut self, trade: &Trade) -> Result<Position, EngineError> {
        validate::trade(trade)?;

        let direction = affected_direction(trade.direction, trade.offset);
        let mut position =
            self.book
                .get_or_create(&self.contracts, &trade.instrument_id, direction)?;
        let key = position.position_id();

        if trade.offset.is_open() {
            let new_volume = position
                .volume
                .checked_add(trade.volume)
                .ok_or_else(|| {
                    EngineError::malformed("trade", &trade.trade_id, Malformed::VolumeOverflow)
                })?;
            let cost = position.average_price * position.volume as f64
                + trade.price * trade.volume as f64;
            position.average_price = cost / new_volume as f64;
            position.volume = new_volume;
        } else {
            if trade.volume > position.volume {
                warn!(
                    position_id = %key,
                    held = position.volume,
                    requested = trade.volume,
                    trade_id = %trade.trade_id,
                    "close fill exceeds position; rejected"
                );
                return Err(EngineError::Overclose {
                    position_id: key,
                    held: position.volume,
                    requested: trade.volume,
                });
            }

            position.volume -= trade.volume;
            if position.volume == 0 {
                position.average_price = 0.0;
                position.pnl = 0.0;
            }

            let released =
                self.freezes
                    .release_for_fill(&trade.order_id, &key, trade.volume, self.policy);
            position.frozen_volume = (position.frozen_volume - released).max(0);
        }

        clamp_frozen(&mut position);
        debug!(
            position_id = %key,
            trade_id = %trade.trade_id,
            volume = position.volume,
            average_price = position.average_price,
            frozen = position.frozen_volume,
            "trade applied"
        );

        self.book.store(position.clone());
        Ok(position)
    }

    /// Track the reservation of a closing order. Returns the affected
    /// position for re-emission, or `None` for non-closing orders.
    pub fn on_order(&mut self, order: &Order) -> Result<Option<Position>, EngineError> {
        validate::order(order)?;
        if !order.offset.is_close() {
            return Ok(None);
        }

        let direction = affected_direction(order.direction, order.offset);
        let mut position =
            self.book
                .get_or_create(&self.contracts, &order.instrument_id, direction)?;
        let key = position.position_id();
        let volume_change = order.outstanding();

        match (self.freezes.state(&order.order_id), order.is_active()) {
            (FreezeState::Unseen, true) => {
                let reserve = volume_change.min(position.available());
                if reserve < volume_change {
                    warn!(
                        position_id = %key,
                        order_id = %order.order_id,
                        requested = volume_change,
                        available = position.available(),
                        "closing order exceeds unfrozen volume; reservation capped"
                    );
                }
                self.freezes.reserve(&order.order_id, key.clone(), reserve);
                position.frozen_volume += reserve;
                debug!(position_id = %key, order_id = %order.order_id, reserve, "volume frozen");
            }
            (FreezeState::Reserved, false) => {
                let released = self
                    .freezes
                    .release_terminal(&order.order_id, volume_change, self.policy)
                    .unwrap_or(0);
                position.frozen_volume = (position.frozen_volume - released).max(0);
                debug!(position_id = %key, order_id = %order.order_id, released, "volume unfrozen");
            }
            _ => {}
        }

        clamp_frozen(&mut position);
        self.book.store(position.clone());
        Ok(Some(position))
    }

    // -----------------------------------------------------------------------
    // Read surface (copies only)
    // -----------------------------------------------------------------------

    pub fn get_position(&self, key: &PositionKey) -> Option<Position> {
        self.book.get(key).cloned()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.book.snapshot()
    }

    pub fn contract(&self, instrument_id: &str) -> Option<Contract> {
        self.contracts.lookup(instrument_id).ok().cloned()
    }

    pub fn freeze_state(&self, order_id: &str) -> FreezeState {
        self.freezes.state(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpm_schemas::{Exchange, OrderStatus};

    const X: &str = "X.LOCAL";

    fn engine(policy: ReleasePolicy) -> ReconciliationEngine {
        let mut e = ReconciliationEngine::with_policy(policy);
        e.on_contract(&Contract::new("X", Exchange::Local, 1.0, "PAPER"))
            .unwrap();
        e
    }

    fn trade(id: &str, order_id: &str, dir: Direction, offset: Offset, price: f64, vol: i64) -> Trade {
        Trade {
            trade_id: id.to_string(),
            order_id: order_id.to_string(),
            instrument_id: X.to_string(),
            direction: dir,
            offset,
            price,
            volume: vol,
            datetime: None,
            gateway_id: "PAPER".to_string(),
        }
    }

    fn order(id: &str, dir: Direction, offset: Offset, vol: i64, traded: i64, status: OrderStatus) -> Order {
        Order {
            order_id: id.to_string(),
            instrument_id: X.to_string(),
            direction: dir,
            offset,
            price: 100.0,
            volume: vol,
            traded,
            status,
            datetime: None,
            gateway_id: "PAPER".to_string(),
        }
    }

    fn short_key() -> PositionKey {
        PositionKey::new(X, Direction::Short)
    }

    fn long_key() -> PositionKey {
        PositionKey::new(X, Direction::Long)
    }

    fn seed_short(e: &mut ReconciliationEngine, volume: i64, avg: f64) {
        let mut p = Position::flat(&e.contract(X).unwrap(), Direction::Short);
        p.volume = volume;
        p.average_price = avg;
        e.on_position_snapshot(&p).unwrap();
    }

    #[test]
    fn affected_direction_inverts_on_close() {
        assert_eq!(affected_direction(Direction::Long, Offset::Open), Direction::Long);
        assert_eq!(affected_direction(Direction::Long, Offset::Close), Direction::Short);
        assert_eq!(affected_direction(Direction::Short, Offset::CloseToday), Direction::Long);
        assert_eq!(affected_direction(Direction::Short, Offset::Open), Direction::Short);
    }

    #[test]
    fn open_open_close_scenario() {
        let mut e = engine(ReleasePolicy::Outstanding);

        let p = e
            .on_trade(&trade("T1", "O1", Direction::Long, Offset::Open, 100.0, 2))
            .unwrap();
        assert_eq!(p.volume, 2);
        assert_eq!(p.average_price, 100.0);

        let p = e
            .on_trade(&trade("T2", "O2", Direction::Long, Offset::Open, 106.0, 1))
            .unwrap();
        assert_eq!(p.volume, 3);
        assert!((p.average_price - 102.0).abs() < 1e-9);

        let p = e
            .on_trade(&trade("T3", "O3", Direction::Short, Offset::Close, 110.0, 3))
            .unwrap();
        assert_eq!(p.direction, Direction::Long);
        assert_eq!(p.volume, 0);
        assert_eq!(p.average_price, 0.0);
        assert_eq!(e.get_position(&long_key()).unwrap().volume, 0);
    }

    #[test]
    fn partial_close_keeps_average_price() {
        let mut e = engine(ReleasePolicy::Outstanding);
        e.on_trade(&trade("T1", "O1", Direction::Short, Offset::Open, 50.0, 4))
            .unwrap();
        let p = e
            .on_trade(&trade("T2", "O2", Direction::Long, Offset::Close, 40.0, 1))
            .unwrap();
        assert_eq!(p.direction, Direction::Short);
        assert_eq!(p.volume, 3);
        assert_eq!(p.average_price, 50.0);
    }

    #[test]
    fn close_out_resets_gateway_pnl() {
        let mut e = engine(ReleasePolicy::Outstanding);
        let mut p = Position::flat(&e.contract(X).unwrap(), Direction::Long);
        p.volume = 1;
        p.average_price = 10.0;
        p.pnl = 42.0;
        e.on_position_snapshot(&p).unwrap();

        let p = e
            .on_trade(&trade("T1", "O1", Direction::Short, Offset::Close, 12.0, 1))
            .unwrap();
        assert_eq!(p.pnl, 0.0);
        assert_eq!(p.average_price, 0.0);
    }

    #[test]
    fn unknown_instrument_is_propagated() {
        let mut e = ReconciliationEngine::new();
        let err = e
            .on_trade(&trade("T1", "O1", Direction::Long, Offset::Open, 1.0, 1))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownInstrument {
                instrument_id: X.to_string()
            }
        );
        assert!(e.positions().is_empty());
    }

    #[test]
    fn malformed_trade_leaves_book_untouched() {
        let mut e = engine(ReleasePolicy::Outstanding);
        e.on_trade(&trade("T1", "O1", Direction::Long, Offset::Open, 100.0, 2))
            .unwrap();
        let before = e.positions();

        for bad in [
            trade("T2", "O2", Direction::Long, Offset::Open, 100.0, 0),
            trade("T3", "O3", Direction::Long, Offset::Open, -1.0, 1),
            trade("T4", "O4", Direction::Long, Offset::Open, f64::NAN, 1),
            trade("T5", "O5", Direction::Long, Offset::None, 100.0, 1),
        ] {
            assert!(matches!(
                e.on_trade(&bad),
                Err(EngineError::Malformed { event: "trade", .. })
            ));
        }
        assert_eq!(e.positions(), before);
    }

    #[test]
    fn overclose_is_rejected_without_mutation() {
        let mut e = engine(ReleasePolicy::Outstanding);
        e.on_trade(&trade("T1", "O1", Direction::Long, Offset::Open, 100.0, 1))
            .unwrap();
        let err = e
            .on_trade(&trade("T2", "O2", Direction::Short, Offset::Close, 100.0, 2))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Overclose {
                position_id: long_key(),
                held: 1,
                requested: 2
            }
        );
        assert_eq!(e.get_position(&long_key()).unwrap().volume, 1);
    }

    #[test]
    fn snapshot_for_unknown_instrument_is_rejected() {
        let mut e = ReconciliationEngine::new();
        let c = Contract::new("X", Exchange::Local, 1.0, "PAPER");
        let p = Position::flat(&c, Direction::Long);
        assert!(matches!(
            e.on_position_snapshot(&p),
            Err(EngineError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn snapshot_overwrites_and_reports_drift() {
        let mut e = engine(ReleasePolicy::Outstanding);
        e.on_trade(&trade("T1", "O1", Direction::Long, Offset::Open, 100.0, 2))
            .unwrap();

        let mut truth = e.get_position(&long_key()).unwrap();
        truth.volume = 5;
        truth.average_price = 99.0;

        let outcome = e.on_position_snapshot(&truth).unwrap();
        assert_eq!(outcome.previous.unwrap().volume, 2);
        assert!(outcome.drift.is_some());
        assert_eq!(e.get_position(&long_key()).unwrap(), truth);

        // Replaying the same snapshot is a pure overwrite.
        let again = e.on_position_snapshot(&truth).unwrap();
        assert!(again.is_clean());
        assert_eq!(e.get_position(&long_key()).unwrap(), truth);
    }

    #[test]
    fn non_closing_orders_do_not_touch_positions() {
        let mut e = engine(ReleasePolicy::Outstanding);
        let out = e
            .on_order(&order("A", Direction::Long, Offset::Open, 5, 0, OrderStatus::NotTraded))
            .unwrap();
        assert!(out.is_none());
        assert!(e.positions().is_empty());
        assert_eq!(e.freeze_state("A"), FreezeState::Unseen);
    }

    #[test]
    fn cancelled_close_order_nets_to_zero() {
        let mut e = engine(ReleasePolicy::Outstanding);
        seed_short(&mut e, 5, 100.0);

        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap()
            .unwrap();
        assert_eq!(p.direction, Direction::Short);
        assert_eq!(p.frozen_volume, 5);
        assert_eq!(e.freeze_state("A"), FreezeState::Reserved);

        // Repeated active update: no-op.
        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 5);

        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::Cancelled))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 0);
        assert_eq!(e.freeze_state("A"), FreezeState::Released);

        // Repeated terminal update: no-op.
        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::Cancelled))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 0);
    }

    #[test]
    fn terminal_update_without_fills_releases_reservation() {
        // Order(A, traded=5, inactive) arrives before its fills.
        let mut e = engine(ReleasePolicy::Outstanding);
        seed_short(&mut e, 5, 100.0);
        e.on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap();
        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 5, OrderStatus::AllTraded))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 0);

        // The late fill consumes volume but releases nothing further.
        let p = e
            .on_trade(&trade("T1", "A", Direction::Long, Offset::Close, 99.0, 5))
            .unwrap();
        assert_eq!(p.volume, 0);
        assert_eq!(p.frozen_volume, 0);
    }

    #[test]
    fn fill_then_terminal_update_does_not_double_release() {
        let mut e = engine(ReleasePolicy::Outstanding);
        seed_short(&mut e, 8, 100.0);
        e.on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap();
        e.on_order(&order("B", Direction::Long, Offset::Close, 2, 0, OrderStatus::NotTraded))
            .unwrap();
        assert_eq!(e.get_position(&short_key()).unwrap().frozen_volume, 7);

        let p = e
            .on_trade(&trade("T1", "A", Direction::Long, Offset::Close, 99.0, 5))
            .unwrap();
        assert_eq!(p.volume, 3);
        assert_eq!(p.frozen_volume, 2);

        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 5, OrderStatus::AllTraded))
            .unwrap()
            .unwrap();
        // B's reservation survives.
        assert_eq!(p.frozen_volume, 2);
    }

    #[test]
    fn partial_fill_then_cancel_releases_remainder() {
        for policy in [ReleasePolicy::Outstanding, ReleasePolicy::Residual] {
            let mut e = engine(policy);
            seed_short(&mut e, 5, 100.0);
            e.on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
                .unwrap();
            e.on_trade(&trade("T1", "A", Direction::Long, Offset::Close, 99.0, 2))
                .unwrap();
            let p = e
                .on_order(&order("A", Direction::Long, Offset::Close, 5, 2, OrderStatus::Cancelled))
                .unwrap()
                .unwrap();
            assert_eq!(p.volume, 3, "{policy}");
            assert_eq!(p.frozen_volume, 0, "{policy}");
        }
    }

    #[test]
    fn residual_policy_terminal_first_waits_for_fill() {
        let mut e = engine(ReleasePolicy::Residual);
        seed_short(&mut e, 5, 100.0);
        e.on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap();
        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 5, OrderStatus::AllTraded))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 5);

        let p = e
            .on_trade(&trade("T1", "A", Direction::Long, Offset::Close, 99.0, 5))
            .unwrap();
        assert_eq!(p.volume, 0);
        assert_eq!(p.frozen_volume, 0);
    }

    #[test]
    fn reservation_is_capped_at_available_volume() {
        let mut e = engine(ReleasePolicy::Outstanding);
        seed_short(&mut e, 3, 100.0);
        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 3);
        assert_eq!(e.freezes.get("A").unwrap().reserved, 3);
    }

    #[test]
    fn unrelated_close_fill_keeps_frozen_within_volume() {
        let mut e = engine(ReleasePolicy::Outstanding);
        seed_short(&mut e, 5, 100.0);
        e.on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::NotTraded))
            .unwrap();
        let p = e
            .on_trade(&trade("T1", "MANUAL", Direction::Long, Offset::Close, 99.0, 2))
            .unwrap();
        assert_eq!(p.volume, 3);
        assert_eq!(p.frozen_volume, 3);
    }

    #[test]
    fn close_order_for_unknown_instrument_fails() {
        let mut e = ReconciliationEngine::new();
        assert!(matches!(
            e.on_order(&order("A", Direction::Long, Offset::Close, 1, 0, OrderStatus::NotTraded)),
            Err(EngineError::UnknownInstrument { .. })
        ));
        assert_eq!(e.freeze_state("A"), FreezeState::Unseen);
    }

    #[test]
    fn first_seen_inactive_order_is_ignored() {
        let mut e = engine(ReleasePolicy::Outstanding);
        seed_short(&mut e, 5, 100.0);
        let p = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 0, OrderStatus::Rejected))
            .unwrap()
            .unwrap();
        assert_eq!(p.frozen_volume, 0);
        assert_eq!(e.freeze_state("A"), FreezeState::Unseen);
    }

    #[test]
    fn malformed_order_rejected() {
        let mut e = engine(ReleasePolicy::Outstanding);
        let err = e
            .on_order(&order("A", Direction::Long, Offset::Close, 5, 6, OrderStatus::PartTraded))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Malformed {
                event: "order",
                id: "A".to_string(),
                reason: Malformed::TradedOutOfRange {
                    volume: 5,
                    traded: 6
                }
            }
        );
    }

    #[test]
    fn malformed_contract_rejected() {
        let mut e = ReconciliationEngine::new();
        let c = Contract::new("X", Exchange::Local, 0.0, "PAPER");
        assert!(matches!(
            e.on_contract(&c),
            Err(EngineError::Malformed { event: "contract", .. })
        ));
        assert!(e.contract(X).is_none());
    }
}
