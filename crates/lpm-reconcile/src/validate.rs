//! Boundary checks. Every handler validates its event before it reads or
//! writes any state, so a rejected event leaves the book untouched.

use lpm_schemas::{Contract, Order, Position, Trade};

use crate::{EngineError, Malformed};

fn price(event: &'static str, id: &str, field: &'static str, px: f64) -> Result<(), EngineError> {
    if !px.is_finite() {
        return Err(EngineError::malformed(event, id, Malformed::NonFinite { field }));
    }
    if px < 0.0 {
        return Err(EngineError::malformed(
            event,
            id,
            Malformed::NegativePrice { price: px },
        ));
    }
    Ok(())
}

fn instrument(event: &'static str, id: &str, instrument_id: &str) -> Result<(), EngineError> {
    if instrument_id.trim().is_empty() {
        return Err(EngineError::malformed(event, id, Malformed::EmptyInstrumentId));
    }
    Ok(())
}

pub(crate) fn contract(c: &Contract) -> Result<(), EngineError> {
    instrument("contract", &c.instrument_id, &c.instrument_id)?;
    if !c.multiplier.is_finite() {
        return Err(EngineError::malformed(
            "contract",
            &c.instrument_id,
            Malformed::NonFinite {
                field: "multiplier",
            },
        ));
    }
    if c.multiplier <= 0.0 {
        return Err(EngineError::malformed(
            "contract",
            &c.instrument_id,
            Malformed::NonPositiveMultiplier {
                multiplier: c.multiplier,
            },
        ));
    }
    Ok(())
}

pub(crate) fn position(p: &Position) -> Result<(), EngineError> {
    let id = p.position_id().to_string();
    instrument("position", &id, &p.instrument_id)?;
    if p.volume < 0 {
        return Err(EngineError::malformed(
            "position",
            &id,
            Malformed::NegativeVolume { volume: p.volume },
        ));
    }
    if p.frozen_volume < 0 {
        return Err(EngineError::malformed(
            "position",
            &id,
            Malformed::NegativeFrozen {
                frozen_volume: p.frozen_volume,
            },
        ));
    }
    if p.frozen_volume > p.volume {
        return Err(EngineError::malformed(
            "position",
            &id,
            Malformed::FrozenExceedsVolume {
                volume: p.volume,
                frozen_volume: p.frozen_volume,
            },
        ));
    }
    price("position", &id, "average_price", p.average_price)?;
    if !p.pnl.is_finite() {
        return Err(EngineError::malformed(
            "position",
            &id,
            Malformed::NonFinite { field: "pnl" },
        ));
    }
    Ok(())
}

pub(crate) fn trade(t: &Trade) -> Result<(), EngineError> {
    instrument("trade", &t.trade_id, &t.instrument_id)?;
    if t.volume <= 0 {
        return Err(EngineError::malformed(
            "trade",
            &t.trade_id,
            Malformed::NonPositiveVolume { volume: t.volume },
        ));
    }
    price("trade", &t.trade_id, "price", t.price)?;
    if !t.offset.is_open() && !t.offset.is_close() {
        return Err(EngineError::malformed("trade", &t.trade_id, Malformed::MissingOffset));
    }
    Ok(())
}

pub(crate) fn order(o: &Order) -> Result<(), EngineError> {
    if o.order_id.trim().is_empty() {
        return Err(EngineError::malformed("order", &o.order_id, Malformed::EmptyOrderId));
    }
    instrument("order", &o.order_id, &o.instrument_id)?;
    if o.volume <= 0 {
        return Err(EngineError::malformed(
            "order",
            &o.order_id,
            Malformed::NonPositiveVolume { volume: o.volume },
        ));
    }
    if o.traded < 0 || o.traded > o.volume {
        return Err(EngineError::malformed(
            "order",
            &o.order_id,
            Malformed::TradedOutOfRange {
                volume: o.volume,
                traded: o.traded,
            },
        ));
    }
    price("order", &o.order_id, "price", o.price)
}
