use serde::{Deserialize, Serialize};

use crate::{Contract, Order, Position, Trade};

/// One gateway notification. This is the unit the event bus carries and the
/// line format of a replay journal (one JSON object per line).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    Contract(Contract),
    Position(Position),
    Trade(Trade),
    Order(Order),
}

impl GatewayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::Contract(_) => "contract",
            GatewayEvent::Position(_) => "position",
            GatewayEvent::Trade(_) => "trade",
            GatewayEvent::Order(_) => "order",
        }
    }

    pub fn instrument_id(&self) -> &str {
        match self {
            GatewayEvent::Contract(c) => &c.instrument_id,
            GatewayEvent::Position(p) => &p.instrument_id,
            GatewayEvent::Trade(t) => &t.instrument_id,
            GatewayEvent::Order(o) => &o.instrument_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Offset};

    #[test]
    fn parses_journal_line() {
        let line = r#"{"type":"trade","trade_id":"T1","order_id":"O1","instrument_id":"rb2405.SHFE","direction":"LONG","offset":"OPEN","price":3500.0,"volume":2,"gateway_id":"CTP"}"#;
        let ev: GatewayEvent = serde_json::from_str(line).unwrap();
        assert_eq!(ev.kind(), "trade");
        assert_eq!(ev.instrument_id(), "rb2405.SHFE");
        match ev {
            GatewayEvent::Trade(t) => {
                assert_eq!(t.direction, Direction::Long);
                assert_eq!(t.offset, Offset::Open);
                assert_eq!(t.volume, 2);
                assert!(t.datetime.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn position_defaults_frozen_and_pnl() {
        let line = r#"{"type":"position","instrument_id":"rb2405.SHFE","direction":"SHORT","volume":4,"average_price":3490.5,"gateway_id":"CTP"}"#;
        let ev: GatewayEvent = serde_json::from_str(line).unwrap();
        let GatewayEvent::Position(p) = ev else {
            panic!("expected position");
        };
        assert_eq!(p.frozen_volume, 0);
        assert_eq!(p.pnl, 0.0);
    }
}
