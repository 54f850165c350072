use lpm_schemas::{
    Contract, Direction, Exchange, GatewayEvent, Offset, Order, OrderStatus, Position, Trade,
};

pub const GATEWAY: &str = "PAPER";

/// Instrument id of [`contract`].
pub const X: &str = "X.LOCAL";

/// Multiplier-1 contract `X.LOCAL`.
pub fn contract() -> Contract {
    Contract::new("X", Exchange::Local, 1.0, GATEWAY)
}

pub fn trade(
    trade_id: &str,
    order_id: &str,
    direction: Direction,
    offset: Offset,
    price: f64,
    volume: i64,
) -> Trade {
    Trade {
        trade_id: trade_id.to_string(),
        order_id: order_id.to_string(),
        instrument_id: X.to_string(),
        direction,
        offset,
        price,
        volume,
        datetime: None,
        gateway_id: GATEWAY.to_string(),
    }
}

pub fn open_trade(trade_id: &str, direction: Direction, price: f64, volume: i64) -> Trade {
    trade(trade_id, &format!("OPEN-{trade_id}"), direction, Offset::Open, price, volume)
}

/// A fill of closing order `order_id`. `direction` is the executed side,
/// so `Short` closes the LONG position.
pub fn close_trade(
    trade_id: &str,
    order_id: &str,
    direction: Direction,
    price: f64,
    volume: i64,
) -> Trade {
    trade(trade_id, order_id, direction, Offset::Close, price, volume)
}

pub fn close_order(
    order_id: &str,
    direction: Direction,
    volume: i64,
    traded: i64,
    status: OrderStatus,
) -> Order {
    Order {
        order_id: order_id.to_string(),
        instrument_id: X.to_string(),
        direction,
        offset: Offset::Close,
        price: 0.0,
        volume,
        traded,
        status,
        datetime: None,
        gateway_id: GATEWAY.to_string(),
    }
}

pub fn snapshot(direction: Direction, volume: i64, average_price: f64, frozen_volume: i64) -> Position {
    let mut p = Position::flat(&contract(), direction);
    p.volume = volume;
    p.average_price = average_price;
    p.frozen_volume = frozen_volume;
    p
}

pub fn ev_contract() -> GatewayEvent {
    GatewayEvent::Contract(contract())
}
