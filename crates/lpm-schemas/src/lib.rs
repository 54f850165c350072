//! lpm-schemas
//!
//! Gateway-facing data model: contracts, positions, trades and orders as the
//! gateway emits them, plus the [`GatewayEvent`] envelope used by the event
//! bus and the replay journal.
//!
//! Plain data only. No accounting rules live here.

mod event;
mod objects;

pub use event::GatewayEvent;
pub use objects::{Contract, Order, Position, PositionKey, Trade};

use serde::{Deserialize, Serialize};

/// Side of an order, trade or position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an order/trade opens new exposure or reduces existing exposure.
///
/// `CloseToday` / `CloseYesterday` are the exchange-specific closing flavours
/// some futures venues require; for position keeping they behave exactly like
/// `Close`. `None` is what gateways report for instruments without an offset
/// concept.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Offset {
    None,
    Open,
    Close,
    CloseToday,
    CloseYesterday,
}

impl Offset {
    pub fn is_open(&self) -> bool {
        matches!(self, Offset::Open)
    }

    pub fn is_close(&self) -> bool {
        matches!(
            self,
            Offset::Close | Offset::CloseToday | Offset::CloseYesterday
        )
    }
}

/// Exchanges the gateway can report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Cffex,
    Shfe,
    Czce,
    Dce,
    Ine,
    Gfex,
    Sse,
    Szse,
    Smart,
    Local,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Cffex => "CFFEX",
            Exchange::Shfe => "SHFE",
            Exchange::Czce => "CZCE",
            Exchange::Dce => "DCE",
            Exchange::Ine => "INE",
            Exchange::Gfex => "GFEX",
            Exchange::Sse => "SSE",
            Exchange::Szse => "SZSE",
            Exchange::Smart => "SMART",
            Exchange::Local => "LOCAL",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle status as reported by the gateway.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Submitting,
    NotTraded,
    PartTraded,
    AllTraded,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// An active order can still receive fills.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Submitting | OrderStatus::NotTraded | OrderStatus::PartTraded
        )
    }
}
