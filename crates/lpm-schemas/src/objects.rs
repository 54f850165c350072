use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Direction, Exchange, Offset, OrderStatus};

// ---------------------------------------------------------------------------
// PositionKey
// ---------------------------------------------------------------------------

/// Composite key of one position: (instrument, direction).
///
/// `Display` renders the textual position id, e.g. `rb2405.SHFE.LONG`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub instrument_id: String,
    pub direction: Direction,
}

impl PositionKey {
    pub fn new(instrument_id: impl Into<String>, direction: Direction) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            direction,
        }
    }

    /// Parse a textual position id (`<instrument_id>.<LONG|SHORT>`).
    ///
    /// The instrument id itself may contain dots, so the direction is taken
    /// from the last segment.
    pub fn parse(position_id: &str) -> Option<Self> {
        let (instrument_id, direction) = position_id.rsplit_once('.')?;
        if instrument_id.is_empty() {
            return None;
        }
        let direction = match direction {
            "LONG" => Direction::Long,
            "SHORT" => Direction::Short,
            _ => return None,
        };
        Some(Self::new(instrument_id, direction))
    }
}

impl std::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.instrument_id, self.direction)
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Static instrument metadata. Overwritten wholesale on re-notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub instrument_id: String,
    pub symbol: String,
    pub exchange: Exchange,
    /// Contract size.
    pub multiplier: f64,
    #[serde(default)]
    pub price_tick: f64,
    pub gateway_id: String,
}

impl Contract {
    /// Build a contract whose instrument id is `<symbol>.<EXCHANGE>`.
    pub fn new(
        symbol: impl Into<String>,
        exchange: Exchange,
        multiplier: f64,
        gateway_id: impl Into<String>,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            instrument_id: format!("{symbol}.{exchange}"),
            symbol,
            exchange,
            multiplier,
            price_tick: 0.0,
            gateway_id: gateway_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Net exposure for one (instrument, direction).
///
/// `average_price` only carries meaning while `volume > 0`.
/// `frozen_volume` is the part of `volume` committed to open closing orders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument_id: String,
    pub direction: Direction,
    pub volume: i64,
    pub average_price: f64,
    #[serde(default)]
    pub frozen_volume: i64,
    /// Gateway-reported P&L. Carried through, zeroed on close-out.
    #[serde(default)]
    pub pnl: f64,
    pub gateway_id: String,
}

impl Position {
    /// A flat position for `contract` on the given side.
    pub fn flat(contract: &Contract, direction: Direction) -> Self {
        Self {
            instrument_id: contract.instrument_id.clone(),
            direction,
            volume: 0,
            average_price: 0.0,
            frozen_volume: 0,
            pnl: 0.0,
            gateway_id: contract.gateway_id.clone(),
        }
    }

    pub fn position_id(&self) -> PositionKey {
        PositionKey::new(self.instrument_id.clone(), self.direction)
    }

    pub fn is_flat(&self) -> bool {
        self.volume == 0
    }

    /// Volume not yet reserved by closing orders.
    pub fn available(&self) -> i64 {
        (self.volume - self.frozen_volume).max(0)
    }
}

// ---------------------------------------------------------------------------
// Trade
// ---------------------------------------------------------------------------

/// One fill. `direction` is the side actually executed, not the position it
/// affects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub order_id: String,
    pub instrument_id: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: i64,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    pub gateway_id: String,
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A live or terminated order instruction. `traded` is cumulative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub instrument_id: String,
    pub direction: Direction,
    pub offset: Offset,
    #[serde(default)]
    pub price: f64,
    pub volume: i64,
    #[serde(default)]
    pub traded: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    pub gateway_id: String,
}

impl Order {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Requested quantity not yet filled.
    pub fn outstanding(&self) -> i64 {
        self.volume - self.traded
    }
}
