use lpm_book::BookError;
use lpm_schemas::PositionKey;

// ---------------------------------------------------------------------------
// Malformed input
// ---------------------------------------------------------------------------

/// Why an inbound event was rejected before any state was touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Malformed {
    EmptyInstrumentId,
    EmptyOrderId,
    /// Trade / order volume must be strictly positive.
    NonPositiveVolume { volume: i64 },
    /// Snapshot volume must be non-negative.
    NegativeVolume { volume: i64 },
    NegativeFrozen { frozen_volume: i64 },
    FrozenExceedsVolume { volume: i64, frozen_volume: i64 },
    /// Cumulative traded quantity must lie in `0..=volume`.
    TradedOutOfRange { volume: i64, traded: i64 },
    NegativePrice { price: f64 },
    /// NaN or infinite price / multiplier.
    NonFinite { field: &'static str },
    NonPositiveMultiplier { multiplier: f64 },
    /// Trades must carry an open or close offset.
    MissingOffset,
    /// Adding the fill would overflow the position volume.
    VolumeOverflow,
}

impl std::fmt::Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInstrumentId => write!(f, "instrument_id is empty"),
            Self::EmptyOrderId => write!(f, "order_id is empty"),
            Self::NonPositiveVolume { volume } => write!(f, "volume must be > 0, got {volume}"),
            Self::NegativeVolume { volume } => write!(f, "volume must be >= 0, got {volume}"),
            Self::NegativeFrozen { frozen_volume } => {
                write!(f, "frozen_volume must be >= 0, got {frozen_volume}")
            }
            Self::FrozenExceedsVolume {
                volume,
                frozen_volume,
            } => write!(f, "frozen_volume {frozen_volume} exceeds volume {volume}"),
            Self::TradedOutOfRange { volume, traded } => {
                write!(f, "traded {traded} outside 0..={volume}")
            }
            Self::NegativePrice { price } => write!(f, "price must be >= 0, got {price}"),
            Self::NonFinite { field } => write!(f, "{field} is not a finite number"),
            Self::NonPositiveMultiplier { multiplier } => {
                write!(f, "multiplier must be > 0, got {multiplier}")
            }
            Self::MissingOffset => write!(f, "trade has no open/close offset"),
            Self::VolumeOverflow => write!(f, "position volume would overflow"),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors surfaced by the engine handlers. On any error the book is left
/// exactly as it was before the call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The event references an instrument with no registered contract.
    UnknownInstrument { instrument_id: String },
    /// Rejected at the boundary.
    Malformed {
        /// `"contract" | "position" | "trade" | "order"`
        event: &'static str,
        /// Identifier of the offending event (trade id, order id, ...).
        id: String,
        reason: Malformed,
    },
    /// A closing fill larger than the position it closes.
    Overclose {
        position_id: PositionKey,
        held: i64,
        requested: i64,
    },
}

impl EngineError {
    pub(crate) fn malformed(event: &'static str, id: &str, reason: Malformed) -> Self {
        Self::Malformed {
            event,
            id: id.to_string(),
            reason,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownInstrument { instrument_id } => {
                write!(
                    f,
                    "UNKNOWN_INSTRUMENT: no contract registered for '{instrument_id}'"
                )
            }
            Self::Malformed { event, id, reason } => {
                write!(f, "MALFORMED_{}: '{id}': {reason}", event.to_ascii_uppercase())
            }
            Self::Overclose {
                position_id,
                held,
                requested,
            } => write!(
                f,
                "OVERCLOSE: {position_id} holds {held}, close fill requested {requested}"
            ),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<BookError> for EngineError {
    fn from(e: BookError) -> Self {
        match e {
            BookError::NotFound { instrument_id } | BookError::UnknownInstrument { instrument_id } => {
                Self::UnknownInstrument { instrument_id }
            }
        }
    }
}
