//! lpm-book
//!
//! In-memory state owned by the reconciliation engine:
//! - [`ContractIndex`]: instrument id -> contract metadata
//! - [`PositionBook`]: (instrument, direction) -> position
//!
//! Pure deterministic state. No IO, no logging, no accounting rules; the
//! engine decides what to write, this crate only stores and hands out copies.

mod contract_index;
mod position_book;

pub use contract_index::ContractIndex;
pub use position_book::PositionBook;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// `ContractIndex::lookup` found no contract for the instrument.
    NotFound { instrument_id: String },
    /// A position was requested for an instrument that has no contract, so
    /// it cannot be synthesised.
    UnknownInstrument { instrument_id: String },
}

impl std::fmt::Display for BookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { instrument_id } => {
                write!(f, "contract not found: '{instrument_id}'")
            }
            Self::UnknownInstrument { instrument_id } => {
                write!(
                    f,
                    "unknown instrument '{instrument_id}': no contract registered"
                )
            }
        }
    }
}

impl std::error::Error for BookError {}
