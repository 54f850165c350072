//! Position storage keyed by [`PositionKey`].
//!
//! Reads hand out clones. The only writers are `overwrite` (gateway
//! snapshots) and `store` (engine updates); both replace the entry whole, so
//! an update is never partially visible.

use std::collections::BTreeMap;

use lpm_schemas::{Direction, Position, PositionKey};

use crate::{BookError, ContractIndex};

#[derive(Clone, Debug, Default)]
pub struct PositionBook {
    positions: BTreeMap<PositionKey, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored position, or a flat one synthesised from the
    /// instrument's contract. Synthesised positions are not stored until
    /// the caller hands them back via [`store`](Self::store).
    pub fn get_or_create(
        &self,
        contracts: &ContractIndex,
        instrument_id: &str,
        direction: Direction,
    ) -> Result<Position, BookError> {
        let key = PositionKey::new(instrument_id, direction);
        if let Some(existing) = self.positions.get(&key) {
            return Ok(existing.clone());
        }

        let contract = contracts
            .lookup(instrument_id)
            .map_err(|_| BookError::UnknownInstrument {
                instrument_id: instrument_id.to_string(),
            })?;

        Ok(Position::flat(contract, direction))
    }

    /// Replace the entry at `position.position_id()` with a gateway snapshot.
    pub fn overwrite(&mut self, position: Position) -> Option<Position> {
        self.positions.insert(position.position_id(), position)
    }

    /// Persist an engine-computed position.
    pub fn store(&mut self, position: Position) -> Option<Position> {
        self.positions.insert(position.position_id(), position)
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// All positions, ordered by key.
    pub fn snapshot(&self) -> Vec<Position> {
        self.positions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
