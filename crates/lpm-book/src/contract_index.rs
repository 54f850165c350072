use std::collections::BTreeMap;

use lpm_schemas::Contract;

use crate::BookError;

/// Instrument id -> contract. Contracts are stable for the process lifetime,
/// so there is no removal.
#[derive(Clone, Debug, Default)]
pub struct ContractIndex {
    contracts: BTreeMap<String, Contract>,
}

impl ContractIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or wholesale-replace the contract. Returns the replaced entry.
    pub fn upsert(&mut self, contract: Contract) -> Option<Contract> {
        self.contracts
            .insert(contract.instrument_id.clone(), contract)
    }

    pub fn lookup(&self, instrument_id: &str) -> Result<&Contract, BookError> {
        self.contracts
            .get(instrument_id)
            .ok_or_else(|| BookError::NotFound {
                instrument_id: instrument_id.to_string(),
            })
    }

    pub fn contains(&self, instrument_id: &str) -> bool {
        self.contracts.contains_key(instrument_id)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
