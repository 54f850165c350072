use lpm_schemas::{Position, PositionKey};

/// Relative tolerance for average price comparison.
const PRICE_TOLERANCE: f64 = 1e-9;

/// One field where the local view disagrees with a gateway snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum DriftField {
    Volume { local: i64, gateway: i64 },
    FrozenVolume { local: i64, gateway: i64 },
    AveragePrice { local: f64, gateway: f64 },
}

/// Evidence that locally computed state had drifted from what the gateway
/// reports. Purely informational: the snapshot still wins.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionDrift {
    pub position_id: PositionKey,
    pub fields: Vec<DriftField>,
}

/// Result of applying a gateway position snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotOutcome {
    /// The local position the snapshot replaced, if one existed.
    pub previous: Option<Position>,
    pub drift: Option<PositionDrift>,
}

impl SnapshotOutcome {
    pub fn is_clean(&self) -> bool {
        self.drift.is_none()
    }
}

fn prices_differ(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() > PRICE_TOLERANCE * scale
}

/// Compare the local position with a gateway snapshot for the same key.
///
/// Average price is only compared while both sides hold volume.
pub fn compare_positions(local: &Position, gateway: &Position) -> Option<PositionDrift> {
    let mut fields = Vec::new();

    if local.volume != gateway.volume {
        fields.push(DriftField::Volume {
            local: local.volume,
            gateway: gateway.volume,
        });
    }

    if local.frozen_volume != gateway.frozen_volume {
        fields.push(DriftField::FrozenVolume {
            local: local.frozen_volume,
            gateway: gateway.frozen_volume,
        });
    }

    if local.volume > 0
        && gateway.volume > 0
        && prices_differ(local.average_price, gateway.average_price)
    {
        fields.push(DriftField::AveragePrice {
            local: local.average_price,
            gateway: gateway.average_price,
        });
    }

    if fields.is_empty() {
        None
    } else {
        Some(PositionDrift {
            position_id: gateway.position_id(),
            fields,
        })
    }
}
