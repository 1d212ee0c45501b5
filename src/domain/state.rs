// Domain-level player state and per-tick snapshot types.

use crate::domain::charge::{ChargeState, TimedCharge};
use crate::domain::geo::Coordinate;

/// A connected player as the simulation sees them.
pub struct PlayerState {
    pub id: u64,
    pub team_id: u64,
    pub display_name: String,

    // Latest known device fix; authoritative at evaluation time, absent
    // until the first location update arrives (do not fabricate one).
    pub location: Option<Coordinate>,
    pub last_fix_ms: Option<u64>,
}

/// Flattened charge state shared with presentation consumers.
#[derive(Debug, Clone)]
pub struct ChargeSnapshot {
    pub id: u64,
    pub owner_team_id: u64,
    pub location: Coordinate,
    pub state: ChargeState,
    pub fuse_remaining_secs: u32,
}

impl ChargeSnapshot {
    pub fn of(charge: &TimedCharge, now_ms: u64) -> Self {
        Self {
            id: charge.id,
            owner_team_id: charge.owner_team_id,
            location: charge.location,
            state: charge.state,
            fuse_remaining_secs: charge.fuse_remaining_secs(now_ms),
        }
    }
}
