// Use-case level inputs/outputs for the session loop.

use tokio::sync::oneshot;

use crate::domain::{
    ChargeDuration, ChargeSnapshot, Coordinate, PlaceChargeError, PlayerTickOutcome, ZoneGeometry,
};

/// Reply channel for a synchronous charge placement request.
pub type PlaceChargeReply = oneshot::Sender<Result<ChargeSnapshot, PlaceChargeError>>;

#[derive(Debug)]
pub enum SessionEvent {
    Join {
        player_id: u64,
        team_id: u64,
        display_name: String,
    },
    Leave {
        player_id: u64,
    },
    LocationUpdate {
        player_id: u64,
        location: Coordinate,
    },
    PlaceCharge {
        player_id: u64,
        duration: ChargeDuration,
        reply: PlaceChargeReply,
    },
}

/// High-level session lifecycle broadcast to clients.
#[derive(Debug, Clone)]
pub enum SessionState {
    Briefing,
    Starting { in_seconds: u32 },
    Running,
    Ended,
}

/// Everything the presentation sink needs for one tick.
#[derive(Debug, Clone)]
pub struct HazardUpdate {
    pub tick: u64,
    pub zone: ZoneGeometry,
    pub players: Vec<PlayerTickOutcome>,
    pub charges: Vec<ChargeSnapshot>,
    pub detonated_charge_ids: Vec<u64>,
}

/// Score mutations emitted by the session loop, applied by the external
/// scoring collaborator.
#[derive(Debug, Clone)]
pub enum ScoringEvent {
    Damage {
        team_id: u64,
        amount: f64,
    },
    Penalty {
        team_id: u64,
        charge_id: u64,
        points: i64,
    },
}
