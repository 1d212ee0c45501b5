// Wire protocol DTOs and conversions for public hazard server messages.
// Internal service-to-service DTOs should live outside this module.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ChargeSnapshot, ChargeState, Coordinate, PlaceChargeError, PlayerTickOutcome, ZoneConfig,
    ZoneGeometry, ZonePhase, ZonePhaseState,
};
use crate::use_cases::{HazardUpdate, SessionState};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String },
    // Snapshot of the hazard state for a given tick.
    HazardUpdate(HazardUpdateDto),
    // High-level session transitions (briefing, start, end).
    GameState(SessionStateDto),
    // Synchronous answer to a charge placement request.
    ChargeResult(ChargeResultDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message with team metadata.
    Join(JoinPayload),
    // Device location samples sent after a successful Join.
    Location(LocationDto),
    // Request to arm a timed charge at the current location.
    PlaceCharge(PlaceChargeDto),
}

/// Payload for the Join handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub team_id: u64,
    pub display_name: String,
}

/// A device location sample.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationDto {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl From<LocationDto> for Coordinate {
    fn from(location: LocationDto) -> Self {
        Coordinate::new(location.lat_deg, location.lon_deg)
    }
}

/// Charge placement request payload.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlaceChargeDto {
    pub duration_secs: u32,
}

/// Shared coordinate shape for outbound messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoordinateDto {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl From<Coordinate> for CoordinateDto {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            lat_deg: coordinate.lat_deg,
            lon_deg: coordinate.lon_deg,
        }
    }
}

impl From<CoordinateDto> for Coordinate {
    fn from(coordinate: CoordinateDto) -> Self {
        Coordinate::new(coordinate.lat_deg, coordinate.lon_deg)
    }
}

/// Snapshot of the hazard state sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct HazardUpdateDto {
    pub tick: u64,
    pub zone: ZoneStatusDto,
    pub players: Vec<PlayerHazardDto>,
    pub charges: Vec<ChargeDto>,
    pub detonated_charge_ids: Vec<String>,
}

impl From<HazardUpdate> for HazardUpdateDto {
    fn from(update: HazardUpdate) -> Self {
        Self {
            tick: update.tick,
            zone: ZoneStatusDto::from(update.zone),
            players: update.players.iter().map(PlayerHazardDto::from).collect(),
            charges: update.charges.iter().map(ChargeDto::from).collect(),
            detonated_charge_ids: update
                .detonated_charge_ids
                .iter()
                .map(u64::to_string)
                .collect(),
        }
    }
}

/// Current safe-zone geometry for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneStatusDto {
    pub center: CoordinateDto,
    pub radius_m: f64,
    pub phase: ZonePhaseStateDto,
    pub phase_remaining_secs: u32,
}

impl From<ZoneGeometry> for ZoneStatusDto {
    fn from(geometry: ZoneGeometry) -> Self {
        Self {
            center: geometry.center.into(),
            radius_m: geometry.radius_m,
            phase: geometry.state.into(),
            phase_remaining_secs: geometry.phase_remaining_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ZonePhaseStateDto {
    Waiting { phase_index: usize },
    Shrinking { phase_index: usize },
    Final,
}

impl From<ZonePhaseState> for ZonePhaseStateDto {
    fn from(state: ZonePhaseState) -> Self {
        match state {
            ZonePhaseState::Waiting { phase_index } => ZonePhaseStateDto::Waiting { phase_index },
            ZonePhaseState::Shrinking { phase_index } => {
                ZonePhaseStateDto::Shrinking { phase_index }
            }
            ZonePhaseState::Final => ZonePhaseStateDto::Final,
        }
    }
}

/// Per-player hazard flags and damage for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerHazardDto {
    pub player_id: String,
    pub team_id: u64,
    pub outside_safe_zone: bool,
    pub in_charge_zone: bool,
    pub damage_this_tick: f64,
    pub cumulative_damage: f64,
}

impl From<&PlayerTickOutcome> for PlayerHazardDto {
    fn from(outcome: &PlayerTickOutcome) -> Self {
        Self {
            player_id: outcome.player_id.to_string(),
            team_id: outcome.team_id,
            outside_safe_zone: outcome.outside_safe_zone,
            in_charge_zone: outcome.in_charge_zone,
            damage_this_tick: outcome.damage_this_tick,
            cumulative_damage: outcome.cumulative_damage,
        }
    }
}

/// Flattened charge state for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeDto {
    pub id: String,
    pub owner_team_id: u64,
    pub location: CoordinateDto,
    pub state: String,
    pub fuse_remaining_secs: u32,
}

impl From<&ChargeSnapshot> for ChargeDto {
    fn from(charge: &ChargeSnapshot) -> Self {
        let state = match charge.state {
            ChargeState::Armed => "armed",
            ChargeState::Detonated { .. } => "detonated",
            ChargeState::Expired => "expired",
        };
        Self {
            id: charge.id.to_string(),
            owner_team_id: charge.owner_team_id,
            location: charge.location.into(),
            state: state.to_string(),
            fuse_remaining_secs: charge.fuse_remaining_secs,
        }
    }
}

/// Synchronous outcome of a charge placement request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChargeResultDto {
    Placed { charge: ChargeDto },
    Rejected { reason: String },
}

/// Stable machine-readable rejection codes for placement failures.
pub fn place_charge_rejection(error: PlaceChargeError) -> &'static str {
    match error {
        PlaceChargeError::LocationUnavailable => "location_unavailable",
        PlaceChargeError::ChargeLimitExceeded => "charge_limit_exceeded",
    }
}

/// Session lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum SessionStateDto {
    Briefing,
    Starting { in_seconds: u32 },
    Running,
    Ended,
}

impl From<SessionState> for SessionStateDto {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Briefing => SessionStateDto::Briefing,
            SessionState::Starting { in_seconds } => SessionStateDto::Starting { in_seconds },
            SessionState::Running => SessionStateDto::Running,
            SessionState::Ended => SessionStateDto::Ended,
        }
    }
}

/// Instructor-authored zone configuration as received over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfigDto {
    pub center: CoordinateDto,
    pub initial_radius_m: f64,
    pub damage_per_second: f64,
    pub phases: Vec<ZonePhaseConfigDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZonePhaseConfigDto {
    pub target_radius_m: f64,
    #[serde(default)]
    pub wait_secs: u32,
    pub shrink_secs: u32,
    #[serde(default)]
    pub target_center: Option<CoordinateDto>,
}

impl From<ZoneConfigDto> for ZoneConfig {
    fn from(dto: ZoneConfigDto) -> Self {
        ZoneConfig {
            center: dto.center.into(),
            initial_radius_m: dto.initial_radius_m,
            damage_per_second: dto.damage_per_second,
            phases: dto
                .phases
                .into_iter()
                .map(|phase| ZonePhase {
                    target_radius_m: phase.target_radius_m,
                    wait_secs: phase.wait_secs,
                    shrink_secs: phase.shrink_secs,
                    target_center: phase.target_center.map(Coordinate::from),
                })
                .collect(),
        }
    }
}
