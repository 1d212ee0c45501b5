// Per-tick hazard evaluation: safe-zone containment, damage accrual, and
// one-shot detonation penalties.

use std::collections::{HashMap, HashSet};

use crate::domain::charge::{Detonation, TimedCharge};
use crate::domain::geo;
use crate::domain::state::PlayerState;
use crate::domain::zone::ZoneGeometry;

/// An open stay outside the safe zone (or inside a charge zone), reset the
/// moment the player is back in safety.
#[derive(Debug, Clone, Copy)]
pub struct HazardViolation {
    pub entered_at_ms: u64,
    pub cumulative_damage: f64,
}

/// What one evaluation tick concluded for one player.
#[derive(Debug, Clone)]
pub struct PlayerTickOutcome {
    pub player_id: u64,
    pub team_id: u64,
    pub outside_safe_zone: bool,
    pub in_charge_zone: bool,
    pub damage_this_tick: f64,
    pub cumulative_damage: f64,
}

/// A detonation penalty to forward to the scoring collaborator.
#[derive(Debug, Clone, Copy)]
pub struct ChargePenalty {
    pub charge_id: u64,
    pub team_id: u64,
    pub points: i64,
}

/// Violation bookkeeping for one session.
///
/// The tracker emits damage amounts and penalties; applying them to scores
/// belongs to the external scoring collaborator.
#[derive(Debug, Default)]
pub struct HazardTracker {
    violations: HashMap<u64, HazardViolation>,
    // (charge id, team id) pairs already penalized, for idempotence under
    // re-evaluation.
    penalized: HashSet<(u64, u64)>,
}

impl HazardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates one player against the current zone geometry and charge
    /// zones. Returns `None` when the player has no location fix: the tick
    /// is skipped outright, and the open violation (if any) is neither
    /// grown nor reset.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_player(
        &mut self,
        player: &PlayerState,
        zone: &ZoneGeometry,
        damage_per_second: f64,
        charges: &[TimedCharge],
        charge_radius_m: f64,
        tick_secs: f64,
        now_ms: u64,
    ) -> Option<PlayerTickOutcome> {
        let location = player.location?;

        let outside_safe_zone = !geo::is_inside(location, zone.center, zone.radius_m);
        let in_charge_zone = charges
            .iter()
            .filter(|c| c.threatens())
            .any(|c| geo::is_inside(location, c.location, charge_radius_m));

        let (damage_this_tick, cumulative_damage) = if outside_safe_zone {
            let violation = self
                .violations
                .entry(player.id)
                .or_insert(HazardViolation {
                    entered_at_ms: now_ms,
                    cumulative_damage: 0.0,
                });
            let damage = damage_per_second * tick_secs;
            violation.cumulative_damage += damage;
            (damage, violation.cumulative_damage)
        } else {
            // Re-entry resets accrual immediately; nothing carries over.
            self.violations.remove(&player.id);
            (0.0, 0.0)
        };

        Some(PlayerTickOutcome {
            player_id: player.id,
            team_id: player.team_id,
            outside_safe_zone,
            in_charge_zone,
            damage_this_tick,
            cumulative_damage,
        })
    }

    /// Applies this tick's detonations: every team with a located player
    /// inside the blast radius is penalized once per detonation, ever.
    pub fn apply_detonations(
        &mut self,
        detonations: &[Detonation],
        players: &[PlayerState],
        charge_radius_m: f64,
        penalty_points: i64,
    ) -> Vec<ChargePenalty> {
        let mut penalties = Vec::new();
        for detonation in detonations {
            for player in players {
                let Some(location) = player.location else {
                    continue;
                };
                if !geo::is_inside(location, detonation.location, charge_radius_m) {
                    continue;
                }
                if self.penalized.insert((detonation.charge_id, player.team_id)) {
                    penalties.push(ChargePenalty {
                        charge_id: detonation.charge_id,
                        team_id: player.team_id,
                        points: penalty_points,
                    });
                }
            }
        }
        penalties
    }

    /// Drops all per-player state when a player leaves the session.
    pub fn drop_player(&mut self, player_id: u64) {
        self.violations.remove(&player_id);
    }

    pub fn violation(&self, player_id: u64) -> Option<&HazardViolation> {
        self.violations.get(&player_id)
    }
}
