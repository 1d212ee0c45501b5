// The authoritative hazard loop for one session.
//
// `SessionWorld` holds all mutable session state and is driven purely by
// explicit epoch-ms timestamps, so the whole simulation is testable without
// the async driver. `session_task` is the thin tokio wrapper that feeds it
// events and wall-clock ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::domain::{
    ChargeBoard, ChargeSnapshot, ChargeTuning, Clock, HazardTracker, PlayerState, ZoneConfig,
    ZoneConfigError, ZoneTimeline,
};
use crate::use_cases::types::{HazardUpdate, ScoringEvent, SessionEvent, SessionState};

pub struct SessionWorld {
    zone: ZoneTimeline,
    board: ChargeBoard,
    tracker: HazardTracker,
    players: Vec<PlayerState>,
    tick: u64,
    tick_secs: f64,
}

impl SessionWorld {
    pub fn new(
        zone: ZoneConfig,
        started_at_ms: u64,
        tick_secs: f64,
    ) -> Result<Self, ZoneConfigError> {
        Ok(Self {
            zone: ZoneTimeline::new(zone, started_at_ms)?,
            board: ChargeBoard::new(ChargeTuning::default()),
            tracker: HazardTracker::new(),
            players: Vec::new(),
            tick: 0,
            tick_secs,
        })
    }

    pub fn handle_event(&mut self, event: SessionEvent, now_ms: u64) {
        match event {
            SessionEvent::Join {
                player_id,
                team_id,
                display_name,
            } => {
                info!(player_id, team_id, "player joined");
                if let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) {
                    // Reconnect: keep the last known fix, refresh identity.
                    player.team_id = team_id;
                    player.display_name = display_name;
                } else {
                    self.players.push(PlayerState {
                        id: player_id,
                        team_id,
                        display_name,
                        location: None,
                        last_fix_ms: None,
                    });
                }
            }
            SessionEvent::Leave { player_id } => {
                info!(player_id, "player left");
                self.players.retain(|p| p.id != player_id);
                self.tracker.drop_player(player_id);
            }
            SessionEvent::LocationUpdate {
                player_id,
                location,
            } => {
                if let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) {
                    // Latest fix wins; no buffering or reordering.
                    player.location = Some(location);
                    player.last_fix_ms = Some(now_ms);
                } else {
                    debug!(player_id, "location update for unknown player; dropped");
                }
            }
            SessionEvent::PlaceCharge {
                player_id,
                duration,
                reply,
            } => {
                let result = match self.players.iter().find(|p| p.id == player_id) {
                    Some(player) => self
                        .board
                        .place(player.team_id, player.location, duration, now_ms)
                        .map(|charge| ChargeSnapshot::of(&charge, now_ms)),
                    // A player the session never saw has no fix either.
                    None => Err(crate::domain::PlaceChargeError::LocationUnavailable),
                };
                if reply.send(result).is_err() {
                    debug!(player_id, "charge placement reply dropped");
                }
            }
        }
    }

    /// Runs one evaluation tick at `now_ms` and returns the presentation
    /// update plus the scoring events it produced.
    pub fn run_tick(&mut self, now_ms: u64) -> (HazardUpdate, Vec<ScoringEvent>) {
        self.tick += 1;

        let geometry = self.zone.geometry_at(now_ms);
        let detonations = self.board.tick(now_ms);
        let tuning = self.board.tuning();

        let mut scoring = Vec::new();
        let mut outcomes = Vec::new();
        for player in &self.players {
            let Some(outcome) = self.tracker.evaluate_player(
                player,
                &geometry,
                self.zone.damage_per_second(),
                self.board.charges(),
                tuning.radius_m,
                self.tick_secs,
                now_ms,
            ) else {
                continue;
            };
            if outcome.damage_this_tick > 0.0 {
                scoring.push(ScoringEvent::Damage {
                    team_id: outcome.team_id,
                    amount: outcome.damage_this_tick,
                });
            }
            outcomes.push(outcome);
        }

        for penalty in self.tracker.apply_detonations(
            &detonations,
            &self.players,
            tuning.radius_m,
            tuning.penalty_points,
        ) {
            scoring.push(ScoringEvent::Penalty {
                team_id: penalty.team_id,
                charge_id: penalty.charge_id,
                points: penalty.points,
            });
        }

        let update = HazardUpdate {
            tick: self.tick,
            zone: geometry,
            players: outcomes,
            charges: self
                .board
                .charges()
                .iter()
                .map(|c| ChargeSnapshot::of(c, now_ms))
                .collect(),
            detonated_charge_ids: detonations.iter().map(|d| d.charge_id).collect(),
        };
        (update, scoring)
    }
}

/// Drives one session's `SessionWorld` at the configured tick rate until
/// shutdown.
#[allow(clippy::too_many_arguments)]
pub async fn session_task(
    mut input_rx: mpsc::Receiver<SessionEvent>,
    update_tx: broadcast::Sender<HazardUpdate>,
    scoring_tx: mpsc::Sender<ScoringEvent>,
    session_state_tx: watch::Sender<SessionState>,
    zone: ZoneConfig,
    tick_interval: Duration,
    start_countdown: Duration,
    shutdown: Arc<Notify>,
    clock: Arc<dyn Clock>,
) {
    let _ = session_state_tx.send(SessionState::Starting {
        in_seconds: start_countdown.as_secs() as u32,
    });

    // The zone timeline is anchored to the instant the countdown ends.
    let live_at_ms = clock.now_epoch_ms() + start_countdown.as_millis() as u64;
    let mut world = match SessionWorld::new(zone, live_at_ms, tick_interval.as_secs_f64()) {
        Ok(world) => world,
        Err(e) => {
            // Configurations are validated at registration; reaching this
            // means the registry let a bad one through.
            error!(error = %e, "session zone configuration invalid; stopping");
            let _ = session_state_tx.send(SessionState::Ended);
            return;
        }
    };

    // Players join, report locations, and place charges during the
    // briefing window; only hazard evaluation waits for the session to go
    // live.
    let countdown = tokio::time::sleep(start_countdown);
    tokio::pin!(countdown);
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                let _ = session_state_tx.send(SessionState::Ended);
                return;
            }
            event = input_rx.recv() => match event {
                Some(event) => world.handle_event(event, clock.now_epoch_ms()),
                None => {
                    let _ = session_state_tx.send(SessionState::Ended);
                    return;
                }
            },
            _ = &mut countdown => break,
        }
    }
    let _ = session_state_tx.send(SessionState::Running);

    let mut interval = tokio::time::interval(tick_interval);
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // In-flight work for the current tick is discarded, never
                // partially applied.
                break;
            }
            event = input_rx.recv() => match event {
                Some(event) => world.handle_event(event, clock.now_epoch_ms()),
                None => break,
            },
            _ = interval.tick() => {
                let (update, scoring) = world.run_tick(clock.now_epoch_ms());
                for event in scoring {
                    // Fire-and-forget: never block the tick on the sink.
                    if let Err(e) = scoring_tx.try_send(event) {
                        warn!(error = %e, "scoring event dropped");
                    }
                }
                let _ = update_tx.send(update);
            }
        }
    }

    let _ = session_state_tx.send(SessionState::Ended);
    info!("session loop stopped");
}
