use std::{env, time::Duration};

use crate::domain::{Coordinate, ZoneConfig, ZonePhase};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("HAZARD_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3003)
}

pub fn scoring_service_url() -> String {
    env::var("SCORING_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:3005".to_string())
}

pub fn scoring_apply_timeout() -> Duration {
    let millis = env::var("SCORING_APPLY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const UPDATE_BROADCAST_CAPACITY: usize = 128;
pub const SCORING_CHANNEL_CAPACITY: usize = 256;

// The hazard loop is specified at 1 Hz; zone geometry and charge fuses are
// derived from absolute timestamps, so a slower consumer only coarsens
// updates, never drifts them.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
// Countdown between session creation and the zone timeline starting.
pub const START_COUNTDOWN: Duration = Duration::from_secs(3);

// Session new connections land in when none is specified.
pub const DEFAULT_SESSION_ID: &str = "training";

/// Built-in zone for the pinned default session: a 400 m playfield that
/// tightens in three steps.
pub fn default_training_zone() -> ZoneConfig {
    ZoneConfig {
        center: Coordinate::new(52.5200, 13.4050),
        initial_radius_m: 400.0,
        damage_per_second: 10.0,
        phases: vec![
            ZonePhase {
                target_radius_m: 250.0,
                wait_secs: 300,
                shrink_secs: 120,
                target_center: None,
            },
            ZonePhase {
                target_radius_m: 120.0,
                wait_secs: 180,
                shrink_secs: 120,
                target_center: None,
            },
            ZonePhase {
                target_radius_m: 60.0,
                wait_secs: 120,
                shrink_secs: 60,
                target_center: None,
            },
        ],
    }
}
