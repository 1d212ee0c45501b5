// Shrinking safe-zone schedule and geometry.
//
// The current radius/center are always recomputed from the zone start
// timestamp and the phase table, never advanced tick by tick. A consumer
// that was suspended for any amount of time gets the exact same geometry
// it would have seen ticking continuously.

use crate::domain::geo::Coordinate;

/// One wait-then-shrink step of a zone's lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct ZonePhase {
    /// Radius the safe zone shrinks to by the end of this phase.
    pub target_radius_m: f64,
    /// Seconds the zone holds still before shrinking.
    pub wait_secs: u32,
    /// Seconds over which the radius interpolates to the target.
    pub shrink_secs: u32,
    /// Where the zone center moves during the shrink; `None` keeps the
    /// previous center.
    pub target_center: Option<Coordinate>,
}

/// Instructor-authored zone configuration, fixed for a whole session.
#[derive(Debug, Clone)]
pub struct ZoneConfig {
    pub center: Coordinate,
    pub initial_radius_m: f64,
    /// Damage accrued per second while a player is outside the safe zone.
    pub damage_per_second: f64,
    pub phases: Vec<ZonePhase>,
}

/// Rejections raised at configuration load, never at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneConfigError {
    EmptyPhases,
    NonPositiveInitialRadius,
    NonPositiveRadius { phase_index: usize },
    /// Target radii must strictly decrease across the phase sequence.
    RadiusNotShrinking { phase_index: usize },
    NegativeDamageRate,
}

impl std::fmt::Display for ZoneConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneConfigError::EmptyPhases => write!(f, "zone has no phases"),
            ZoneConfigError::NonPositiveInitialRadius => {
                write!(f, "initial radius must be positive")
            }
            ZoneConfigError::NonPositiveRadius { phase_index } => {
                write!(f, "phase {phase_index} target radius must be positive")
            }
            ZoneConfigError::RadiusNotShrinking { phase_index } => {
                write!(f, "phase {phase_index} target radius does not shrink")
            }
            ZoneConfigError::NegativeDamageRate => {
                write!(f, "damage per second must not be negative")
            }
        }
    }
}

impl std::error::Error for ZoneConfigError {}

impl ZoneConfig {
    pub fn validate(&self) -> Result<(), ZoneConfigError> {
        if self.phases.is_empty() {
            return Err(ZoneConfigError::EmptyPhases);
        }
        if self.initial_radius_m <= 0.0 {
            return Err(ZoneConfigError::NonPositiveInitialRadius);
        }
        if self.damage_per_second < 0.0 {
            return Err(ZoneConfigError::NegativeDamageRate);
        }

        let mut previous_radius = self.initial_radius_m;
        for (phase_index, phase) in self.phases.iter().enumerate() {
            if phase.target_radius_m <= 0.0 {
                return Err(ZoneConfigError::NonPositiveRadius { phase_index });
            }
            if phase.target_radius_m >= previous_radius {
                return Err(ZoneConfigError::RadiusNotShrinking { phase_index });
            }
            previous_radius = phase.target_radius_m;
        }
        Ok(())
    }
}

/// Where a zone is inside its phase sequence at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePhaseState {
    Waiting { phase_index: usize },
    Shrinking { phase_index: usize },
    /// All phases consumed; radius and center are frozen at the last target.
    Final,
}

/// Snapshot of a zone's geometry for one evaluation instant.
#[derive(Debug, Clone, Copy)]
pub struct ZoneGeometry {
    pub center: Coordinate,
    pub radius_m: f64,
    pub state: ZonePhaseState,
    /// Seconds until the active phase (wait + shrink) completes; 0 in `Final`.
    pub phase_remaining_secs: u32,
}

/// A validated zone configuration anchored to its start timestamp.
#[derive(Debug, Clone)]
pub struct ZoneTimeline {
    config: ZoneConfig,
    started_at_ms: u64,
}

impl ZoneTimeline {
    pub fn new(config: ZoneConfig, started_at_ms: u64) -> Result<Self, ZoneConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            started_at_ms,
        })
    }

    pub fn damage_per_second(&self) -> f64 {
        self.config.damage_per_second
    }

    /// Geometry at `now_ms`, derived purely from absolute elapsed time.
    pub fn geometry_at(&self, now_ms: u64) -> ZoneGeometry {
        let mut remaining_ms = now_ms.saturating_sub(self.started_at_ms);
        let mut from_center = self.config.center;
        let mut from_radius = self.config.initial_radius_m;

        for (phase_index, phase) in self.config.phases.iter().enumerate() {
            let wait_ms = u64::from(phase.wait_secs) * 1000;
            let shrink_ms = u64::from(phase.shrink_secs) * 1000;
            let phase_ms = wait_ms + shrink_ms;
            let to_center = phase.target_center.unwrap_or(from_center);

            if remaining_ms < wait_ms {
                return ZoneGeometry {
                    center: from_center,
                    radius_m: from_radius,
                    state: ZonePhaseState::Waiting { phase_index },
                    phase_remaining_secs: remaining_secs(phase_ms, remaining_ms),
                };
            }
            if remaining_ms < phase_ms {
                // shrink_ms > 0 here, otherwise remaining_ms < wait_ms above.
                let progress = (remaining_ms - wait_ms) as f64 / shrink_ms as f64;
                return ZoneGeometry {
                    center: lerp_coordinate(from_center, to_center, progress),
                    radius_m: lerp(from_radius, phase.target_radius_m, progress),
                    state: ZonePhaseState::Shrinking { phase_index },
                    phase_remaining_secs: remaining_secs(phase_ms, remaining_ms),
                };
            }

            remaining_ms -= phase_ms;
            from_center = to_center;
            from_radius = phase.target_radius_m;
        }

        ZoneGeometry {
            center: from_center,
            radius_m: from_radius,
            state: ZonePhaseState::Final,
            phase_remaining_secs: 0,
        }
    }
}

fn remaining_secs(phase_ms: u64, elapsed_ms: u64) -> u32 {
    phase_ms.saturating_sub(elapsed_ms).div_ceil(1000) as u32
}

fn lerp(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress
}

fn lerp_coordinate(from: Coordinate, to: Coordinate, progress: f64) -> Coordinate {
    Coordinate {
        lat_deg: lerp(from.lat_deg, to.lat_deg, progress),
        lon_deg: lerp(from.lon_deg, to.lon_deg, progress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> Coordinate {
        Coordinate::new(52.52, 13.405)
    }

    fn single_phase_config() -> ZoneConfig {
        // wait 30 s, then shrink 100 m -> 80 m over 60 s.
        ZoneConfig {
            center: center(),
            initial_radius_m: 100.0,
            damage_per_second: 50.0,
            phases: vec![ZonePhase {
                target_radius_m: 80.0,
                wait_secs: 30,
                shrink_secs: 60,
                target_center: None,
            }],
        }
    }

    fn timeline(config: ZoneConfig) -> ZoneTimeline {
        ZoneTimeline::new(config, 0).expect("config should validate")
    }

    #[test]
    fn when_phase_list_is_empty_then_validation_rejects_it() {
        let config = ZoneConfig {
            phases: vec![],
            ..single_phase_config()
        };
        assert_eq!(config.validate(), Err(ZoneConfigError::EmptyPhases));
    }

    #[test]
    fn when_a_target_radius_grows_then_validation_rejects_it() {
        let mut config = single_phase_config();
        config.phases.push(ZonePhase {
            target_radius_m: 90.0,
            wait_secs: 10,
            shrink_secs: 10,
            target_center: None,
        });
        assert_eq!(
            config.validate(),
            Err(ZoneConfigError::RadiusNotShrinking { phase_index: 1 })
        );
    }

    #[test]
    fn when_the_first_target_matches_the_initial_radius_then_validation_rejects_it() {
        let mut config = single_phase_config();
        config.phases[0].target_radius_m = 100.0;
        assert_eq!(
            config.validate(),
            Err(ZoneConfigError::RadiusNotShrinking { phase_index: 0 })
        );
    }

    #[test]
    fn when_damage_rate_is_negative_then_validation_rejects_it() {
        let mut config = single_phase_config();
        config.damage_per_second = -1.0;
        assert_eq!(config.validate(), Err(ZoneConfigError::NegativeDamageRate));
    }

    #[test]
    fn when_inside_the_wait_window_then_zone_holds_its_radius() {
        let timeline = timeline(single_phase_config());
        for elapsed_secs in [0u64, 10, 29] {
            let geometry = timeline.geometry_at(elapsed_secs * 1000);
            assert_eq!(geometry.radius_m, 100.0);
            assert_eq!(geometry.state, ZonePhaseState::Waiting { phase_index: 0 });
        }
    }

    #[test]
    fn when_inside_the_shrink_window_then_radius_interpolates_monotonically() {
        let timeline = timeline(single_phase_config());
        let mut previous = f64::INFINITY;
        for elapsed_secs in 30u64..90 {
            let geometry = timeline.geometry_at(elapsed_secs * 1000);
            assert_eq!(
                geometry.state,
                ZonePhaseState::Shrinking { phase_index: 0 },
                "at {elapsed_secs}s"
            );
            assert!(geometry.radius_m <= previous);
            assert!(geometry.radius_m <= 100.0 && geometry.radius_m >= 80.0);
            previous = geometry.radius_m;
        }
        // Halfway through the shrink the radius is halfway to the target.
        let halfway = timeline.geometry_at(60 * 1000);
        assert!((halfway.radius_m - 90.0).abs() < 1e-9);
    }

    #[test]
    fn when_all_phases_are_consumed_then_zone_is_final_and_frozen() {
        let timeline = timeline(single_phase_config());
        for elapsed_secs in [90u64, 91, 100_000] {
            let geometry = timeline.geometry_at(elapsed_secs * 1000);
            assert_eq!(geometry.radius_m, 80.0);
            assert_eq!(geometry.state, ZonePhaseState::Final);
            assert_eq!(geometry.phase_remaining_secs, 0);
        }
    }

    #[test]
    fn when_resuming_after_a_suspension_then_geometry_matches_continuous_ticking() {
        let suspended = timeline(single_phase_config());
        // Observed once early, then nothing until 200 s.
        let _ = suspended.geometry_at(10 * 1000);
        let resumed = suspended.geometry_at(200 * 1000);

        let continuous = timeline(single_phase_config());
        let last = (0u64..=200)
            .map(|elapsed_secs| continuous.geometry_at(elapsed_secs * 1000))
            .last()
            .expect("range is non-empty");

        assert_eq!(resumed.radius_m, last.radius_m);
        assert_eq!(resumed.state, last.state);
    }

    #[test]
    fn when_a_phase_has_a_target_center_then_center_interpolates_toward_it() {
        let mut config = single_phase_config();
        let target = Coordinate::new(52.53, 13.415);
        config.phases[0].target_center = Some(target);
        let timeline = timeline(config);

        let halfway = timeline.geometry_at(60 * 1000);
        assert!((halfway.center.lat_deg - 52.525).abs() < 1e-9);
        assert!((halfway.center.lon_deg - 13.41).abs() < 1e-9);

        let done = timeline.geometry_at(90 * 1000);
        assert_eq!(done.center, target);
    }

    #[test]
    fn when_multiple_phases_are_configured_then_each_window_is_walked_in_order() {
        let mut config = single_phase_config();
        config.phases.push(ZonePhase {
            target_radius_m: 40.0,
            wait_secs: 10,
            shrink_secs: 20,
            target_center: None,
        });
        let timeline = timeline(config);

        // Second phase waits at the first phase's target radius.
        let waiting = timeline.geometry_at(95 * 1000);
        assert_eq!(waiting.radius_m, 80.0);
        assert_eq!(waiting.state, ZonePhaseState::Waiting { phase_index: 1 });

        // 110 s in: halfway through the second shrink window.
        let shrinking = timeline.geometry_at(110 * 1000);
        assert_eq!(
            shrinking.state,
            ZonePhaseState::Shrinking { phase_index: 1 }
        );
        assert!((shrinking.radius_m - 60.0).abs() < 1e-9);

        assert_eq!(timeline.geometry_at(120 * 1000).state, ZonePhaseState::Final);
    }

    #[test]
    fn when_a_phase_is_active_then_remaining_seconds_count_down_to_zero() {
        let timeline = timeline(single_phase_config());
        assert_eq!(timeline.geometry_at(0).phase_remaining_secs, 90);
        assert_eq!(timeline.geometry_at(30 * 1000).phase_remaining_secs, 60);
        assert_eq!(timeline.geometry_at(89 * 1000).phase_remaining_secs, 1);
        assert_eq!(timeline.geometry_at(95 * 1000).phase_remaining_secs, 0);
    }
}
