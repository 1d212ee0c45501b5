// Domain layer: hazard simulation types and rules.

pub mod charge;
pub mod clock;
pub mod geo;
pub mod hazard;
pub mod state;
pub mod tuning;
pub mod zone;

pub use charge::{
    ChargeBoard, ChargeDuration, ChargeState, Detonation, PlaceChargeError, TimedCharge,
};
pub use clock::{Clock, SystemClock};
pub use geo::Coordinate;
pub use hazard::{ChargePenalty, HazardTracker, PlayerTickOutcome};
pub use state::{ChargeSnapshot, PlayerState};
pub use tuning::ChargeTuning;
pub use zone::{ZoneConfig, ZoneConfigError, ZoneGeometry, ZonePhase, ZonePhaseState, ZoneTimeline};
