/// Gameplay tuning for timed charges.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer
/// sizes, etc.).
#[derive(Debug, Clone, Copy)]
pub struct ChargeTuning {
    /// Blast radius of a detonated charge in meters.
    pub radius_m: f64,

    /// Points deducted from a team caught inside a detonation.
    pub penalty_points: i64,

    /// Maximum number of concurrently armed charges per team.
    pub max_armed_per_team: usize,

    /// How long a detonated charge stays on the board so clients can show
    /// the blast before it is discarded.
    pub display_secs: u32,
}

impl Default for ChargeTuning {
    fn default() -> Self {
        Self {
            radius_m: 30.0,
            penalty_points: 300,
            max_armed_per_team: 3,
            display_secs: 5,
        }
    }
}
