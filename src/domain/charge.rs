// Player-placed timed charges and their detonation lifecycle.
//
// Countdowns are never decremented in place: a charge stores only its
// placement timestamp and fuse duration, and every transition is derived
// from the deadline against wall-clock time. A delayed or missed tick
// detonates the charge at the same deadline it always had.

use crate::domain::geo::Coordinate;
use crate::domain::tuning::ChargeTuning;

/// Supported fuse lengths for a timed charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeDuration {
    Short,
    Medium,
    Long,
}

impl ChargeDuration {
    /// Maps a requested fuse length in seconds onto a supported duration.
    pub fn from_secs(secs: u32) -> Option<Self> {
        match secs {
            30 => Some(ChargeDuration::Short),
            60 => Some(ChargeDuration::Medium),
            120 => Some(ChargeDuration::Long),
            _ => None,
        }
    }

    pub fn as_secs(self) -> u32 {
        match self {
            ChargeDuration::Short => 30,
            ChargeDuration::Medium => 60,
            ChargeDuration::Long => 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Armed,
    Detonated { at_ms: u64 },
    Expired,
}

#[derive(Debug, Clone)]
pub struct TimedCharge {
    pub id: u64,
    pub owner_team_id: u64,
    pub location: Coordinate,
    pub placed_at_ms: u64,
    pub duration: ChargeDuration,
    pub state: ChargeState,
}

impl TimedCharge {
    /// The absolute instant this charge detonates (or detonated).
    pub fn fuse_deadline_ms(&self) -> u64 {
        self.placed_at_ms + u64::from(self.duration.as_secs()) * 1000
    }

    pub fn fuse_remaining_secs(&self, now_ms: u64) -> u32 {
        match self.state {
            ChargeState::Armed => self
                .fuse_deadline_ms()
                .saturating_sub(now_ms)
                .div_ceil(1000) as u32,
            ChargeState::Detonated { .. } | ChargeState::Expired => 0,
        }
    }

    /// Whether the charge still projects a danger zone worth a containment
    /// check (armed, or detonated and inside its display window).
    pub fn threatens(&self) -> bool {
        matches!(
            self.state,
            ChargeState::Armed | ChargeState::Detonated { .. }
        )
    }
}

/// Rejections for a placement request. No partial state is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceChargeError {
    /// The placing player has no known location fix.
    LocationUnavailable,
    /// The team already has the maximum number of armed charges.
    ChargeLimitExceeded,
}

/// One-time detonation event, observed by exactly one tick.
#[derive(Debug, Clone)]
pub struct Detonation {
    pub charge_id: u64,
    pub owner_team_id: u64,
    pub location: Coordinate,
}

/// All charges of one session, owned by the session's tick loop.
#[derive(Debug)]
pub struct ChargeBoard {
    tuning: ChargeTuning,
    charges: Vec<TimedCharge>,
    next_charge_id: u64,
}

impl ChargeBoard {
    pub fn new(tuning: ChargeTuning) -> Self {
        Self {
            tuning,
            charges: Vec::new(),
            next_charge_id: 1,
        }
    }

    pub fn tuning(&self) -> ChargeTuning {
        self.tuning
    }

    pub fn charges(&self) -> &[TimedCharge] {
        &self.charges
    }

    /// Places a new armed charge at the player's current location.
    pub fn place(
        &mut self,
        owner_team_id: u64,
        location: Option<Coordinate>,
        duration: ChargeDuration,
        now_ms: u64,
    ) -> Result<TimedCharge, PlaceChargeError> {
        let location = location.ok_or(PlaceChargeError::LocationUnavailable)?;
        if self.armed_count(owner_team_id) >= self.tuning.max_armed_per_team {
            return Err(PlaceChargeError::ChargeLimitExceeded);
        }

        let charge = TimedCharge {
            id: self.next_charge_id,
            owner_team_id,
            location,
            placed_at_ms: now_ms,
            duration,
            state: ChargeState::Armed,
        };
        self.next_charge_id += 1;
        self.charges.push(charge.clone());
        Ok(charge)
    }

    /// Advances charge states against `now_ms`.
    ///
    /// Each armed charge whose fuse deadline has passed transitions to
    /// detonated and is reported exactly once; detonated charges past the
    /// display window are swept off the board.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Detonation> {
        let mut detonations = Vec::new();
        let display_ms = u64::from(self.tuning.display_secs) * 1000;

        for charge in &mut self.charges {
            if charge.state == ChargeState::Armed {
                let deadline = charge.fuse_deadline_ms();
                if now_ms >= deadline {
                    // Anchor the detonation to the deadline, not the
                    // observation instant, so the display window is not
                    // stretched by a late tick.
                    charge.state = ChargeState::Detonated { at_ms: deadline };
                    detonations.push(Detonation {
                        charge_id: charge.id,
                        owner_team_id: charge.owner_team_id,
                        location: charge.location,
                    });
                }
            }
            if let ChargeState::Detonated { at_ms } = charge.state {
                if now_ms >= at_ms + display_ms {
                    charge.state = ChargeState::Expired;
                }
            }
        }

        self.charges.retain(|c| c.state != ChargeState::Expired);
        detonations
    }

    fn armed_count(&self, owner_team_id: u64) -> usize {
        self.charges
            .iter()
            .filter(|c| c.owner_team_id == owner_team_id && c.state == ChargeState::Armed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn somewhere() -> Coordinate {
        Coordinate::new(52.52, 13.405)
    }

    fn board() -> ChargeBoard {
        ChargeBoard::new(ChargeTuning::default())
    }

    #[test]
    fn when_location_is_unavailable_then_placement_is_rejected() {
        let mut board = board();
        let result = board.place(1, None, ChargeDuration::Short, 0);
        assert_eq!(result.unwrap_err(), PlaceChargeError::LocationUnavailable);
        assert!(board.charges().is_empty());
    }

    #[test]
    fn when_team_has_three_armed_charges_then_the_fourth_is_rejected() {
        let mut board = board();
        for _ in 0..3 {
            board
                .place(1, Some(somewhere()), ChargeDuration::Short, 0)
                .expect("placement under the cap should succeed");
        }

        let result = board.place(1, Some(somewhere()), ChargeDuration::Short, 0);
        assert_eq!(result.unwrap_err(), PlaceChargeError::ChargeLimitExceeded);
        // The existing charges are unaffected.
        assert_eq!(board.charges().len(), 3);
        assert!(board.charges().iter().all(|c| c.state == ChargeState::Armed));
    }

    #[test]
    fn when_the_cap_is_reached_then_other_teams_can_still_place() {
        let mut board = board();
        for _ in 0..3 {
            board
                .place(1, Some(somewhere()), ChargeDuration::Short, 0)
                .expect("placement under the cap should succeed");
        }

        assert!(
            board
                .place(2, Some(somewhere()), ChargeDuration::Short, 0)
                .is_ok()
        );
    }

    #[test]
    fn when_the_fuse_elapses_then_the_charge_detonates_exactly_once() {
        let mut board = board();
        let charge = board
            .place(1, Some(somewhere()), ChargeDuration::Short, 0)
            .expect("placement should succeed");

        assert!(board.tick(29_999).is_empty());

        let detonations = board.tick(30_000);
        assert_eq!(detonations.len(), 1);
        assert_eq!(detonations[0].charge_id, charge.id);

        // Repeated evaluation after the deadline never re-fires.
        assert!(board.tick(30_000).is_empty());
        assert!(board.tick(31_000).is_empty());
        assert!(board.tick(32_000).is_empty());
    }

    #[test]
    fn when_a_tick_is_late_then_the_detonation_is_anchored_to_the_deadline() {
        let mut board = board();
        board
            .place(1, Some(somewhere()), ChargeDuration::Short, 0)
            .expect("placement should succeed");

        // First observation long after the fuse elapsed.
        let detonations = board.tick(33_000);
        assert_eq!(detonations.len(), 1);
        assert_eq!(
            board.charges()[0].state,
            ChargeState::Detonated { at_ms: 30_000 }
        );
    }

    #[test]
    fn when_the_display_window_passes_then_the_charge_is_discarded() {
        let mut board = board();
        board
            .place(1, Some(somewhere()), ChargeDuration::Short, 0)
            .expect("placement should succeed");

        board.tick(30_000);
        assert_eq!(board.charges().len(), 1);
        assert!(board.charges()[0].threatens());

        // Display window is 5 s by default.
        board.tick(34_999);
        assert_eq!(board.charges().len(), 1);
        board.tick(35_000);
        assert!(board.charges().is_empty());
    }

    #[test]
    fn when_a_charge_expires_then_a_new_placement_slot_opens() {
        let mut board = board();
        for _ in 0..3 {
            board
                .place(1, Some(somewhere()), ChargeDuration::Short, 0)
                .expect("placement under the cap should succeed");
        }

        // All three detonate and expire.
        board.tick(30_000);
        board.tick(35_000);

        assert!(
            board
                .place(1, Some(somewhere()), ChargeDuration::Short, 36_000)
                .is_ok()
        );
    }

    #[test]
    fn when_armed_then_fuse_remaining_counts_down_from_the_deadline() {
        let mut board = board();
        let charge = board
            .place(1, Some(somewhere()), ChargeDuration::Medium, 10_000)
            .expect("placement should succeed");

        assert_eq!(charge.fuse_deadline_ms(), 70_000);
        assert_eq!(charge.fuse_remaining_secs(10_000), 60);
        assert_eq!(charge.fuse_remaining_secs(69_100), 1);
        assert_eq!(charge.fuse_remaining_secs(75_000), 0);
    }

    #[test]
    fn when_a_duration_is_unsupported_then_it_does_not_map() {
        assert_eq!(ChargeDuration::from_secs(30), Some(ChargeDuration::Short));
        assert_eq!(ChargeDuration::from_secs(60), Some(ChargeDuration::Medium));
        assert_eq!(ChargeDuration::from_secs(120), Some(ChargeDuration::Long));
        assert_eq!(ChargeDuration::from_secs(45), None);
        assert_eq!(ChargeDuration::from_secs(0), None);
    }
}
