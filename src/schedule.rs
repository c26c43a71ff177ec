//! Social coefficient handed to successive flock spawns.
//!
//! Every spawn drawn from the same schedule gets a smaller social
//! coefficient than the one before, down to `floor`. Whoever orchestrates
//! respawns owns the schedule; flocks never share hidden state.

use crate::agent::PsoCoefficients;

pub const DEFAULT_START: f32 = 1.0;
pub const DEFAULT_DECREMENT: f32 = 0.1;
pub const DEFAULT_FLOOR: f32 = 0.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SocialSchedule {
    start: f32,
    decrement: f32,
    floor: f32,
    spawned: u32,
}

/// Coefficients for one flock spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SocialDraw {
    pub coefficients: PsoCoefficients,
    pub run_index: u32,
    pub at_floor: bool,
}

impl Default for SocialSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_START, DEFAULT_DECREMENT, DEFAULT_FLOOR)
    }
}

impl SocialSchedule {
    pub fn new(start: f32, decrement: f32, floor: f32) -> Self {
        Self {
            start,
            decrement,
            floor,
            spawned: 0,
        }
    }

    /// Number of draws taken so far.
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Value the next draw will hand out.
    pub fn peek(&self) -> f32 {
        // Computed from the draw count rather than by repeated subtraction
        // so the sequence is exactly 1.0, 0.9, 0.8, ...
        let social = self.start - self.decrement * self.spawned as f32;
        social.max(self.floor)
    }

    pub fn next_draw(&mut self) -> SocialDraw {
        let social = self.peek();
        let draw = SocialDraw {
            coefficients: PsoCoefficients::from_social(social),
            run_index: self.spawned,
            at_floor: social <= self.floor,
        };
        self.spawned = self.spawned.saturating_add(1);
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::SocialSchedule;

    #[test]
    fn successive_draws_decrease() {
        let mut schedule = SocialSchedule::default();
        let first = schedule.next_draw();
        let second = schedule.next_draw();

        assert_eq!(first.run_index, 0);
        assert_eq!(first.coefficients.social, 1.0);
        assert_eq!(first.coefficients.cognitive, 0.0);
        assert_eq!(second.run_index, 1);
        assert!((second.coefficients.social - 0.9).abs() < 1.0e-6);
        assert!((second.coefficients.cognitive - 0.1).abs() < 1.0e-6);
        assert_eq!(schedule.spawned(), 2);
    }

    #[test]
    fn social_never_drops_below_floor() {
        let mut schedule = SocialSchedule::default();
        let draws: Vec<_> = (0..25).map(|_| schedule.next_draw()).collect();

        assert!(draws.iter().all(|d| d.coefficients.social >= 0.0));
        assert!(!draws[9].at_floor);
        assert!(draws[11].at_floor);
        assert_eq!(draws[24].coefficients.social, 0.0);
        assert_eq!(draws[24].coefficients.cognitive, 1.0);
    }

    #[test]
    fn separate_schedules_do_not_interfere() {
        let mut a = SocialSchedule::default();
        let mut b = SocialSchedule::new(0.5, 0.25, 0.1);
        a.next_draw();
        a.next_draw();

        assert_eq!(b.next_draw().coefficients.social, 0.5);
        assert_eq!(b.next_draw().coefficients.social, 0.25);
        assert_eq!(b.next_draw().coefficients.social, 0.1);
        assert!((a.peek() - 0.8).abs() < 1.0e-6);
    }
}
