use glam::Vec3;
use rand::Rng;

use crate::error::ConfigError;
use crate::flock::{Flock, TickReport};
use crate::schedule::SocialSchedule;
use crate::target::TargetProvider;

/// Drives a flock toward the goals of a [`TargetProvider`], one tick per
/// frame.
pub struct FlockSimulation<P> {
    flock: Flock,
    provider: P,
    ticks: u64,
    targets_reached: u32,
}

impl<P: TargetProvider> FlockSimulation<P> {
    pub fn new(flock: Flock, provider: P) -> Self {
        Self {
            flock,
            provider,
            ticks: 0,
            targets_reached: 0,
        }
    }

    pub fn flock(&self) -> &Flock {
        &self.flock
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn targets_reached(&self) -> u32 {
        self.targets_reached
    }

    pub fn current_target(&self) -> Option<Vec3> {
        self.provider.current_target()
    }

    /// Advances the flock by `dt` seconds. When an agent reaches the
    /// current target the provider is told to move on.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.ticks = self.ticks.wrapping_add(1);
        let target = self.provider.current_target();
        let report = self.flock.step(dt, target);

        if let Some(agent) = report.arrived {
            self.targets_reached = self.targets_reached.saturating_add(1);
            tracing::info!(
                tick = self.ticks,
                agent,
                target = ?target,
                reached = self.targets_reached,
                "target reached"
            );
            self.provider.advance();
        }

        report
    }

    /// Replaces the flock with a fresh spawn using the same configuration
    /// and bounds, drawing the next coefficients from `schedule`.
    pub fn respawn<R>(&mut self, schedule: &mut SocialSchedule, rng: &mut R) -> Result<(), ConfigError>
    where
        R: Rng + ?Sized,
    {
        let config = self.flock.config().clone();
        let bounds = *self.flock.bounds();
        self.flock = Flock::spawn(config, bounds, schedule, rng)?;
        self.ticks = 0;
        tracing::debug!(run_index = self.flock.run_index(), "respawned flock");
        Ok(())
    }
}
