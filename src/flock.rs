use glam::Vec3;
use rand::Rng;

use crate::agent::{Agent, AgentId, AgentState};
use crate::bounds::WorldBounds;
use crate::config::{FlockConfig, UpdateOrder};
use crate::error::ConfigError;
use crate::math;
use crate::neighbors::{NeighborIndex, NeighborView};
use crate::schedule::SocialSchedule;

/// Outcome of one [`Flock::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub step_index: u64,
    /// Total neighbor indices returned to agents this tick (self included).
    pub neighbors_visited: usize,
    /// First agent, in flock order, within the arrival radius of the target.
    pub arrived: Option<AgentId>,
}

pub struct Flock {
    agents: Vec<Agent>,
    bounds: WorldBounds,
    config: FlockConfig,
    run_index: u32,
    index: NeighborIndex,
    states: Vec<AgentState>,
    scratch: Vec<usize>,
    step_index: u64,
}

impl Flock {
    /// Creates `config.count` agents inside a sphere of `spawn_radius`
    /// around `spawn_point`. All agents share the coefficients drawn from
    /// `schedule`.
    pub fn spawn<R>(
        config: FlockConfig,
        bounds: WorldBounds,
        schedule: &mut SocialSchedule,
        rng: &mut R,
    ) -> Result<Self, ConfigError>
    where
        R: Rng + ?Sized,
    {
        config.validate()?;

        let draw = schedule.next_draw();
        let params = config.agent_params(draw.coefficients);
        let agents = (1..=config.count)
            .map(|id| {
                let position =
                    config.spawn_point + random_in_unit_sphere(rng) * config.spawn_radius;
                let velocity = bounds.random_velocity(rng);
                Agent::new(id as AgentId, position, velocity, params)
            })
            .collect();

        if draw.at_floor {
            tracing::warn!(
                run_index = draw.run_index,
                social = draw.coefficients.social,
                "social coefficient has reached its floor"
            );
        }
        tracing::debug!(
            count = config.count,
            run_index = draw.run_index,
            social = draw.coefficients.social,
            cognitive = draw.coefficients.cognitive,
            "spawned flock"
        );

        Ok(Self::assemble(config, bounds, draw.run_index, agents))
    }

    /// Builds a flock around agents created elsewhere, e.g. a replayed
    /// scenario.
    pub fn with_agents(
        config: FlockConfig,
        bounds: WorldBounds,
        agents: Vec<Agent>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, bounds, 0, agents))
    }

    fn assemble(config: FlockConfig, bounds: WorldBounds, run_index: u32, agents: Vec<Agent>) -> Self {
        let index = NeighborIndex::new(config.neighbor_index, config.perception_radius);
        let count = agents.len();
        Self {
            agents,
            bounds,
            config,
            run_index,
            index,
            states: Vec::with_capacity(count),
            scratch: Vec::with_capacity(count),
            step_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, i: usize) -> Option<&Agent> {
        self.agents.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Which draw of the social schedule this flock received.
    pub fn run_index(&self) -> u32 {
        self.run_index
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    /// Agents strictly closer than `radius` to `point`, in flock order.
    pub fn query(&self, point: Vec3, radius: f32) -> impl Iterator<Item = &Agent> + '_ {
        let radius_sq = radius * radius;
        self.agents
            .iter()
            .filter(move |a| math::distance_sq(a.position(), point) < radius_sq)
    }

    pub fn centroid(&self) -> Option<Vec3> {
        if self.agents.is_empty() {
            return None;
        }
        let sum: Vec3 = self.agents.iter().map(Agent::position).sum();
        Some(sum / self.agents.len() as f32)
    }

    pub fn global_best(&self, target: Vec3) -> Option<Vec3> {
        let states: Vec<AgentState> = self.agents.iter().map(Agent::state).collect();
        global_best_of(&states, target)
    }

    pub fn step(&mut self, dt: f32, target: Option<Vec3>) -> TickReport {
        self.step_index = self.step_index.wrapping_add(1);

        self.states.clear();
        self.states.extend(self.agents.iter().map(Agent::state));

        let neighbors_visited = match self.config.update_order {
            UpdateOrder::Snapshot => self.step_snapshot(dt, target),
            UpdateOrder::Sequential => self.step_sequential(dt, target),
        };

        let arrived = target.and_then(|t| self.arrival(t));
        tracing::trace!(
            step = self.step_index,
            neighbors_visited,
            arrived = ?arrived,
            "flock tick"
        );

        self.debug_validate_state();
        TickReport {
            step_index: self.step_index,
            neighbors_visited,
            arrived,
        }
    }

    fn step_snapshot(&mut self, dt: f32, target: Option<Vec3>) -> usize {
        self.index.rebuild(&self.states);
        let view = self.index.view(&self.states);
        // One snapshot per tick, so the global best is the same for every
        // agent and is recomputed next tick.
        let global_best = target.and_then(|t| global_best_of(&self.states, t));

        let mut visited = 0;
        for (i, agent) in self.agents.iter_mut().enumerate() {
            visited += agent.update(
                i,
                &view,
                global_best,
                target,
                &self.bounds,
                dt,
                self.config.math_mode,
                &mut self.scratch,
            );
        }
        visited
    }

    fn step_sequential(&mut self, dt: f32, target: Option<Vec3>) -> usize {
        let mut visited = 0;
        for i in 0..self.agents.len() {
            let global_best = target.and_then(|t| global_best_of(&self.states, t));
            let view = NeighborView::brute_force(&self.states);
            visited += self.agents[i].update(
                i,
                &view,
                global_best,
                target,
                &self.bounds,
                dt,
                self.config.math_mode,
                &mut self.scratch,
            );
            self.states[i] = self.agents[i].state();
        }
        visited
    }

    fn arrival(&self, target: Vec3) -> Option<AgentId> {
        let radius_sq = self.config.arrival_radius * self.config.arrival_radius;
        self.agents
            .iter()
            .find(|a| math::distance_sq(a.position(), target) < radius_sq)
            .map(Agent::id)
    }

    fn debug_validate_state(&self) {
        if cfg!(debug_assertions) {
            for agent in &self.agents {
                debug_assert!(
                    agent.velocity().length() <= agent.speed() * (1.0 + 1.0e-4) + 1.0e-6,
                    "agent {} exceeds its speed cap",
                    agent.id()
                );
                debug_assert!(agent.position().is_finite());
            }
        }
    }
}

/// Personal best closest to `target`. Ties keep the first in scan order.
pub fn global_best_of<'a, I>(states: I, target: Vec3) -> Option<Vec3>
where
    I: IntoIterator<Item = &'a AgentState>,
{
    let mut best: Option<(f32, Vec3)> = None;
    for state in states {
        let dist_sq = math::distance_sq(state.personal_best, target);
        match best {
            Some((best_sq, _)) if best_sq <= dist_sq => {}
            _ => best = Some((dist_sq, state.personal_best)),
        }
    }
    best.map(|(_, position)| position)
}

fn random_in_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{global_best_of, Flock};
    use crate::agent::{Agent, AgentParams, AgentState, PsoCoefficients, Weights};
    use crate::bounds::WorldBounds;
    use crate::config::{FlockConfig, UpdateOrder};
    use crate::math::MathMode;
    use crate::neighbors::IndexKind;
    use crate::schedule::SocialSchedule;
    use glam::Vec3;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn arena() -> WorldBounds {
        WorldBounds::from_markers([
            Vec3::new(60.0, 0.0, 0.0),
            Vec3::new(-60.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 60.0),
            Vec3::new(0.0, 0.0, -60.0),
        ])
    }

    fn spawn(config: FlockConfig, seed: u64) -> Flock {
        let mut schedule = SocialSchedule::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        Flock::spawn(config, arena(), &mut schedule, &mut rng).unwrap()
    }

    fn trio(order: UpdateOrder) -> Flock {
        let params = AgentParams {
            weights: Weights::default(),
            pso: PsoCoefficients::from_social(0.5),
            perception_radius: 5.0,
            speed: 2.0,
        };
        let agents = (1..=3)
            .map(|id| Agent::new(id, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), params))
            .collect();
        let config = FlockConfig {
            count: 3,
            speed: 2.0,
            perception_radius: 5.0,
            update_order: order,
            ..Default::default()
        };
        Flock::with_agents(config, arena(), agents).unwrap()
    }

    #[test]
    fn spawn_places_agents_around_spawn_point() {
        let config = FlockConfig {
            count: 40,
            spawn_point: Vec3::new(3.0, 12.0, -4.0),
            spawn_radius: 2.5,
            ..Default::default()
        };
        let flock = spawn(config, 5);

        assert_eq!(flock.len(), 40);
        for (i, agent) in flock.iter().enumerate() {
            assert_eq!(agent.id() as usize, i + 1);
            assert!((agent.position() - Vec3::new(3.0, 12.0, -4.0)).length() <= 2.5 + 1.0e-4);
            assert_eq!(agent.personal_best(), agent.position());
            assert_eq!(agent.pso().social, 1.0);
            assert_eq!(agent.perception_radius(), 5.0);
        }
    }

    #[test]
    fn later_spawns_are_less_social() {
        let mut schedule = SocialSchedule::default();
        let mut rng = SmallRng::seed_from_u64(9);
        let first = Flock::spawn(FlockConfig::default(), arena(), &mut schedule, &mut rng).unwrap();
        let second = Flock::spawn(FlockConfig::default(), arena(), &mut schedule, &mut rng).unwrap();

        assert_eq!(first.run_index(), 0);
        assert_eq!(second.run_index(), 1);
        let social = |f: &Flock| f.get(0).map(|a| a.pso().social).unwrap();
        assert!(social(&second) < social(&first));
        let pso = second.get(0).unwrap().pso();
        assert!((pso.cognitive + pso.social - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let mut schedule = SocialSchedule::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let config = FlockConfig {
            perception_radius: f32::INFINITY,
            ..Default::default()
        };
        assert!(Flock::spawn(config, arena(), &mut schedule, &mut rng).is_err());
        assert_eq!(schedule.spawned(), 0);
    }

    #[test]
    fn tied_personal_bests_pick_the_first() {
        let target = Vec3::new(10.0, 0.0, 0.0);
        let flock = trio(UpdateOrder::Snapshot);
        assert_eq!(flock.global_best(target), Some(Vec3::ZERO));

        let global_best = flock.global_best(target);
        let forces: Vec<Vec3> = flock
            .iter()
            .map(|a| a.pathfinding_force(global_best, MathMode::Accurate))
            .collect();
        assert_eq!(forces[0], forces[1]);
        assert_eq!(forces[1], forces[2]);

        let state = |id, pb| AgentState {
            id,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            personal_best: pb,
        };
        let states = [
            state(1, Vec3::new(10.0, 1.0, 0.0)),
            state(2, Vec3::new(10.0, -1.0, 0.0)),
            state(3, Vec3::new(0.0, 0.0, 0.0)),
        ];
        assert_eq!(global_best_of(&states, target), Some(Vec3::new(10.0, 1.0, 0.0)));
        assert_eq!(global_best_of(&[] as &[AgentState], target), None);
    }

    #[test]
    fn snapshot_tick_treats_identical_agents_identically() {
        let target = Vec3::new(10.0, 0.0, 0.0);
        let mut flock = trio(UpdateOrder::Snapshot);
        let report = flock.step(0.1, Some(target));

        assert_eq!(report.step_index, 1);
        assert_eq!(report.neighbors_visited, 9);
        let first = flock.get(0).unwrap().state();
        for agent in flock.iter() {
            assert_eq!(agent.position(), first.position);
            assert_eq!(agent.velocity(), first.velocity);
            assert_eq!(agent.personal_best(), first.personal_best);
        }
        assert!((first.velocity - Vec3::new(0.5, 0.0, 0.0)).length() < 1.0e-5);
        assert_eq!(flock.global_best(target), Some(first.personal_best));
    }

    #[test]
    fn sequential_tick_lets_later_agents_see_earlier_moves() {
        let target = Vec3::new(10.0, 0.0, 0.0);
        let mut flock = trio(UpdateOrder::Sequential);
        flock.step(0.1, Some(target));

        let first = flock.get(0).unwrap();
        let second = flock.get(1).unwrap();
        assert!((first.position().x - 0.05).abs() < 1.0e-5);
        assert!((second.position().x - 0.1).abs() < 1.0e-5);
    }

    #[test]
    fn invariants_hold_over_many_ticks() {
        let target = Vec3::new(40.0, 20.0, -35.0);
        for (order, math_mode) in [
            (UpdateOrder::Snapshot, MathMode::Accurate),
            (UpdateOrder::Sequential, MathMode::Fast),
        ] {
            let config = FlockConfig {
                count: 30,
                update_order: order,
                math_mode,
                ..Default::default()
            };
            let mut flock = spawn(config, 21);
            let mut best: Vec<f32> = flock
                .iter()
                .map(|a| (a.personal_best() - target).length())
                .collect();

            for _ in 0..300 {
                flock.step(DT, Some(target));
                for (agent, previous) in flock.iter().zip(best.iter_mut()) {
                    assert!(agent.velocity().length() <= agent.speed() + 1.0e-4);
                    assert!(flock.bounds().contains(agent.position()));
                    let now = (agent.personal_best() - target).length();
                    assert!(now <= *previous);
                    *previous = now;
                }
            }
        }
    }

    #[test]
    fn grid_and_brute_force_runs_match() {
        let target = Some(Vec3::new(-20.0, 5.0, 10.0));
        let make = |kind| {
            spawn(
                FlockConfig {
                    count: 50,
                    neighbor_index: kind,
                    ..Default::default()
                },
                77,
            )
        };
        let mut grid = make(IndexKind::Grid);
        let mut scan = make(IndexKind::BruteForce);

        for _ in 0..100 {
            let a = grid.step(DT, target);
            let b = scan.step(DT, target);
            assert_eq!(a.neighbors_visited, b.neighbors_visited);
        }
        assert_eq!(grid.agents(), scan.agents());
    }

    #[test]
    fn same_seed_replays_exactly() {
        let mut a = spawn(FlockConfig::default(), 3);
        let mut b = spawn(FlockConfig::default(), 3);
        for _ in 0..50 {
            a.step(DT, Some(Vec3::new(5.0, 5.0, 5.0)));
            b.step(DT, Some(Vec3::new(5.0, 5.0, 5.0)));
        }
        assert_eq!(a.agents(), b.agents());
    }

    #[test]
    fn without_target_personal_bests_hold() {
        let mut flock = spawn(FlockConfig::default(), 4);
        let before: Vec<Vec3> = flock.iter().map(|a| a.personal_best()).collect();
        for _ in 0..20 {
            let report = flock.step(DT, None);
            assert_eq!(report.arrived, None);
        }
        let after: Vec<Vec3> = flock.iter().map(|a| a.personal_best()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn arrival_reports_first_agent_in_radius() {
        let mut flock = trio(UpdateOrder::Snapshot);
        let report = flock.step(0.1, Some(Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(report.arrived, Some(1));

        let report = flock.step(0.1, Some(Vec3::new(30.0, 0.0, 0.0)));
        assert_eq!(report.arrived, None);
    }

    #[test]
    fn queries_and_centroid() {
        let params = AgentParams {
            weights: Weights::default(),
            pso: PsoCoefficients::default(),
            perception_radius: 1.0,
            speed: 1.0,
        };
        let agents = vec![
            Agent::new(1, Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, params),
            Agent::new(2, Vec3::new(2.0, 1.0, 0.0), Vec3::ZERO, params),
            Agent::new(3, Vec3::new(4.0, 1.0, 0.0), Vec3::ZERO, params),
        ];
        let flock = Flock::with_agents(FlockConfig::default(), arena(), agents).unwrap();

        assert_eq!(flock.centroid(), Some(Vec3::new(2.0, 1.0, 0.0)));
        let ids: Vec<u32> = flock.query(Vec3::new(0.0, 1.0, 0.0), 2.0).map(Agent::id).collect();
        assert_eq!(ids, vec![1]);
        let ids: Vec<u32> = flock.query(Vec3::new(2.0, 1.0, 0.0), 2.5).map(Agent::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn agents_sharing_an_id_still_separate() {
        let params = AgentParams {
            weights: Weights {
                separation: 2.0,
                ..Default::default()
            },
            pso: PsoCoefficients::default(),
            perception_radius: 5.0,
            speed: 2.0,
        };
        let agents = vec![
            Agent::new(1, Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, params),
            Agent::new(1, Vec3::new(1.0, 5.0, 0.0), Vec3::ZERO, params),
        ];
        for order in [UpdateOrder::Snapshot, UpdateOrder::Sequential] {
            let config = FlockConfig {
                update_order: order,
                ..Default::default()
            };
            let mut flock = Flock::with_agents(config, arena(), agents.clone()).unwrap();
            let report = flock.step(0.1, None);

            assert_eq!(report.neighbors_visited, 4);
            assert!(flock.get(0).unwrap().velocity().x < 0.0);
            assert!(flock.get(1).unwrap().velocity().x > 0.0);
        }
    }

    #[test]
    fn empty_flock_ticks_quietly() {
        let mut flock = spawn(
            FlockConfig {
                count: 0,
                ..Default::default()
            },
            1,
        );
        assert!(flock.is_empty());
        assert_eq!(flock.centroid(), None);
        let report = flock.step(DT, Some(Vec3::ONE));
        assert_eq!(report.neighbors_visited, 0);
        assert_eq!(report.arrived, None);
    }
}
