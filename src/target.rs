use glam::Vec3;

/// Supplies the flock's navigation goal.
///
/// Sequencing goals is the provider's business; the simulation only reads
/// the current one and reports when it has been reached.
pub trait TargetProvider {
    /// `None` before navigation starts and after it completes.
    fn current_target(&self) -> Option<Vec3>;

    /// Called once when an agent reaches the current target.
    fn advance(&mut self);
}

/// A single goal set by the host. Reaching it clears it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StaticTarget {
    target: Option<Vec3>,
    reached: u32,
}

impl StaticTarget {
    pub fn new(target: Option<Vec3>) -> Self {
        Self { target, reached: 0 }
    }

    pub fn set(&mut self, target: Vec3) {
        self.target = Some(target);
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    /// How many targets have been reached so far.
    pub fn reached(&self) -> u32 {
        self.reached
    }
}

impl TargetProvider for StaticTarget {
    fn current_target(&self) -> Option<Vec3> {
        self.target
    }

    fn advance(&mut self) {
        if self.target.take().is_some() {
            self.reached = self.reached.saturating_add(1);
        }
    }
}
