//! The simulation a population is evaluated in.

/// Capability interface between a population and the world its agents live in.
///
/// Agents are plain data owned by the population. Each evaluation step the
/// population asks the environment for an agent's sensor vector, runs the
/// agent's genome on it and hands the resulting actions back.
pub trait Environment {
    type Agent;

    /// Fresh agent at the start of a generation
    fn spawn(&self) -> Self::Agent;

    /// Sensor vector, one value per genome input
    fn sense(&self, agent: &Self::Agent) -> Vec<f32>;

    /// Apply one action vector (values in {-1, 0, 1})
    fn act(&self, agent: &mut Self::Agent, actions: &[f32]);

    /// Whether the agent still takes steps
    fn is_alive(&self, agent: &Self::Agent) -> bool;

    /// Cost of the agent's current state; lower is better, never negative
    fn fitness(&self, agent: &Self::Agent) -> f32;

    /// Whether the agent reached the environment's objective
    fn is_finished(&self, _agent: &Self::Agent) -> bool {
        false
    }
}
