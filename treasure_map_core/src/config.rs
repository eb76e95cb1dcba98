use serde::{Deserialize, Serialize};

/// How the simulation treats command characters other than `A`, `G` and `D`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandPolicy {
    /// Unknown commands use up the adventurer's turn and do nothing else.
    #[default]
    Lenient,
    /// Any unknown command rejects the scenario before the first round.
    Strict,
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    pub command_policy: CommandPolicy,
}

impl SimConfig {
    /// Set how unknown command characters are handled.
    pub fn with_command_policy(mut self, policy: CommandPolicy) -> Self {
        self.command_policy = policy;
        self
    }

    /// Shorthand for a config using [`CommandPolicy::Strict`].
    pub fn strict() -> Self {
        Self::default().with_command_policy(CommandPolicy::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_lenient() {
        assert_eq!(SimConfig::default().command_policy, CommandPolicy::Lenient);
    }

    #[test]
    fn builder_sets_policy() {
        assert_eq!(SimConfig::strict().command_policy, CommandPolicy::Strict);
        let config = SimConfig::strict().with_command_policy(CommandPolicy::Lenient);
        assert_eq!(config, SimConfig::default());
    }
}
