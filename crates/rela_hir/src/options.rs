//! Run configuration

/// Environment variable overriding [`Options::max_fixpoint_rounds`]
pub const MAX_ROUNDS_VAR: &str = "RELA_MAX_FIXPOINT_ROUNDS";

/// Knobs for one checking run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Upper bound on rounds of the parameter-binding and unit-merge loops
    pub max_fixpoint_rounds: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_fixpoint_rounds: 1024,
        }
    }
}

impl Options {
    /// Defaults, overridden by `RELA_MAX_FIXPOINT_ROUNDS` when it is set
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(raw) = std::env::var(MAX_ROUNDS_VAR) {
            options.apply_max_rounds(&raw);
        }
        options
    }

    fn apply_max_rounds(&mut self, raw: &str) {
        match raw.trim().parse::<usize>() {
            Ok(rounds) if rounds > 0 => self.max_fixpoint_rounds = rounds,
            _ => log::warn!(
                "ignoring {}={:?}, keeping {}",
                MAX_ROUNDS_VAR,
                raw,
                self.max_fixpoint_rounds
            ),
        }
    }

    pub fn with_max_fixpoint_rounds(mut self, rounds: usize) -> Self {
        self.max_fixpoint_rounds = rounds;
        self
    }
}
