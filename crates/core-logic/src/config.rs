//! Engine configuration
//!
//! Limits applied at load time and query time. Every field has a default, so
//! an empty TOML table is a valid configuration:
//!
//! ```toml
//! max_depth = 64
//! max_rules = 256
//! ```

use crate::error::{PolicyError, Result};
use crate::{DEFAULT_MAX_DEPTH, MAX_GOALS_PER_RULE, MAX_RULES_PER_POLICY};
use serde::{Deserialize, Serialize};

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_rules() -> usize {
    MAX_RULES_PER_POLICY
}

fn default_max_goals() -> usize {
    MAX_GOALS_PER_RULE
}

/// Resource limits for loading and solving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Ceiling on nested predicate calls within one query
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of rules accepted by one load
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,

    /// Maximum number of goals in one rule body
    #[serde(default = "default_max_goals", rename = "max_goals_per_rule")]
    pub max_goals: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_rules: MAX_RULES_PER_POLICY,
            max_goals: MAX_GOALS_PER_RULE,
        }
    }
}

impl EngineConfig {
    /// Set the recursion ceiling
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the rule limit
    #[must_use]
    pub const fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = max_rules;
        self
    }

    /// Load configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Serialization` if the TOML is invalid, has
    /// unknown keys, or sets a limit to zero
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every load or query fail
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Serialization` naming the zero limit
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_depth", self.max_depth),
            ("max_rules", self.max_rules),
            ("max_goals_per_rule", self.max_goals),
        ] {
            if value == 0 {
                return Err(PolicyError::Serialization(format!(
                    "`{}` must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}
