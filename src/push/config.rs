//! Interpreter resource limits.

use serde::{Deserialize, Serialize};

use crate::push::stack::StackLimits;

/// Runtime limits for one interpreter run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Maximum number of atoms executed per run.
    pub step_limit: usize,
    /// Maximum total state size (stack depths plus stdout length).
    pub state_size_limit: usize,
    /// Maximum state size increase caused by a single step.
    pub growth_limit: usize,
    /// Numbers pushed to stacks are clamped to `±number_magnitude_limit`.
    pub number_magnitude_limit: f64,
    /// Strings, vectors and code are truncated to this many elements.
    pub collection_size_limit: usize,
    /// Genomes translating to more points than this become the empty block.
    pub max_code_points: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            step_limit: 500,
            state_size_limit: 1_000_000,
            growth_limit: 500,
            number_magnitude_limit: 1e12,
            collection_size_limit: 1000,
            max_code_points: 500,
        }
    }
}

impl PushConfig {
    /// Per-value limits applied by every stack.
    #[must_use]
    pub fn stack_limits(&self) -> StackLimits {
        StackLimits {
            number_magnitude: self.number_magnitude_limit,
            collection_size: self.collection_size_limit,
        }
    }
}
