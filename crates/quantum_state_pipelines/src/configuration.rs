// =============================================================================
// MACROHARD Quantum Visualizer - Pipeline Configuration
// =============================================================================
// Table of Contents:
//   1. Default limits
//   2. PipelineConfiguration - Immutable engine settings
//   3. Loading from TOML
// =============================================================================
// Purpose: One immutable settings value from which every engine is built per
//          call. All fields have defaults so partial TOML documents load.
// =============================================================================

use crate::error::PipelineError;
use crate::router::{
    EngineName, EXACT_DENSITY_ROUTING_MAXIMUM_QUBITS, TRAJECTORY_ROUTING_MAXIMUM_QUBITS,
    UNITARY_ROUTING_MAXIMUM_QUBITS,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// 1. Default limits
// =============================================================================

pub const GLOBAL_MAXIMUM_QUBITS: usize = 24;
pub const GLOBAL_MAXIMUM_OPERATIONS: usize = 1000;
pub const MINIMUM_SHOTS: usize = 100;
pub const RECOMMENDED_SHOTS: usize = 1024;
pub const MAXIMUM_SHOTS: usize = 100_000;
pub const DEFAULT_MAXIMUM_DENSITY_BRANCHES: usize = 256;
pub const DEFAULT_BLOCH_MAGNITUDE_SLACK: f64 = 1e-6;

// =============================================================================
// 2. PipelineConfiguration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfiguration {
    pub maximum_quantum_bits: usize,
    pub maximum_operations: usize,
    pub unitary_maximum_quantum_bits: usize,
    pub exact_density_maximum_quantum_bits: usize,
    pub trajectory_maximum_quantum_bits: usize,
    pub minimum_shots: usize,
    pub maximum_shots: usize,
    pub default_shots: usize,
    pub random_seed: Option<u64>,
    pub enable_exact_density_fallback: bool,
    pub maximum_density_branches: usize,
    pub bloch_magnitude_slack: f64,
    pub collapse_deterministic_trajectories: bool,
    pub engine_override: Option<EngineName>,
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self {
            maximum_quantum_bits: GLOBAL_MAXIMUM_QUBITS,
            maximum_operations: GLOBAL_MAXIMUM_OPERATIONS,
            unitary_maximum_quantum_bits: UNITARY_ROUTING_MAXIMUM_QUBITS,
            exact_density_maximum_quantum_bits: EXACT_DENSITY_ROUTING_MAXIMUM_QUBITS,
            trajectory_maximum_quantum_bits: TRAJECTORY_ROUTING_MAXIMUM_QUBITS,
            minimum_shots: MINIMUM_SHOTS,
            maximum_shots: MAXIMUM_SHOTS,
            default_shots: RECOMMENDED_SHOTS,
            random_seed: None,
            enable_exact_density_fallback: true,
            maximum_density_branches: DEFAULT_MAXIMUM_DENSITY_BRANCHES,
            bloch_magnitude_slack: DEFAULT_BLOCH_MAGNITUDE_SLACK,
            collapse_deterministic_trajectories: true,
            engine_override: None,
        }
    }
}

impl PipelineConfiguration {
    /// Seeded configuration for reproducible trajectory runs.
    pub fn deterministic(seed: u64) -> Self {
        Self::default().with_random_seed(seed)
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_default_shots(mut self, shots: usize) -> Self {
        self.default_shots = shots;
        self
    }

    pub fn with_shot_bounds(mut self, minimum: usize, maximum: usize) -> Self {
        self.minimum_shots = minimum;
        self.maximum_shots = maximum;
        self
    }

    pub fn with_exact_density_fallback(mut self, enabled: bool) -> Self {
        self.enable_exact_density_fallback = enabled;
        self
    }

    pub fn with_maximum_density_branches(mut self, branches: usize) -> Self {
        self.maximum_density_branches = branches;
        self
    }

    pub fn with_deterministic_trajectory_shortcut(mut self, enabled: bool) -> Self {
        self.collapse_deterministic_trajectories = enabled;
        self
    }

    pub fn with_engine_override(mut self, engine: EngineName) -> Self {
        self.engine_override = Some(engine);
        self
    }

    pub fn with_engine_qubit_limits(
        mut self,
        unitary: usize,
        exact_density: usize,
        trajectory: usize,
    ) -> Self {
        self.unitary_maximum_quantum_bits = unitary;
        self.exact_density_maximum_quantum_bits = exact_density;
        self.trajectory_maximum_quantum_bits = trajectory;
        self
    }

    pub fn engine_maximum_quantum_bits(&self, engine: EngineName) -> usize {
        match engine {
            EngineName::Unitary => self.unitary_maximum_quantum_bits,
            EngineName::ExactDensity => self.exact_density_maximum_quantum_bits,
            EngineName::Trajectory => self.trajectory_maximum_quantum_bits,
        }
    }

    /// Clamps a shot count into `[minimum_shots, maximum_shots]`.
    pub fn clamp_shots(&self, shots: usize) -> usize {
        shots.clamp(self.minimum_shots, self.maximum_shots)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let fail = |message: String| Err(PipelineError::InvalidConfiguration(message));

        if self.maximum_quantum_bits == 0 || self.maximum_operations == 0 {
            return fail("global qubit and operation limits must be positive".to_string());
        }
        if self.maximum_quantum_bits >= usize::BITS as usize {
            return fail(format!(
                "maximum_quantum_bits {} cannot be addressed",
                self.maximum_quantum_bits
            ));
        }
        for engine in EngineName::ALL {
            let limit = self.engine_maximum_quantum_bits(engine);
            if limit == 0 || limit > self.maximum_quantum_bits {
                return fail(format!(
                    "{engine} qubit limit {limit} must be in 1..={}",
                    self.maximum_quantum_bits
                ));
            }
        }
        if self.minimum_shots == 0 || self.minimum_shots > self.maximum_shots {
            return fail(format!(
                "shot bounds {}..={} are inconsistent",
                self.minimum_shots, self.maximum_shots
            ));
        }
        if self.maximum_density_branches == 0 {
            return fail("maximum_density_branches must be positive".to_string());
        }
        if !self.bloch_magnitude_slack.is_finite() || self.bloch_magnitude_slack < 0.0 {
            return fail("bloch_magnitude_slack must be a non-negative number".to_string());
        }
        Ok(())
    }

    // =========================================================================
    // 3. Loading from TOML
    // =========================================================================

    pub fn from_toml_str(source: &str) -> Result<Self, PipelineError> {
        let configuration: Self = toml::from_str(source)
            .map_err(|err| PipelineError::InvalidConfiguration(err.to_string()))?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn to_toml_string(&self) -> Result<String, PipelineError> {
        toml::to_string_pretty(self).map_err(|err| PipelineError::InvalidConfiguration(err.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline configuration {}", path.display()))?;
        let configuration = Self::from_toml_str(&source)
            .with_context(|| format!("parsing pipeline configuration {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded pipeline configuration");
        Ok(configuration)
    }
}
