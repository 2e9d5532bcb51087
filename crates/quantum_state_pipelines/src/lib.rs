// =============================================================================
// MACROHARD Quantum Visualizer - Quantum State Pipelines
// =============================================================================
// Table of Contents:
//   1. Circuit and State Layers
//   2. Reduction and Observables
//   3. Engines, Router and Orchestrator
//   4. Async Execution (feature-gated)
//   5. Prelude Module
// =============================================================================
// Purpose: Simulates a small circuit and reports the reduced state of every
//          qubit (Bloch vector, purity, 2x2 density matrix). A router picks
//          one of three engines: statevector, exact density matrix, or Monte
//          Carlo trajectories. Qubit 0 is the least-significant basis bit.
// =============================================================================

pub mod circuit_program;
pub mod error;
pub mod gate_operations;
pub mod preset_circuits;
pub mod state_backend;

pub mod observables;
pub mod reduction;

pub mod configuration;
pub mod exact_density_pipeline;
pub mod execution;
pub mod pipeline;
pub mod router;
pub mod trajectory_pipeline;
pub mod unitary_pipeline;

#[cfg(feature = "async_runtime")]
pub mod async_runtime;

pub mod prelude {
    pub use crate::circuit_program::*;
    pub use crate::configuration::*;
    pub use crate::error::*;
    pub use crate::exact_density_pipeline::*;
    pub use crate::execution::*;
    pub use crate::gate_operations::*;
    pub use crate::observables::*;
    pub use crate::pipeline::*;
    pub use crate::preset_circuits::*;
    pub use crate::reduction::*;
    pub use crate::router::*;
    pub use crate::state_backend::*;
    pub use crate::trajectory_pipeline::*;
    pub use crate::unitary_pipeline::*;

    #[cfg(feature = "async_runtime")]
    pub use crate::async_runtime::*;
}
