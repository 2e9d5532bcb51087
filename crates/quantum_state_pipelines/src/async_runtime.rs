// =============================================================================
// MACROHARD Quantum Visualizer - Async Execution Runtime
// =============================================================================
// Table of Contents:
//   1. AsyncQuantumExecutionEngine - Blocking simulation on the Tokio pool
//   2. Timeout handling
// =============================================================================
// Purpose: Runs simulations off the async executor with spawn_blocking and
//          bounds them with a timeout. On timeout the run's cancellation token
//          is tripped so the worker stops at its next checkpoint.
// =============================================================================

use crate::circuit_program::QuantumCircuitStructure;
use crate::error::{PipelineError, PipelineResult};
use crate::execution::{CancellationToken, QuantumExecutionEngine, SimulationResult};
use crate::router::EngineName;
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_SIMULATION_TIMEOUT: Duration = Duration::from_secs(300);

// =============================================================================
// 1. AsyncQuantumExecutionEngine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct AsyncQuantumExecutionEngine {
    engine: QuantumExecutionEngine,
}

impl AsyncQuantumExecutionEngine {
    pub fn new(engine: QuantumExecutionEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &QuantumExecutionEngine {
        &self.engine
    }

    pub async fn execute_circuit_async(
        &self,
        circuit: QuantumCircuitStructure,
        shots: usize,
        override_engine: Option<EngineName>,
        cancellation: CancellationToken,
    ) -> PipelineResult<SimulationResult> {
        let engine = self.engine.clone();
        let routed = engine.select_engine(&circuit, shots, override_engine.map(|name| name.as_str()));
        let summary = circuit.summary();

        tokio::task::spawn_blocking(move || {
            engine.execute_with_options(
                &circuit,
                shots,
                override_engine.map(|name| name.as_str()),
                &cancellation,
            )
        })
        .await
        .map_err(|err| PipelineError::simulation(routed, summary, format!("worker task failed: {err}")))?
    }

    // =========================================================================
    // 2. Timeout handling
    // =========================================================================

    pub async fn execute_with_timeout(
        &self,
        circuit: QuantumCircuitStructure,
        shots: usize,
        override_engine: Option<EngineName>,
        timeout_duration: Duration,
    ) -> PipelineResult<SimulationResult> {
        let cancellation = CancellationToken::new();
        let run = self.execute_circuit_async(circuit, shots, override_engine, cancellation.child_token());

        match timeout(timeout_duration, run).await {
            Ok(result) => result,
            Err(_) => {
                cancellation.cancel();
                let milliseconds = timeout_duration.as_millis() as u64;
                tracing::warn!(timeout_ms = milliseconds, "simulation timed out");
                Err(PipelineError::Timeout(milliseconds))
            }
        }
    }
}
