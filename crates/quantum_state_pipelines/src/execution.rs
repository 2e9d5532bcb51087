// =============================================================================
// MACROHARD Quantum Visualizer - Execution Engine
// =============================================================================
// Table of Contents:
//   1. CancellationToken - Coarse run cancellation
//   2. SimulationResult - Assembled per-request result
//   3. QuantumExecutionEngine - Route, run, postprocess, fallback
// =============================================================================
// Purpose: Orchestrates one simulation request: routes the circuit, builds the
//          chosen engine from the configuration, runs it, retries once on
//          exact_density when the engine rejects the circuit, and applies the
//          shared postprocessing to the output.
// =============================================================================

use crate::circuit_program::QuantumCircuitStructure;
use crate::configuration::PipelineConfiguration;
use crate::error::PipelineResult;
use crate::observables::QubitStateReport;
use crate::pipeline::{
    describe_pipelines, postprocess, PipelineDescription, RawSimulationOutput, ResourceEstimate,
    SimulationEngine, SimulationPipelineInterface,
};
use crate::router::{route, EngineName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

// =============================================================================
// 1. CancellationToken - Coarse run cancellation
// =============================================================================

/// Shared flag polled by engines between units of work (trajectories,
/// density operations). Clones share one flag; a child token also observes
/// every ancestor's flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    parent: Option<Box<CancellationToken>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_cancelled())
    }

    /// Token cancelled together with `self`. Cancelling the child leaves
    /// `self` untouched.
    pub fn child_token(&self) -> CancellationToken {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }
}

// =============================================================================
// 2. SimulationResult - Assembled per-request result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub run_id: Uuid,
    pub circuit_id: Uuid,
    pub engine: EngineName,
    pub routed_engine: EngineName,
    pub fallback_used: bool,
    pub number_of_quantum_bits: usize,
    pub operation_count: usize,
    pub shots_used: usize,
    /// Seconds, including any fallback attempt.
    pub execution_time: f64,
    pub qubits: BTreeMap<usize, QubitStateReport>,
    pub diagnostics: Vec<String>,
}

impl SimulationResult {
    pub fn qubit(&self, qubit: usize) -> Option<&QubitStateReport> {
        self.qubits.get(&qubit)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// =============================================================================
// 3. QuantumExecutionEngine - Route, run, postprocess, fallback
// =============================================================================

#[derive(Debug, Clone)]
pub struct QuantumExecutionEngine {
    engine_id: Uuid,
    configuration: PipelineConfiguration,
}

impl Default for QuantumExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantumExecutionEngine {
    pub fn new() -> Self {
        Self {
            engine_id: Uuid::new_v4(),
            configuration: PipelineConfiguration::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: PipelineConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn engine_id(&self) -> Uuid {
        self.engine_id
    }

    pub fn configuration(&self) -> &PipelineConfiguration {
        &self.configuration
    }

    /// Per-call override first, then the configured override, then automatic
    /// routing.
    pub fn select_engine(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        override_engine: Option<&str>,
    ) -> EngineName {
        let configured = self.configuration.engine_override.map(|engine| engine.as_str());
        route(
            circuit.is_unitary(),
            circuit.number_of_quantum_bits(),
            shots,
            override_engine.or(configured),
        )
    }

    pub fn execute_circuit(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
    ) -> PipelineResult<SimulationResult> {
        self.execute_with_options(circuit, shots, None, &CancellationToken::new())
    }

    pub fn execute_with_options(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        override_engine: Option<&str>,
        cancellation: &CancellationToken,
    ) -> PipelineResult<SimulationResult> {
        self.configuration.validate()?;
        let start_time = Instant::now();
        let routed_engine = self.select_engine(circuit, shots, override_engine);

        let (engine, raw) = match self.run_engine(routed_engine, circuit, shots, cancellation) {
            Ok(raw) => (routed_engine, raw),
            Err(err)
                if err.is_fallback_eligible()
                    && self.configuration.enable_exact_density_fallback
                    && routed_engine != EngineName::ExactDensity =>
            {
                tracing::warn!(
                    engine = %routed_engine,
                    error = %err,
                    "engine rejected circuit, retrying on exact_density"
                );
                let raw = self.run_engine(EngineName::ExactDensity, circuit, shots, cancellation)?;
                (EngineName::ExactDensity, raw)
            }
            Err(err) => {
                tracing::error!(engine = %routed_engine, error = %err, "simulation failed");
                return Err(err);
            }
        };

        let execution_time = start_time.elapsed().as_secs_f64();
        let processed = postprocess(
            raw,
            circuit.number_of_quantum_bits(),
            execution_time,
            self.configuration.bloch_magnitude_slack,
        );

        Ok(SimulationResult {
            run_id: Uuid::new_v4(),
            circuit_id: circuit.id(),
            engine,
            routed_engine,
            fallback_used: engine != routed_engine,
            number_of_quantum_bits: circuit.number_of_quantum_bits(),
            operation_count: circuit.operation_count(),
            shots_used: processed.shots_used,
            execution_time: processed.execution_time,
            qubits: processed.per_qubit,
            diagnostics: processed.diagnostics,
        })
    }

    fn run_engine(
        &self,
        engine_name: EngineName,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        cancellation: &CancellationToken,
    ) -> PipelineResult<RawSimulationOutput> {
        let engine = SimulationEngine::build(engine_name, &self.configuration);
        let prepared = engine.preprocess(circuit);
        engine.check_circuit(&prepared)?;
        engine.run(&prepared, shots, cancellation)
    }

    pub fn estimate_resources(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
    ) -> ResourceEstimate {
        let engine_name = self.select_engine(circuit, shots, None);
        SimulationEngine::build(engine_name, &self.configuration).estimate_resources(circuit, shots)
    }

    pub fn describe_pipelines(&self) -> Vec<PipelineDescription> {
        describe_pipelines(&self.configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        let child = token.child_token();
        let grandchild = child.child_token();
        token.cancel();

        assert!(token.is_cancelled());
        assert!(shared.is_cancelled());
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_cancelling_child_leaves_parent_running() {
        let token = CancellationToken::new();
        let child = token.child_token();
        let sibling = token.child_token();

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!token.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn test_over_wide_condition_is_a_circuit_error() {
        let mut circuit = QuantumCircuitStructure::with_classical_bits(1, 70);
        circuit.apply_measurement(0, 0).apply_conditioned_gate(
            crate::gate_operations::StandardGate::PauliX,
            vec![0],
            Vec::new(),
            crate::circuit_program::ClassicalCondition::new((0..70).collect(), 0),
        );
        let err = QuantumExecutionEngine::new().execute_circuit(&circuit, 100).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Circuit(crate::error::CircuitError::ConditionTooWide { width: 70, .. })
        ));
    }

    #[test]
    fn test_execute_bell_state() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit.apply_hadamard_gate(0).apply_controlled_not_gate(0, 1);

        let result = QuantumExecutionEngine::new().execute_circuit(&circuit, 1024).unwrap();
        assert_eq!(result.engine, EngineName::Unitary);
        assert!(!result.fallback_used);
        assert_eq!(result.circuit_id, circuit.id());
        assert_eq!(result.qubits.len(), 2);
        assert!((result.qubit(1).unwrap().purity - 0.5).abs() < 1e-9);
        assert!(result.execution_time >= 0.0);
    }

    #[test]
    fn test_fallback_to_exact_density() {
        // Forced unitary on a measured circuit is rejected, then retried.
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_hadamard_gate(0).apply_measurement(0, 0);

        let engine = QuantumExecutionEngine::new();
        let result = engine
            .execute_with_options(&circuit, 1024, Some("unitary"), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.routed_engine, EngineName::Unitary);
        assert_eq!(result.engine, EngineName::ExactDensity);
        assert!(result.fallback_used);
        assert!((result.qubit(0).unwrap().purity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_measurement(0, 0);

        let engine = QuantumExecutionEngine::new().with_configuration(
            PipelineConfiguration::default()
                .with_exact_density_fallback(false)
                .with_engine_override(EngineName::Unitary),
        );
        let err = engine.execute_circuit(&circuit, 1024).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedCircuit { .. }));
    }

    #[test]
    fn test_invalid_circuit_is_not_retried() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_hadamard_gate(3);
        let err = QuantumExecutionEngine::new().execute_circuit(&circuit, 1024).unwrap_err();
        assert!(matches!(err, PipelineError::Circuit(_)));
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let engine = QuantumExecutionEngine::new()
            .with_configuration(PipelineConfiguration::default().with_shot_bounds(0, 10));
        let err = engine
            .execute_circuit(&QuantumCircuitStructure::new(1), 10)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_result_serializes_to_wire_shape() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_pauli_x_gate(0);
        let result = QuantumExecutionEngine::new().execute_circuit(&circuit, 1024).unwrap();

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["engine"], "unitary");
        assert_eq!(json["qubits"]["0"]["bloch"], serde_json::json!([0.0, 0.0, -1.0]));
        assert_eq!(json["qubits"]["0"]["rho"][1][1], serde_json::json!([1.0, 0.0]));
    }

    #[test]
    fn test_estimate_uses_routed_engine() {
        let mut circuit = QuantumCircuitStructure::new(3);
        circuit.apply_measurement(0, 0);
        let estimate = QuantumExecutionEngine::new().estimate_resources(&circuit, 1024);
        assert_eq!(estimate.engine, EngineName::ExactDensity);
    }
}
