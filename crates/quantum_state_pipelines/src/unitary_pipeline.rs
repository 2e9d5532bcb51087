// =============================================================================
// MACROHARD Quantum Visualizer - Unitary (Statevector) Pipeline
// =============================================================================
// Table of Contents:
//   1. UnitaryPipeline - Engine value type
//   2. Statevector evolution
//   3. SimulationPipelineInterface implementation
// =============================================================================
// Purpose: Exact pure-state evolution for measurement- and reset-free
//          circuits. Per-qubit states come from the tensor-contraction
//          reduction of the final amplitudes.
// =============================================================================

use crate::circuit_program::{ClassicalState, QuantumCircuitStructure};
use crate::configuration::PipelineConfiguration;
use crate::error::{PipelineError, PipelineResult};
use crate::execution::CancellationToken;
use crate::pipeline::{
    assemble_reports, check_common_limits, complex_buffer_mebibytes, ComplexityClass,
    RawSimulationOutput, ResourceEstimate, SimulationPipelineInterface,
};
use crate::reduction::reduce_all_state_vector_qubits;
use crate::router::EngineName;
use crate::state_backend::{QuantumStateBackendInterface, QuantumStateVector};
use std::time::Instant;

// =============================================================================
// 1. UnitaryPipeline - Engine value type
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct UnitaryPipeline {
    configuration: PipelineConfiguration,
}

impl UnitaryPipeline {
    pub fn new(configuration: PipelineConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &PipelineConfiguration {
        &self.configuration
    }
}

// =============================================================================
// 2. Statevector evolution
// =============================================================================

/// Evolves |0...0> through every operation. Classical conditions are checked
/// against an empty register, so only conditions expecting 0 fire.
///
/// Measurement or reset yields `UnsupportedCircuit` attributed to `engine`.
pub fn evolve_state_vector(
    circuit: &QuantumCircuitStructure,
    engine: EngineName,
) -> PipelineResult<QuantumStateVector> {
    let classical_state = ClassicalState::new();
    let mut state = QuantumStateVector::zero_state(circuit.number_of_quantum_bits());

    for (index, operation) in circuit.operations().iter().enumerate() {
        if operation.is_non_unitary() {
            return Err(PipelineError::unsupported_circuit(
                engine,
                circuit.summary(),
                format!(
                    "operation {index} ({}) is not unitary",
                    operation.operation_name()
                ),
            ));
        }
        if let Some(condition) = &operation.classical_condition {
            if !condition.is_satisfied(&classical_state) {
                continue;
            }
        }
        state.apply_operation(operation).map_err(|err| {
            PipelineError::simulation(
                engine,
                circuit.summary(),
                format!("operation {index} ({}): {err}", operation.operation_name()),
            )
        })?;
    }
    Ok(state)
}

// =============================================================================
// 3. SimulationPipelineInterface implementation
// =============================================================================

impl SimulationPipelineInterface for UnitaryPipeline {
    fn engine_name(&self) -> EngineName {
        EngineName::Unitary
    }

    fn maximum_quantum_bits(&self) -> usize {
        self.configuration.unitary_maximum_quantum_bits
    }

    fn supports_measurements(&self) -> bool {
        false
    }

    fn description(&self) -> &'static str {
        "Exact statevector evolution for circuits without measurement or reset"
    }

    fn check_circuit(&self, circuit: &QuantumCircuitStructure) -> PipelineResult<()> {
        check_common_limits(circuit, &self.configuration, EngineName::Unitary)?;
        if let Some((index, operation)) = circuit
            .operations()
            .iter()
            .enumerate()
            .find(|(_, operation)| operation.is_non_unitary())
        {
            return Err(PipelineError::unsupported_circuit(
                EngineName::Unitary,
                circuit.summary(),
                format!(
                    "operation {index} ({}) requires a mixed-state engine",
                    operation.operation_name()
                ),
            ));
        }
        Ok(())
    }

    fn run(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        cancellation: &CancellationToken,
    ) -> PipelineResult<RawSimulationOutput> {
        self.check_circuit(circuit)?;
        let start_time = Instant::now();
        tracing::info!(
            engine = %EngineName::Unitary,
            qubits = circuit.number_of_quantum_bits(),
            operations = circuit.operation_count(),
            shots,
            "starting simulation"
        );

        let state = evolve_state_vector(circuit, EngineName::Unitary)?;
        if cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut diagnostics = Vec::new();
        let per_qubit = assemble_reports(
            EngineName::Unitary,
            reduce_all_state_vector_qubits(&state),
            &mut diagnostics,
        );

        let execution_time = start_time.elapsed().as_secs_f64();
        tracing::info!(engine = %EngineName::Unitary, execution_time, "simulation finished");
        Ok(RawSimulationOutput {
            per_qubit,
            execution_time,
            shots_used: 0,
            diagnostics,
        })
    }

    fn estimate_resources(&self, circuit: &QuantumCircuitStructure, _shots: usize) -> ResourceEstimate {
        let number_of_quantum_bits = circuit.number_of_quantum_bits();
        let operation_count = circuit.operation_count();
        let dimension = 2f64.powi(number_of_quantum_bits as i32);

        let statevector = complex_buffer_mebibytes(dimension);
        let reduction_workspace = complex_buffer_mebibytes(dimension * dimension);
        let qubits = number_of_quantum_bits as f64;

        ResourceEstimate {
            engine: EngineName::Unitary,
            memory_mebibytes: (statevector + reduction_workspace) * 1.5,
            time_seconds: 0.001 * dimension * operation_count as f64 / 1000.0 + 0.01 * qubits * qubits,
            complexity: ComplexityClass::classify(number_of_quantum_bits, operation_count),
        }
    }
}
