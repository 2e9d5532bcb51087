// =============================================================================
// MACROHARD Quantum Visualizer - Exact Density Matrix Pipeline
// =============================================================================
// Table of Contents:
//   1. ExactDensityPipeline - Engine value type
//   2. Branch ensemble evolution
//   3. SimulationPipelineInterface implementation
// =============================================================================
// Purpose: Exact mixed-state evolution with measurement and reset applied as
//          completely positive maps. While classically conditioned operations
//          remain, the ensemble is kept as unnormalized branches keyed by the
//          classical register so each condition is applied exactly.
// =============================================================================

use crate::circuit_program::{ClassicalState, OperationInstance, OperationKind, QuantumCircuitStructure};
use crate::configuration::PipelineConfiguration;
use crate::error::{PipelineError, PipelineResult, StateError};
use crate::execution::CancellationToken;
use crate::pipeline::{
    assemble_reports, check_common_limits, complex_buffer_mebibytes, ComplexityClass,
    RawSimulationOutput, ResourceEstimate, SimulationPipelineInterface,
};
use crate::reduction::reduce_all_density_matrix_qubits;
use crate::router::EngineName;
use crate::state_backend::{DensityMatrixState, QuantumStateBackendInterface};
use crate::unitary_pipeline::evolve_state_vector;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Instant;

/// Branches lighter than this are dropped after a measurement split.
const BRANCH_WEIGHT_THRESHOLD: f64 = 1e-15;

// =============================================================================
// 1. ExactDensityPipeline - Engine value type
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ExactDensityPipeline {
    configuration: PipelineConfiguration,
}

impl ExactDensityPipeline {
    pub fn new(configuration: PipelineConfiguration) -> Self {
        Self { configuration }
    }

    fn simulation_error(
        circuit: &QuantumCircuitStructure,
        index: usize,
        operation: &OperationInstance,
        err: StateError,
    ) -> PipelineError {
        PipelineError::simulation(
            EngineName::ExactDensity,
            circuit.summary(),
            format!("operation {index} ({}): {err}", operation.operation_name()),
        )
    }

    /// Final ensemble state with unit trace.
    pub fn evolve_density_matrix(
        &self,
        circuit: &QuantumCircuitStructure,
        cancellation: &CancellationToken,
    ) -> PipelineResult<DensityMatrixState> {
        let mut ensemble = BranchEnsemble::new(circuit.number_of_quantum_bits());
        let last_conditioned = circuit
            .operations()
            .iter()
            .rposition(OperationInstance::is_conditioned);

        for (index, operation) in circuit.operations().iter().enumerate() {
            if cancellation.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let conditions_ahead = last_conditioned.is_some_and(|last| index < last);
            ensemble
                .apply(operation, conditions_ahead)
                .map_err(|err| Self::simulation_error(circuit, index, operation, err))?;

            if ensemble.branch_count() > self.configuration.maximum_density_branches {
                return Err(PipelineError::resource_limit(
                    EngineName::ExactDensity,
                    circuit.summary(),
                    format!(
                        "{} classical branches exceeds the limit of {}",
                        ensemble.branch_count(),
                        self.configuration.maximum_density_branches
                    ),
                ));
            }
            if !conditions_ahead {
                ensemble
                    .merge()
                    .map_err(|err| Self::simulation_error(circuit, index, operation, err))?;
            }
        }

        let mut state = ensemble.into_state().map_err(|err| {
            PipelineError::simulation(EngineName::ExactDensity, circuit.summary(), err.to_string())
        })?;
        state.normalize_trace().map_err(|err| {
            PipelineError::simulation(EngineName::ExactDensity, circuit.summary(), err.to_string())
        })?;
        Ok(state)
    }
}

// =============================================================================
// 2. Branch ensemble evolution
// =============================================================================

fn single_target(operation: &OperationInstance) -> Result<usize, StateError> {
    match operation.target_quantum_bits.as_slice() {
        [qubit] => Ok(*qubit),
        targets => Err(StateError::DimensionMismatch {
            expected: 1,
            actual: targets.len(),
        }),
    }
}

/// Unnormalized density matrices keyed by classical register contents. Branch
/// traces sum to one.
struct BranchEnsemble {
    number_of_quantum_bits: usize,
    branches: BTreeMap<ClassicalState, DensityMatrixState>,
}

impl BranchEnsemble {
    fn new(number_of_quantum_bits: usize) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(
            ClassicalState::new(),
            DensityMatrixState::zero_state(number_of_quantum_bits),
        );
        Self {
            number_of_quantum_bits,
            branches,
        }
    }

    fn branch_count(&self) -> usize {
        self.branches.len()
    }

    fn insert(
        branches: &mut BTreeMap<ClassicalState, DensityMatrixState>,
        classical_state: ClassicalState,
        state: DensityMatrixState,
    ) -> Result<(), StateError> {
        match branches.entry(classical_state) {
            Entry::Vacant(slot) => {
                slot.insert(state);
            }
            Entry::Occupied(mut slot) => slot.get_mut().accumulate(&state)?,
        }
        Ok(())
    }

    fn apply(&mut self, operation: &OperationInstance, conditions_ahead: bool) -> Result<(), StateError> {
        let applies = |classical_state: &ClassicalState| {
            operation
                .classical_condition
                .as_ref()
                .map_or(true, |condition| condition.is_satisfied(classical_state))
        };

        match &operation.kind {
            OperationKind::Barrier => Ok(()),
            OperationKind::Gate(_) | OperationKind::CustomUnitary { .. } => {
                for (classical_state, state) in self.branches.iter_mut() {
                    if applies(classical_state) {
                        state.apply_operation(operation)?;
                    }
                }
                Ok(())
            }
            OperationKind::Reset => {
                let qubit = single_target(operation)?;
                for (classical_state, state) in self.branches.iter_mut() {
                    if applies(classical_state) {
                        state.reset_qubit(qubit)?;
                    }
                }
                Ok(())
            }
            OperationKind::Measure => {
                let qubit = single_target(operation)?;
                match operation.classical_target {
                    Some(classical_bit) if conditions_ahead => {
                        self.split_on_measurement(qubit, classical_bit, applies)
                    }
                    _ => {
                        for (classical_state, state) in self.branches.iter_mut() {
                            if applies(classical_state) {
                                state.dephase(qubit)?;
                            }
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    fn split_on_measurement(
        &mut self,
        qubit: usize,
        classical_bit: usize,
        applies: impl Fn(&ClassicalState) -> bool,
    ) -> Result<(), StateError> {
        let mut next = BTreeMap::new();
        for (classical_state, state) in std::mem::take(&mut self.branches) {
            if !applies(&classical_state) {
                Self::insert(&mut next, classical_state, state)?;
                continue;
            }
            for outcome in 0..2u8 {
                let projected = state.project(qubit, outcome)?;
                if projected.trace().re <= BRANCH_WEIGHT_THRESHOLD {
                    continue;
                }
                let mut recorded = classical_state.clone();
                recorded.record(classical_bit, outcome);
                Self::insert(&mut next, recorded, projected)?;
            }
        }
        self.branches = next;
        Ok(())
    }

    /// Collapses all branches into one once no condition can read them.
    fn merge(&mut self) -> Result<(), StateError> {
        if self.branches.len() <= 1 {
            return Ok(());
        }
        let mut branches = std::mem::take(&mut self.branches).into_values();
        if let Some(mut total) = branches.next() {
            for branch in branches {
                total.accumulate(&branch)?;
            }
            self.branches.insert(ClassicalState::new(), total);
        }
        Ok(())
    }

    fn into_state(mut self) -> Result<DensityMatrixState, StateError> {
        self.merge()?;
        self.branches
            .into_values()
            .next()
            .ok_or(StateError::DimensionMismatch {
                expected: 1usize << self.number_of_quantum_bits,
                actual: 0,
            })
    }
}

// =============================================================================
// 3. SimulationPipelineInterface implementation
// =============================================================================

impl SimulationPipelineInterface for ExactDensityPipeline {
    fn engine_name(&self) -> EngineName {
        EngineName::ExactDensity
    }

    fn maximum_quantum_bits(&self) -> usize {
        self.configuration.exact_density_maximum_quantum_bits
    }

    fn supports_measurements(&self) -> bool {
        true
    }

    fn description(&self) -> &'static str {
        "Exact density matrix evolution with measurement and reset as quantum channels"
    }

    fn check_circuit(&self, circuit: &QuantumCircuitStructure) -> PipelineResult<()> {
        check_common_limits(circuit, &self.configuration, EngineName::ExactDensity)
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
            engine = %EngineName::ExactDensity,
            qubits = circuit.number_of_quantum_bits(),
            operations = circuit.operation_count(),
            shots,
            "starting simulation"
        );

        let mut diagnostics = Vec::new();
        let state = match self.evolve_density_matrix(circuit, cancellation) {
            Ok(state) => state,
            Err(err @ PipelineError::Simulation { .. }) if circuit.is_unitary() => {
                tracing::warn!(error = %err, "density evolution failed, using statevector outer product");
                diagnostics.push(format!("density evolution failed ({err}); used pure-state outer product"));
                let pure = evolve_state_vector(circuit, EngineName::ExactDensity)?;
                DensityMatrixState::from_state_vector(&pure)
            }
            Err(err) => return Err(err),
        };

        let per_qubit = assemble_reports(
            EngineName::ExactDensity,
            reduce_all_density_matrix_qubits(&state),
            &mut diagnostics,
        );

        let execution_time = start_time.elapsed().as_secs_f64();
        tracing::info!(engine = %EngineName::ExactDensity, execution_time, "simulation finished");
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
        let entries = 4f64.powi(number_of_quantum_bits as i32);
        let density = complex_buffer_mebibytes(entries);
        let qubits = number_of_quantum_bits as f64;

        ResourceEstimate {
            engine: EngineName::ExactDensity,
            memory_mebibytes: (density + 2.0 * density) * 1.5,
            time_seconds: 0.01 * entries * operation_count as f64 / 1000.0 + 0.1 * qubits.powi(3),
            complexity: ComplexityClass::classify(number_of_quantum_bits, operation_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_program::ClassicalCondition;
    use crate::gate_operations::StandardGate;
    use crate::unitary_pipeline::UnitaryPipeline;

    fn run(pipeline: &ExactDensityPipeline, circuit: &QuantumCircuitStructure) -> RawSimulationOutput {
        pipeline.run(circuit, 1024, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_matches_unitary_engine_on_unitary_circuit() {
        let mut circuit = QuantumCircuitStructure::new(3);
        circuit
            .apply_hadamard_gate(0)
            .apply_rotation_y_gate(1, 0.8)
            .apply_controlled_not_gate(0, 2)
            .apply_phase_t_gate(2)
            .apply_swap_gate(1, 2);

        let density = run(&ExactDensityPipeline::default(), &circuit);
        let pure = UnitaryPipeline::default()
            .run(&circuit, 1024, &CancellationToken::new())
            .unwrap();
        for qubit in 0..3 {
            let distance = density.per_qubit[&qubit]
                .rho
                .frobenius_distance(&pure.per_qubit[&qubit].rho);
            assert!(distance < 1e-9, "qubit {qubit} differs by {distance}");
        }
    }

    #[test]
    fn test_measurement_dephases() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_hadamard_gate(0).apply_measurement(0, 0);
        let report = run(&ExactDensityPipeline::default(), &circuit).per_qubit[&0];
        assert!(report.bloch.magnitude() < 1e-12);
        assert!((report.purity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset_returns_to_ground() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit
            .apply_hadamard_gate(0)
            .apply_controlled_not_gate(0, 1)
            .apply_measurement(1, 1)
            .apply_reset(0);
        let output = run(&ExactDensityPipeline::default(), &circuit);
        assert_eq!(output.per_qubit[&0].bloch.components(), [0.0, 0.0, 1.0]);
        assert!((output.per_qubit[&1].purity - 0.5).abs() < 1e-12);
        for report in output.per_qubit.values() {
            assert!((report.rho.trace().re - 1.0).abs() < 1e-9);
            assert!(report.purity <= 1.0);
        }
    }

    #[test]
    fn test_classical_feed_forward_is_exact() {
        // Measure |+> into c0, then flip qubit 0 back when c0 = 1.
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit.apply_hadamard_gate(0).apply_measurement(0, 0);
        circuit.apply_conditioned_gate(
            StandardGate::PauliX,
            vec![0],
            Vec::new(),
            ClassicalCondition::on_bit(0, 1),
        );
        let output = run(&ExactDensityPipeline::default(), &circuit);
        assert_eq!(output.per_qubit[&0].bloch.components(), [0.0, 0.0, 1.0]);
        assert_eq!(output.per_qubit[&0].purity, 1.0);
    }

    #[test]
    fn test_branch_limit() {
        let mut circuit = QuantumCircuitStructure::new(3);
        for qubit in 0..3 {
            circuit.apply_hadamard_gate(qubit).apply_measurement(qubit, qubit);
        }
        circuit.apply_conditioned_gate(
            StandardGate::PauliX,
            vec![0],
            Vec::new(),
            ClassicalCondition::new(vec![0, 1, 2], 7),
        );
        let pipeline = ExactDensityPipeline::new(
            PipelineConfiguration::default().with_maximum_density_branches(4),
        );
        let err = pipeline
            .run(&circuit, 1024, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ResourceLimit { .. }));
    }

    #[test]
    fn test_qubit_limit() {
        let circuit = QuantumCircuitStructure::new(9);
        let pipeline = ExactDensityPipeline::default();
        assert!(!pipeline.validate(&circuit));
        assert!(matches!(
            pipeline.run(&circuit, 1024, &CancellationToken::new()),
            Err(PipelineError::ResourceLimit { .. })
        ));
    }

    #[test]
    fn test_cancellation() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_hadamard_gate(0);
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            ExactDensityPipeline::default().run(&circuit, 1024, &token),
            Err(PipelineError::Cancelled)
        ));
    }
}
