// =============================================================================
// MACROHARD Quantum Visualizer - Monte Carlo Trajectory Pipeline
// =============================================================================
// Table of Contents:
//   1. TrajectoryPipeline - Engine value type
//   2. Single trajectory replay
//   3. Trajectory averaging
//   4. SimulationPipelineInterface implementation
// =============================================================================
// Purpose: Stochastic simulation of circuits with measurement, reset and
//          classical feed-forward. Each trajectory replays the circuit on a
//          statevector with sampled projective collapse; per-qubit reduced
//          states are averaged over the successful trajectories.
// =============================================================================

use crate::circuit_program::{ClassicalState, OperationInstance, OperationKind, QuantumCircuitStructure};
use crate::configuration::PipelineConfiguration;
use crate::error::{PipelineError, PipelineResult, StateError, TrajectoryError};
use crate::execution::CancellationToken;
use crate::observables::ReducedDensityMatrix;
use crate::pipeline::{
    assemble_reports, check_common_limits, complex_buffer_mebibytes, ComplexityClass,
    RawSimulationOutput, ResourceEstimate, SimulationPipelineInterface,
};
use crate::reduction::reduce_state_vector_by_projection;
use crate::router::EngineName;
use crate::state_backend::{QuantumStateBackendInterface, QuantumStateVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const OUTCOME_PROBABILITY_THRESHOLD: f64 = 1e-15;

// =============================================================================
// 1. TrajectoryPipeline - Engine value type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotRecommendation {
    pub minimum: usize,
    pub recommended: usize,
    pub maximum: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TrajectoryPipeline {
    configuration: PipelineConfiguration,
}

impl TrajectoryPipeline {
    pub fn new(configuration: PipelineConfiguration) -> Self {
        Self { configuration }
    }

    pub fn shot_recommendations(&self) -> ShotRecommendation {
        ShotRecommendation {
            minimum: self.configuration.minimum_shots,
            recommended: self.configuration.clamp_shots(self.configuration.default_shots),
            maximum: self.configuration.maximum_shots,
        }
    }

    /// Seeded from the configuration when a seed is set, otherwise from OS
    /// entropy.
    pub fn build_rng(&self) -> StdRng {
        match self.configuration.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn effective_shots(&self, circuit: &QuantumCircuitStructure, shots: usize) -> usize {
        let clamped = self.configuration.clamp_shots(shots);
        if clamped != shots {
            tracing::warn!(requested = shots, used = clamped, "shot count clamped");
        }
        if self.configuration.collapse_deterministic_trajectories && circuit.is_unitary() {
            tracing::debug!("no measurement or reset, a single trajectory is exact");
            return 1;
        }
        clamped
    }
}

// =============================================================================
// 2. Single trajectory replay
// =============================================================================

/// Samples a computational-basis measurement of `qubit` and collapses the
/// state onto the outcome. An outcome of vanishing probability leaves the
/// state unchanged.
pub fn measure_qubit<R: Rng + ?Sized>(
    state: &mut QuantumStateVector,
    qubit: usize,
    rng: &mut R,
) -> Result<u8, StateError> {
    let [probability_zero, probability_one] = state.qubit_outcome_probabilities(qubit)?;
    let draw: f64 = rng.gen();
    let (outcome, probability) = if draw < probability_zero {
        (0u8, probability_zero)
    } else {
        (1u8, probability_one)
    };
    if probability > OUTCOME_PROBABILITY_THRESHOLD {
        state.collapse(qubit, outcome)?;
    }
    Ok(outcome)
}

fn single_target(operation: &OperationInstance) -> Result<usize, StateError> {
    match operation.target_quantum_bits.as_slice() {
        [qubit] => Ok(*qubit),
        targets => Err(StateError::DimensionMismatch {
            expected: 1,
            actual: targets.len(),
        }),
    }
}

/// Reset is a physical reset: the qubit is sampled like a measurement and an
/// outcome of 1 is moved back to |0>, matching the exact engine's reset
/// channel.
fn replay_operation<R: Rng + ?Sized>(
    operation: &OperationInstance,
    state: &mut QuantumStateVector,
    classical_state: &mut ClassicalState,
    rng: &mut R,
) -> Result<(), StateError> {
    match &operation.kind {
        OperationKind::Barrier => Ok(()),
        OperationKind::Measure => {
            let outcome = measure_qubit(state, single_target(operation)?, rng)?;
            if let Some(classical_bit) = operation.classical_target {
                classical_state.record(classical_bit, outcome);
            }
            Ok(())
        }
        OperationKind::Reset => {
            let qubit = single_target(operation)?;
            if measure_qubit(state, qubit, rng)? == 1 {
                state.flip_collapsed_qubit_to_zero(qubit)?;
            }
            Ok(())
        }
        OperationKind::Gate(_) | OperationKind::CustomUnitary { .. } => {
            state.apply_operation(operation)
        }
    }
}

/// Replays the circuit once from |0...0> with a fresh classical register.
pub fn run_single_trajectory<R: Rng + ?Sized>(
    circuit: &QuantumCircuitStructure,
    rng: &mut R,
) -> Result<QuantumStateVector, TrajectoryError> {
    let mut state = QuantumStateVector::zero_state(circuit.number_of_quantum_bits());
    let mut classical_state = ClassicalState::new();

    for (index, operation) in circuit.operations().iter().enumerate() {
        if let Some(condition) = &operation.classical_condition {
            if !condition.is_satisfied(&classical_state) {
                continue;
            }
        }
        replay_operation(operation, &mut state, &mut classical_state, rng).map_err(|source| {
            TrajectoryError::OperationFailed {
                index,
                name: operation.operation_name().to_string(),
                source,
            }
        })?;
    }
    Ok(state)
}

fn sample_reduced_states<R: Rng + ?Sized>(
    circuit: &QuantumCircuitStructure,
    rng: &mut R,
) -> Result<Vec<ReducedDensityMatrix>, TrajectoryError> {
    let state = run_single_trajectory(circuit, rng)?;
    (0..circuit.number_of_quantum_bits())
        .map(|qubit| reduce_state_vector_by_projection(&state, qubit).map_err(TrajectoryError::from))
        .collect()
}

// =============================================================================
// 3. Trajectory averaging
// =============================================================================

impl TrajectoryPipeline {
    /// Runs with an injected random source. `shots` is clamped into the
    /// configured bounds.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        rng: &mut R,
        cancellation: &CancellationToken,
    ) -> PipelineResult<RawSimulationOutput> {
        self.average_trajectories(circuit, shots, rng, cancellation, sample_reduced_states)
    }

    /// Averages the per-qubit states returned by `sample` over the successful
    /// trajectories. Failed trajectories are logged, counted and skipped.
    fn average_trajectories<R, F>(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        rng: &mut R,
        cancellation: &CancellationToken,
        mut sample: F,
    ) -> PipelineResult<RawSimulationOutput>
    where
        R: Rng + ?Sized,
        F: FnMut(&QuantumCircuitStructure, &mut R) -> Result<Vec<ReducedDensityMatrix>, TrajectoryError>,
    {
        self.check_circuit(circuit)?;
        let start_time = Instant::now();
        let trajectories = self.effective_shots(circuit, shots);
        tracing::info!(
            engine = %EngineName::Trajectory,
            qubits = circuit.number_of_quantum_bits(),
            operations = circuit.operation_count(),
            shots = trajectories,
            "starting simulation"
        );

        let number_of_quantum_bits = circuit.number_of_quantum_bits();
        let mut accumulated = vec![ReducedDensityMatrix::zeros(); number_of_quantum_bits];
        let mut successes = 0usize;
        let mut failures = 0usize;

        for trajectory in 0..trajectories {
            if cancellation.is_cancelled() {
                tracing::info!(completed = successes, "trajectory simulation cancelled");
                return Err(PipelineError::Cancelled);
            }
            match sample(circuit, rng) {
                Ok(reduced_states) => {
                    for (sum, rho) in accumulated.iter_mut().zip(&reduced_states) {
                        *sum = sum.add(rho);
                    }
                    successes += 1;
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(trajectory, error = %err, "trajectory failed, skipping");
                }
            }
        }

        if successes == 0 {
            return Err(PipelineError::simulation(
                EngineName::Trajectory,
                circuit.summary(),
                format!("all {trajectories} trajectories failed"),
            ));
        }

        let mut diagnostics = Vec::new();
        if failures > 0 {
            diagnostics.push(format!("{failures} of {trajectories} trajectories failed and were skipped"));
        }
        let scale = 1.0 / successes as f64;
        let reductions = accumulated
            .iter()
            .map(|sum| sum.scale(scale).sanitize())
            .collect();
        let per_qubit = assemble_reports(EngineName::Trajectory, reductions, &mut diagnostics);

        let execution_time = start_time.elapsed().as_secs_f64();
        tracing::info!(
            engine = %EngineName::Trajectory,
            execution_time,
            successes,
            failures,
            "simulation finished"
        );
        Ok(RawSimulationOutput {
            per_qubit,
            execution_time,
            shots_used: successes,
            diagnostics,
        })
    }
}

// =============================================================================
// 4. SimulationPipelineInterface implementation
// =============================================================================

impl SimulationPipelineInterface for TrajectoryPipeline {
    fn engine_name(&self) -> EngineName {
        EngineName::Trajectory
    }

    fn maximum_quantum_bits(&self) -> usize {
        self.configuration.trajectory_maximum_quantum_bits
    }

    fn supports_measurements(&self) -> bool {
        true
    }

    fn description(&self) -> &'static str {
        "Monte Carlo statevector trajectories with sampled measurement collapse"
    }

    fn check_circuit(&self, circuit: &QuantumCircuitStructure) -> PipelineResult<()> {
        check_common_limits(circuit, &self.configuration, EngineName::Trajectory)
    }

    fn run(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        cancellation: &CancellationToken,
    ) -> PipelineResult<RawSimulationOutput> {
        let mut rng = self.build_rng();
        self.run_with_rng(circuit, shots, &mut rng, cancellation)
    }

    fn estimate_resources(&self, circuit: &QuantumCircuitStructure, shots: usize) -> ResourceEstimate {
        let number_of_quantum_bits = circuit.number_of_quantum_bits();
        let operation_count = circuit.operation_count();
        let dimension = 2f64.powi(number_of_quantum_bits as i32);

        let single_trajectory = complex_buffer_mebibytes(dimension);
        let accumulators = complex_buffer_mebibytes(4.0 * number_of_quantum_bits as f64);
        let trajectory_time = 0.01 * dimension * operation_count as f64 / 10_000.0;

        ResourceEstimate {
            engine: EngineName::Trajectory,
            memory_mebibytes: (single_trajectory + accumulators) * 1.2,
            time_seconds: self.configuration.clamp_shots(shots) as f64 * trajectory_time * 1.5,
            complexity: ComplexityClass::classify(number_of_quantum_bits, operation_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_program::ClassicalCondition;
    use crate::error::ReductionError;
    use crate::gate_operations::StandardGate;
    use num_complex::Complex64;
    use rand::rngs::mock::StepRng;

    fn seeded_pipeline() -> TrajectoryPipeline {
        TrajectoryPipeline::new(PipelineConfiguration::deterministic(7))
    }

    #[test]
    fn test_measurement_mixes_superposition() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_hadamard_gate(0).apply_measurement(0, 0);
        let output = seeded_pipeline()
            .run(&circuit, 4000, &CancellationToken::new())
            .unwrap();
        let report = output.per_qubit[&0];
        assert_eq!(output.shots_used, 4000);
        assert!(report.bloch.x.abs() < 1e-9);
        assert!(report.bloch.z.abs() < 0.1);
        assert!(report.purity < 0.6);
    }

    #[test]
    fn test_measurement_collapse_is_consistent() {
        let mut state = QuantumStateVector::zero_state(2);
        state
            .apply_operator(&StandardGate::Hadamard.gate_matrix(&[]).unwrap(), &[0])
            .unwrap();
        // StepRng(0, 0) always draws 0.0, which selects outcome 0.
        let mut rng = StepRng::new(0, 0);
        assert_eq!(measure_qubit(&mut state, 0, &mut rng).unwrap(), 0);
        assert!((state.amplitude(0).norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vanishing_outcome_leaves_state_unchanged() {
        // p0 = 0.25, p1 = 1e-18; a draw near 1.0 selects outcome 1.
        let amplitudes = vec![Complex64::new(0.5, 0.0), Complex64::new(1e-9, 0.0)];
        let mut state = QuantumStateVector::from_amplitudes(amplitudes.clone()).unwrap();
        let mut rng = StepRng::new(u64::MAX, 0);
        let mut classical_state = ClassicalState::new();

        replay_operation(
            &OperationInstance::measure(0, 0),
            &mut state,
            &mut classical_state,
            &mut rng,
        )
        .unwrap();

        assert_eq!(classical_state.value(0), 1);
        assert_eq!(state.amplitude(0), amplitudes[0]);
        assert_eq!(state.amplitude(1), amplitudes[1]);
    }

    #[test]
    fn test_failed_trajectories_are_skipped_and_counted() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_measurement(0, 0);
        let pipeline = seeded_pipeline();
        let mut rng = StdRng::seed_from_u64(3);

        let mut trajectory = 0usize;
        let output = pipeline
            .average_trajectories(&circuit, 200, &mut rng, &CancellationToken::new(), |_, _| {
                trajectory += 1;
                if trajectory % 4 == 0 {
                    Err(TrajectoryError::Reduction(ReductionError::NonFinite))
                } else {
                    Ok(vec![ReducedDensityMatrix::ground_state()])
                }
            })
            .unwrap();

        assert_eq!(output.shots_used, 150);
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].contains("50 of 200"));
        assert!((output.per_qubit[&0].bloch.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_trajectories_failing_is_a_simulation_error() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_measurement(0, 0);
        let mut rng = StdRng::seed_from_u64(3);

        let result = seeded_pipeline().average_trajectories(
            &circuit,
            100,
            &mut rng,
            &CancellationToken::new(),
            |_, _| Err(TrajectoryError::Reduction(ReductionError::NonFinite)),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Simulation {
                engine: EngineName::Trajectory,
                ..
            })
        ));
    }

    #[test]
    fn test_reset_after_x() {
        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_pauli_x_gate(0).apply_reset(0);
        let output = seeded_pipeline()
            .run(&circuit, 200, &CancellationToken::new())
            .unwrap();
        assert_eq!(output.per_qubit[&0].bloch.components(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_feed_forward_condition_combines_bits() {
        // Both qubits flipped and measured; the register reads 0b11 = 3.
        let mut circuit = QuantumCircuitStructure::new(3);
        circuit
            .apply_pauli_x_gate(0)
            .apply_pauli_x_gate(1)
            .apply_measurement(0, 0)
            .apply_measurement(1, 1);
        circuit.apply_conditioned_gate(
            StandardGate::PauliX,
            vec![2],
            Vec::new(),
            ClassicalCondition::new(vec![0, 1], 3),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let state = run_single_trajectory(&circuit, &mut rng).unwrap();
        assert!((state.amplitude(0b111).norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shot_clamping_and_shortcut() {
        let mut measured = QuantumCircuitStructure::new(1);
        measured.apply_measurement(0, 0);
        let pipeline = seeded_pipeline();
        let output = pipeline
            .run(&measured, 5, &CancellationToken::new())
            .unwrap();
        assert_eq!(output.shots_used, 100);

        let mut unitary = QuantumCircuitStructure::new(1);
        unitary.apply_hadamard_gate(0);
        let output = pipeline.run(&unitary, 2000, &CancellationToken::new()).unwrap();
        assert_eq!(output.shots_used, 1);
        assert!((output.per_qubit[&0].bloch.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit
            .apply_hadamard_gate(0)
            .apply_controlled_not_gate(0, 1)
            .apply_measurement(0, 0);
        let first = seeded_pipeline().run(&circuit, 300, &CancellationToken::new()).unwrap();
        let second = seeded_pipeline().run(&circuit, 300, &CancellationToken::new()).unwrap();
        assert_eq!(first.per_qubit, second.per_qubit);
    }

    #[test]
    fn test_qubit_cap_and_cancellation() {
        let pipeline = seeded_pipeline();
        let oversized = QuantumCircuitStructure::new(17);
        assert!(matches!(
            pipeline.run(&oversized, 100, &CancellationToken::new()),
            Err(PipelineError::ResourceLimit { .. })
        ));

        let mut circuit = QuantumCircuitStructure::new(1);
        circuit.apply_measurement(0, 0);
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            pipeline.run(&circuit, 100, &token),
            Err(PipelineError::Cancelled)
        ));
    }

    #[test]
    fn test_shot_recommendations() {
        let recommendation = TrajectoryPipeline::default().shot_recommendations();
        assert_eq!(
            recommendation,
            ShotRecommendation {
                minimum: 100,
                recommended: 1024,
                maximum: 100_000
            }
        );
    }
}
