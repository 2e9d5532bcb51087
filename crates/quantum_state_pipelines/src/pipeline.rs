// =============================================================================
// MACROHARD Quantum Visualizer - Shared Pipeline Contract
// =============================================================================
// Table of Contents:
//   1. RawSimulationOutput - Per-qubit engine output
//   2. ResourceEstimate / PipelineDescription
//   3. SimulationPipelineInterface - Engine trait
//   4. Shared validation and report assembly
//   5. postprocess - Boundary cleanup of engine output
//   6. SimulationEngine - Closed engine set
// =============================================================================
// Purpose: What every engine exposes (validate, preprocess, run, resource
//          estimate) and the cleanup applied to every engine's output before
//          it is reported.
// =============================================================================

use crate::circuit_program::QuantumCircuitStructure;
use crate::configuration::PipelineConfiguration;
use crate::error::{CircuitError, PipelineError, PipelineResult, ReductionError};
use crate::exact_density_pipeline::ExactDensityPipeline;
use crate::execution::CancellationToken;
use crate::observables::{QubitStateReport, ReducedDensityMatrix};
use crate::router::EngineName;
use crate::trajectory_pipeline::TrajectoryPipeline;
use crate::unitary_pipeline::UnitaryPipeline;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

const BYTES_PER_COMPLEX: f64 = 16.0;
const BYTES_PER_MEBIBYTE: f64 = 1024.0 * 1024.0;

// =============================================================================
// 1. RawSimulationOutput - Per-qubit engine output
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSimulationOutput {
    pub per_qubit: BTreeMap<usize, QubitStateReport>,
    /// Seconds.
    pub execution_time: f64,
    pub shots_used: usize,
    pub diagnostics: Vec<String>,
}

// =============================================================================
// 2. ResourceEstimate / PipelineDescription
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Low,
    Medium,
    High,
}

impl ComplexityClass {
    pub fn classify(number_of_quantum_bits: usize, operation_count: usize) -> Self {
        if number_of_quantum_bits <= 10 && operation_count <= 50 {
            ComplexityClass::Low
        } else if number_of_quantum_bits <= 20 && operation_count <= 200 {
            ComplexityClass::Medium
        } else {
            ComplexityClass::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub engine: EngineName,
    pub memory_mebibytes: f64,
    pub time_seconds: f64,
    pub complexity: ComplexityClass,
}

/// Memory in MiB for `count` complex numbers.
pub fn complex_buffer_mebibytes(count: f64) -> f64 {
    count * BYTES_PER_COMPLEX / BYTES_PER_MEBIBYTE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescription {
    pub engine: EngineName,
    pub maximum_quantum_bits: usize,
    pub supports_measurements: bool,
    pub description: String,
}

// =============================================================================
// 3. SimulationPipelineInterface - Engine trait
// =============================================================================

pub trait SimulationPipelineInterface {
    fn engine_name(&self) -> EngineName;

    fn maximum_quantum_bits(&self) -> usize;

    fn supports_measurements(&self) -> bool;

    fn description(&self) -> &'static str;

    /// Explains why the circuit cannot run on this engine.
    fn check_circuit(&self, circuit: &QuantumCircuitStructure) -> PipelineResult<()>;

    fn validate(&self, circuit: &QuantumCircuitStructure) -> bool {
        self.check_circuit(circuit).is_ok()
    }

    fn preprocess<'a>(
        &self,
        circuit: &'a QuantumCircuitStructure,
    ) -> Cow<'a, QuantumCircuitStructure> {
        Cow::Borrowed(circuit)
    }

    fn run(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        cancellation: &CancellationToken,
    ) -> PipelineResult<RawSimulationOutput>;

    fn estimate_resources(&self, circuit: &QuantumCircuitStructure, shots: usize) -> ResourceEstimate;

    fn describe(&self) -> PipelineDescription {
        PipelineDescription {
            engine: self.engine_name(),
            maximum_quantum_bits: self.maximum_quantum_bits(),
            supports_measurements: self.supports_measurements(),
            description: self.description().to_string(),
        }
    }
}

// =============================================================================
// 4. Shared validation and report assembly
// =============================================================================

/// Structure, global caller limits, then the engine's own qubit cap.
pub fn check_common_limits(
    circuit: &QuantumCircuitStructure,
    configuration: &PipelineConfiguration,
    engine: EngineName,
) -> PipelineResult<()> {
    circuit.validate_structure()?;

    let number_of_quantum_bits = circuit.number_of_quantum_bits();
    if number_of_quantum_bits > configuration.maximum_quantum_bits {
        return Err(CircuitError::TooManyQuantumBits {
            qubits: number_of_quantum_bits,
            max: configuration.maximum_quantum_bits,
        }
        .into());
    }
    if circuit.operation_count() > configuration.maximum_operations {
        return Err(CircuitError::TooManyOperations {
            operations: circuit.operation_count(),
            max: configuration.maximum_operations,
        }
        .into());
    }

    let engine_limit = configuration.engine_maximum_quantum_bits(engine);
    if number_of_quantum_bits > engine_limit {
        return Err(PipelineError::resource_limit(
            engine,
            circuit.summary(),
            format!("{number_of_quantum_bits} qubits exceeds the {engine_limit}-qubit limit"),
        ));
    }
    Ok(())
}

/// Turns per-qubit reductions into reports. A failed reduction becomes the
/// maximally mixed state and a diagnostic.
pub fn assemble_reports(
    engine: EngineName,
    reductions: Vec<Result<ReducedDensityMatrix, ReductionError>>,
    diagnostics: &mut Vec<String>,
) -> BTreeMap<usize, QubitStateReport> {
    reductions
        .into_iter()
        .enumerate()
        .map(|(qubit, reduction)| {
            let report = match reduction {
                Ok(rho) => QubitStateReport::from_density_matrix(rho),
                Err(err) => {
                    tracing::warn!(%engine, qubit, error = %err, "reduction failed, reporting maximally mixed state");
                    diagnostics.push(format!("qubit {qubit}: reduction failed ({err}), reported I/2"));
                    QubitStateReport::maximally_mixed()
                }
            };
            (qubit, report)
        })
        .collect()
}

// =============================================================================
// 5. postprocess - Boundary cleanup of engine output
// =============================================================================

fn report_is_finite(report: &QubitStateReport) -> bool {
    report.purity.is_finite()
        && report.bloch.components().iter().all(|value| value.is_finite())
        && report.rho.is_finite()
}

/// Records the execution time, clips purity into [0, 1], rescales Bloch
/// vectors longer than 1 (warning when past `bloch_magnitude_slack`) and
/// flags missing qubits without failing.
pub fn postprocess(
    mut raw: RawSimulationOutput,
    number_of_quantum_bits: usize,
    execution_time: f64,
    bloch_magnitude_slack: f64,
) -> RawSimulationOutput {
    raw.execution_time = execution_time;

    for (&qubit, report) in raw.per_qubit.iter_mut() {
        if !report_is_finite(report) {
            tracing::warn!(qubit, "non-finite engine output, reporting maximally mixed state");
            raw.diagnostics
                .push(format!("qubit {qubit}: non-finite engine output, reported I/2"));
            *report = QubitStateReport::maximally_mixed();
            continue;
        }

        report.purity = report.purity.clamp(0.0, 1.0);

        let magnitude = report.bloch.magnitude();
        if magnitude > 1.0 {
            if magnitude > 1.0 + bloch_magnitude_slack {
                tracing::warn!(qubit, magnitude, "Bloch vector outside the unit ball, renormalizing");
                raw.diagnostics
                    .push(format!("qubit {qubit}: Bloch magnitude {magnitude:.9} renormalized"));
            }
            report.bloch = report.bloch.scaled(1.0 / magnitude).clip_tiny_values();
        }
    }

    for qubit in 0..number_of_quantum_bits {
        if !raw.per_qubit.contains_key(&qubit) {
            tracing::warn!(qubit, "engine output is missing a qubit");
            raw.diagnostics.push(format!("qubit {qubit}: missing from engine output"));
        }
    }
    raw
}

// =============================================================================
// 6. SimulationEngine - Closed engine set
// =============================================================================

#[derive(Debug, Clone)]
pub enum SimulationEngine {
    Unitary(UnitaryPipeline),
    ExactDensity(ExactDensityPipeline),
    Trajectory(TrajectoryPipeline),
}

impl SimulationEngine {
    pub fn build(engine: EngineName, configuration: &PipelineConfiguration) -> Self {
        match engine {
            EngineName::Unitary => SimulationEngine::Unitary(UnitaryPipeline::new(configuration.clone())),
            EngineName::ExactDensity => {
                SimulationEngine::ExactDensity(ExactDensityPipeline::new(configuration.clone()))
            }
            EngineName::Trajectory => {
                SimulationEngine::Trajectory(TrajectoryPipeline::new(configuration.clone()))
            }
        }
    }

    fn as_pipeline(&self) -> &dyn SimulationPipelineInterface {
        match self {
            SimulationEngine::Unitary(pipeline) => pipeline,
            SimulationEngine::ExactDensity(pipeline) => pipeline,
            SimulationEngine::Trajectory(pipeline) => pipeline,
        }
    }
}

impl SimulationPipelineInterface for SimulationEngine {
    fn engine_name(&self) -> EngineName {
        self.as_pipeline().engine_name()
    }

    fn maximum_quantum_bits(&self) -> usize {
        self.as_pipeline().maximum_quantum_bits()
    }

    fn supports_measurements(&self) -> bool {
        self.as_pipeline().supports_measurements()
    }

    fn description(&self) -> &'static str {
        self.as_pipeline().description()
    }

    fn check_circuit(&self, circuit: &QuantumCircuitStructure) -> PipelineResult<()> {
        self.as_pipeline().check_circuit(circuit)
    }

    fn preprocess<'a>(
        &self,
        circuit: &'a QuantumCircuitStructure,
    ) -> Cow<'a, QuantumCircuitStructure> {
        self.as_pipeline().preprocess(circuit)
    }

    fn run(
        &self,
        circuit: &QuantumCircuitStructure,
        shots: usize,
        cancellation: &CancellationToken,
    ) -> PipelineResult<RawSimulationOutput> {
        self.as_pipeline().run(circuit, shots, cancellation)
    }

    fn estimate_resources(&self, circuit: &QuantumCircuitStructure, shots: usize) -> ResourceEstimate {
        self.as_pipeline().estimate_resources(circuit, shots)
    }
}

/// Capabilities of every engine under `configuration`.
pub fn describe_pipelines(configuration: &PipelineConfiguration) -> Vec<PipelineDescription> {
    EngineName::ALL
        .iter()
        .map(|&engine| SimulationEngine::build(engine, configuration).describe())
        .collect()
}
