// =============================================================================
// MACROHARD Quantum Visualizer - Unified Error Types
// =============================================================================
// Table of Contents:
//   1. CircuitSummary - Diagnostic snapshot carried by pipeline errors
//   2. PipelineError - Main error enum
//   3. CircuitError - Circuit construction and validation errors
//   4. StateError - State backend errors
//   5. ReductionError - Per-qubit partial trace errors
//   6. TrajectoryError - Single Monte Carlo trajectory errors
//   7. UnknownEngineName - Engine override parsing
// =============================================================================
// Purpose: Error taxonomy shared by the router, the three simulation engines
//          and the orchestrator. Unsupported-circuit and resource-limit errors
//          are eligible for the one-shot exact density fallback; simulation
//          errors are fatal.
// =============================================================================

use crate::router::EngineName;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// 1. CircuitSummary - Diagnostic snapshot
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub number_of_quantum_bits: usize,
    pub operation_count: usize,
}

impl fmt::Display for CircuitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} qubits, {} operations",
            self.number_of_quantum_bits, self.operation_count
        )
    }
}

// =============================================================================
// 2. PipelineError - Main error enum
// =============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Circuit not suitable for {engine} pipeline ({summary}): {reason}")]
    UnsupportedCircuit {
        engine: EngineName,
        summary: CircuitSummary,
        reason: String,
    },

    #[error("Circuit exceeds {engine} pipeline limits ({summary}): {reason}")]
    ResourceLimit {
        engine: EngineName,
        summary: CircuitSummary,
        reason: String,
    },

    #[error("{engine} simulation failed ({summary}): {reason}")]
    Simulation {
        engine: EngineName,
        summary: CircuitSummary,
        reason: String,
    },

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Simulation cancelled")]
    Cancelled,

    #[error("Timeout after {0} milliseconds")]
    Timeout(u64),
}

impl PipelineError {
    pub fn unsupported_circuit(
        engine: EngineName,
        summary: CircuitSummary,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::UnsupportedCircuit {
            engine,
            summary,
            reason: reason.into(),
        }
    }

    pub fn resource_limit(
        engine: EngineName,
        summary: CircuitSummary,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::ResourceLimit {
            engine,
            summary,
            reason: reason.into(),
        }
    }

    pub fn simulation(
        engine: EngineName,
        summary: CircuitSummary,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::Simulation {
            engine,
            summary,
            reason: reason.into(),
        }
    }

    /// Unsuitable-circuit errors may be retried once against exact_density.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedCircuit { .. } | PipelineError::ResourceLimit { .. }
        )
    }

    pub fn engine(&self) -> Option<EngineName> {
        match self {
            PipelineError::UnsupportedCircuit { engine, .. }
            | PipelineError::ResourceLimit { engine, .. }
            | PipelineError::Simulation { engine, .. } => Some(*engine),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<CircuitSummary> {
        match self {
            PipelineError::UnsupportedCircuit { summary, .. }
            | PipelineError::ResourceLimit { summary, .. }
            | PipelineError::Simulation { summary, .. } => Some(*summary),
            _ => None,
        }
    }
}

// =============================================================================
// 3. CircuitError - Circuit construction and validation errors
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CircuitError {
    #[error("Invalid qubit index {index}: circuit has {total} qubits")]
    InvalidQubitIndex { index: usize, total: usize },

    #[error("Invalid classical bit index {index}: circuit has {total} classical bits")]
    InvalidClassicalBitIndex { index: usize, total: usize },

    #[error("Gate {gate} requires {required} qubits, but {provided} were provided")]
    QubitCountMismatch {
        gate: String,
        required: usize,
        provided: usize,
    },

    #[error("Gate {gate} expects {expected} parameters, got {actual}")]
    ParameterCountMismatch {
        gate: String,
        expected: usize,
        actual: usize,
    },

    #[error("Operator matrix is {rows}x{columns}, expected {expected}x{expected}")]
    MatrixDimensionMismatch {
        rows: usize,
        columns: usize,
        expected: usize,
    },

    #[error("Operator matrix for {0} is not unitary")]
    NonUnitaryMatrix(String),

    #[error("Non-finite gate parameter in {0}")]
    NonFiniteParameter(String),

    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    #[error("Unknown preset circuit: {0}")]
    UnknownPreset(String),

    #[error("Duplicate qubit in operation targets: qubit {0}")]
    DuplicateQubit(usize),

    #[error("Measurement on qubit {0} has no classical target bit")]
    MissingClassicalTarget(usize),

    #[error("Classical condition reads {width} bits, at most {max} are supported")]
    ConditionTooWide { width: usize, max: usize },

    #[error("Circuit has no qubits")]
    NoQuantumBits,

    #[error("Circuit too large: {qubits} qubits exceeds maximum {max}")]
    TooManyQuantumBits { qubits: usize, max: usize },

    #[error("Circuit too long: {operations} operations exceeds maximum {max}")]
    TooManyOperations { operations: usize, max: usize },
}

// =============================================================================
// 4. StateError - State backend errors
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    #[error("Amplitude vector length {0} is not a power of two")]
    NonPowerOfTwoDimension(usize),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("State vector has zero norm")]
    ZeroNorm,

    #[error("Operation {0} has no unitary matrix")]
    NotUnitary(String),

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),
}

// =============================================================================
// 5. ReductionError - Per-qubit partial trace errors
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReductionError {
    #[error("Qubit {qubit} out of range for {total}-qubit state")]
    QubitOutOfRange { qubit: usize, total: usize },

    #[error("Degenerate reduced state: trace {0:e} too small to normalize")]
    DegenerateTrace(f64),

    #[error("Reduced state contains non-finite entries")]
    NonFinite,

    #[error("Tensor reshape failed: {0}")]
    Shape(String),
}

// =============================================================================
// 6. TrajectoryError - Single trajectory errors
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrajectoryError {
    #[error("Operation {index} ({name}) failed: {source}")]
    OperationFailed {
        index: usize,
        name: String,
        #[source]
        source: StateError,
    },

    #[error("Reduction failed: {0}")]
    Reduction(#[from] ReductionError),
}

// =============================================================================
// 7. UnknownEngineName - Engine override parsing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown engine name: {0}")]
pub struct UnknownEngineName(pub String);

// =============================================================================
// Result type alias
// =============================================================================

pub type PipelineResult<T> = Result<T, PipelineError>;
