// =============================================================================
// MACROHARD Quantum Visualizer - Pipeline Router
// =============================================================================
// Table of Contents:
//   1. EngineName - Closed set of simulation engines
//   2. Routing thresholds
//   3. route - Pure engine selection
//   4. route_circuit - Convenience wrapper over a circuit
// =============================================================================
// Purpose: Maps (is_unitary, qubit count, shots, override) to an engine. No
//          I/O apart from a trace event, no retries. Fallback on engine
//          failure belongs to the orchestrator.
// =============================================================================

use crate::circuit_program::QuantumCircuitStructure;
use crate::error::UnknownEngineName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// 1. EngineName - Closed set of simulation engines
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineName {
    Unitary,
    ExactDensity,
    Trajectory,
}

impl EngineName {
    pub const ALL: [EngineName; 3] = [
        EngineName::Unitary,
        EngineName::ExactDensity,
        EngineName::Trajectory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineName::Unitary => "unitary",
            EngineName::ExactDensity => "exact_density",
            EngineName::Trajectory => "trajectory",
        }
    }
}

impl fmt::Display for EngineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineName {
    type Err = UnknownEngineName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unitary" => Ok(EngineName::Unitary),
            "exact_density" => Ok(EngineName::ExactDensity),
            "trajectory" => Ok(EngineName::Trajectory),
            _ => Err(UnknownEngineName(value.to_string())),
        }
    }
}

// =============================================================================
// 2. Routing thresholds
// =============================================================================

pub const UNITARY_ROUTING_MAXIMUM_QUBITS: usize = 20;
pub const EXACT_DENSITY_ROUTING_MAXIMUM_QUBITS: usize = 8;
pub const TRAJECTORY_ROUTING_MAXIMUM_QUBITS: usize = 16;

// =============================================================================
// 3. route - Pure engine selection
// =============================================================================

/// Selects the engine for a circuit shape.
///
/// A recognized `override_engine` always wins. Unrecognized overrides are
/// ignored with a warning and automatic routing applies. `shots` is accepted
/// for interface stability; the current decision table does not depend on it.
pub fn route(
    is_unitary: bool,
    number_of_quantum_bits: usize,
    shots: usize,
    override_engine: Option<&str>,
) -> EngineName {
    if let Some(requested) = override_engine {
        match requested.parse::<EngineName>() {
            Ok(engine) => {
                tracing::info!(engine = %engine, "forced routing");
                return engine;
            }
            Err(err) => tracing::warn!("{err}, using automatic routing"),
        }
    }

    let engine = if is_unitary && number_of_quantum_bits <= UNITARY_ROUTING_MAXIMUM_QUBITS {
        EngineName::Unitary
    } else if !is_unitary {
        if number_of_quantum_bits <= EXACT_DENSITY_ROUTING_MAXIMUM_QUBITS {
            EngineName::ExactDensity
        } else {
            // Above the trajectory cap this is best effort; the engine's own
            // validation may still reject the circuit.
            EngineName::Trajectory
        }
    } else {
        EngineName::ExactDensity
    };

    tracing::debug!(
        engine = %engine,
        is_unitary,
        qubits = number_of_quantum_bits,
        shots,
        "routed circuit"
    );
    engine
}

// =============================================================================
// 4. route_circuit - Convenience wrapper
// =============================================================================

pub fn route_circuit(
    circuit: &QuantumCircuitStructure,
    shots: usize,
    override_engine: Option<&str>,
) -> EngineName {
    route(
        circuit.is_unitary(),
        circuit.number_of_quantum_bits(),
        shots,
        override_engine,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unitary_small_routes_to_unitary() {
        assert_eq!(route(true, 5, 1024, None), EngineName::Unitary);
        assert_eq!(route(true, 20, 1024, None), EngineName::Unitary);
    }

    #[test]
    fn test_non_unitary_routing_bands() {
        assert_eq!(route(false, 5, 1024, None), EngineName::ExactDensity);
        assert_eq!(route(false, 8, 1024, None), EngineName::ExactDensity);
        assert_eq!(route(false, 9, 1024, None), EngineName::Trajectory);
        assert_eq!(route(false, 12, 1024, None), EngineName::Trajectory);
        assert_eq!(route(false, 16, 1024, None), EngineName::Trajectory);
        assert_eq!(route(false, 20, 1024, None), EngineName::Trajectory);
    }

    #[test]
    fn test_large_unitary_falls_back_to_exact_density() {
        assert_eq!(route(true, 21, 1024, None), EngineName::ExactDensity);
    }

    #[test]
    fn test_override_wins() {
        assert_eq!(
            route(true, 2, 1024, Some("trajectory")),
            EngineName::Trajectory
        );
        assert_eq!(
            route(false, 12, 1024, Some("exact_density")),
            EngineName::ExactDensity
        );
    }

    #[test]
    fn test_unknown_override_is_ignored() {
        assert_eq!(route(true, 2, 1024, Some("quantum_magic")), EngineName::Unitary);
    }

    #[test]
    fn test_engine_name_round_trip() {
        for engine in EngineName::ALL {
            assert_eq!(engine.as_str().parse::<EngineName>(), Ok(engine));
        }
        assert!("".parse::<EngineName>().is_err());
    }

    #[test]
    fn test_unknown_engine_name_is_an_error() {
        let err = "gpu".parse::<EngineName>().unwrap_err();
        assert_eq!(err, UnknownEngineName("gpu".to_string()));
        assert_eq!(err.to_string(), "unknown engine name: gpu");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn test_route_circuit_uses_unitarity() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit.apply_hadamard_gate(0);
        assert_eq!(route_circuit(&circuit, 1024, None), EngineName::Unitary);

        circuit.apply_measurement(0, 0);
        assert_eq!(route_circuit(&circuit, 1024, None), EngineName::ExactDensity);
    }
}
