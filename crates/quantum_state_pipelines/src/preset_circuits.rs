// =============================================================================
// MACROHARD Quantum Visualizer - Preset Circuits
// =============================================================================
// Table of Contents:
//   1. PresetCircuit - Named demonstration circuits
//   2. Circuit builders
// =============================================================================

use crate::circuit_program::QuantumCircuitStructure;
use crate::error::CircuitError;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// 1. PresetCircuit
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetCircuit {
    Bell,
    Ghz,
    Superposition,
    RandomUnitary,
    WState,
}

impl PresetCircuit {
    pub const ALL: [PresetCircuit; 5] = [
        PresetCircuit::Bell,
        PresetCircuit::Ghz,
        PresetCircuit::Superposition,
        PresetCircuit::RandomUnitary,
        PresetCircuit::WState,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PresetCircuit::Bell => "bell",
            PresetCircuit::Ghz => "ghz",
            PresetCircuit::Superposition => "superposition",
            PresetCircuit::RandomUnitary => "random_unitary",
            PresetCircuit::WState => "w_state",
        }
    }

    pub fn build(&self) -> QuantumCircuitStructure {
        match self {
            PresetCircuit::Bell => bell_state_circuit(),
            PresetCircuit::Ghz => ghz_circuit(3),
            PresetCircuit::Superposition => superposition_circuit(),
            PresetCircuit::RandomUnitary => random_unitary_circuit(),
            PresetCircuit::WState => w_state_circuit(),
        }
    }
}

impl fmt::Display for PresetCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PresetCircuit {
    type Err = CircuitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PresetCircuit::ALL
            .into_iter()
            .find(|preset| preset.name() == value)
            .ok_or_else(|| CircuitError::UnknownPreset(value.to_string()))
    }
}

// =============================================================================
// 2. Circuit builders
// =============================================================================

pub fn bell_state_circuit() -> QuantumCircuitStructure {
    let mut circuit = QuantumCircuitStructure::new(2);
    circuit.apply_hadamard_gate(0).apply_controlled_not_gate(0, 1);
    circuit
}

/// (|0...0> + |1...1>)/sqrt2 built as a CX ladder.
pub fn ghz_circuit(number_of_quantum_bits: usize) -> QuantumCircuitStructure {
    let mut circuit = QuantumCircuitStructure::new(number_of_quantum_bits);
    if number_of_quantum_bits == 0 {
        return circuit;
    }
    circuit.apply_hadamard_gate(0);
    for qubit in 1..number_of_quantum_bits {
        circuit.apply_controlled_not_gate(qubit - 1, qubit);
    }
    circuit
}

pub fn superposition_circuit() -> QuantumCircuitStructure {
    let mut circuit = QuantumCircuitStructure::new(1);
    circuit.apply_hadamard_gate(0);
    circuit
}

/// Fixed rotation sequence with one entangling gate.
pub fn random_unitary_circuit() -> QuantumCircuitStructure {
    let mut circuit = QuantumCircuitStructure::new(2);
    circuit
        .apply_rotation_y_gate(0, FRAC_PI_2)
        .apply_rotation_x_gate(1, FRAC_PI_4)
        .apply_controlled_not_gate(0, 1)
        .apply_rotation_z_gate(0, FRAC_PI_6);
    circuit
}

/// (|001> + |010> + |100>)/sqrt3.
pub fn w_state_circuit() -> QuantumCircuitStructure {
    let theta = 2.0 * (1.0 / 3f64.sqrt()).acos();
    let mut circuit = QuantumCircuitStructure::new(3);
    circuit
        .apply_rotation_y_gate(0, theta)
        .apply_controlled_hadamard_gate(0, 1)
        .apply_toffoli_gate(0, 1, 2)
        .apply_controlled_not_gate(0, 1)
        .apply_pauli_x_gate(0);
    circuit
}
