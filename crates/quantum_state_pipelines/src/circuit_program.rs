// =============================================================================
// MACROHARD Quantum Visualizer - Circuit Program IR
// =============================================================================
// Table of Contents:
//   1. ClassicalState - Per-execution classical register
//   2. ClassicalCondition - Gating of operations on classical bits
//   3. OperationKind / OperationInstance - Single circuit operation
//   4. QuantumCircuitStructure - Main circuit container
// =============================================================================
// Purpose: Structured circuit handed to the pipelines by the ingestion layer.
//          The circuit is immutable once built and may be shared between
//          concurrent simulations. Qubit 0 is the least-significant bit of a
//          basis-state index.
// =============================================================================

use crate::error::{CircuitError, CircuitSummary};
use crate::gate_operations::{
    check_operator_dimension, is_unitary_matrix, OperatorMatrix, StandardGate,
};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

const CUSTOM_UNITARY_TOLERANCE: f64 = 1e-9;

/// Widest classical register a condition can compare against.
pub const MAXIMUM_CONDITION_BITS: usize = u64::BITS as usize;

// =============================================================================
// 1. ClassicalState - Per-execution classical register
// =============================================================================

/// Classical bits recorded by measurements during one execution or one
/// trajectory. Bits never written read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassicalState {
    bits: BTreeMap<usize, u8>,
}

impl ClassicalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, classical_bit: usize, value: u8) {
        self.bits.insert(classical_bit, value & 1);
    }

    pub fn value(&self, classical_bit: usize) -> u8 {
        self.bits.get(&classical_bit).copied().unwrap_or(0)
    }

    pub fn recorded_bits(&self) -> usize {
        self.bits.len()
    }
}

// =============================================================================
// 2. ClassicalCondition - Gating of operations on classical bits
// =============================================================================

/// `classical_bits[k]` supplies bit k of the register value compared with
/// `expected_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicalCondition {
    pub classical_bits: Vec<usize>,
    pub expected_value: u64,
}

impl ClassicalCondition {
    pub fn new(classical_bits: Vec<usize>, expected_value: u64) -> Self {
        Self {
            classical_bits,
            expected_value,
        }
    }

    pub fn on_bit(classical_bit: usize, expected_value: u8) -> Self {
        Self::new(vec![classical_bit], u64::from(expected_value & 1))
    }

    /// Register value, or `None` when the condition reads more than
    /// `MAXIMUM_CONDITION_BITS` bits.
    pub fn register_value(&self, state: &ClassicalState) -> Option<u64> {
        self.classical_bits
            .iter()
            .enumerate()
            .try_fold(0u64, |acc, (position, &bit)| {
                let position = u32::try_from(position).ok()?;
                Some(acc | u64::from(state.value(bit)).checked_shl(position)?)
            })
    }

    /// An over-wide condition is never satisfied.
    pub fn is_satisfied(&self, state: &ClassicalState) -> bool {
        self.register_value(state) == Some(self.expected_value)
    }
}

// =============================================================================
// 3. OperationKind / OperationInstance
// =============================================================================

#[derive(Debug, Clone)]
pub enum OperationKind {
    Gate(StandardGate),
    CustomUnitary { label: String, matrix: OperatorMatrix },
    Measure,
    Reset,
    Barrier,
}

#[derive(Debug, Clone)]
pub struct OperationInstance {
    pub kind: OperationKind,
    pub target_quantum_bits: Vec<usize>,
    pub parameters: Vec<f64>,
    pub classical_target: Option<usize>,
    pub classical_condition: Option<ClassicalCondition>,
}

impl OperationInstance {
    pub fn gate(gate: StandardGate, target_quantum_bits: Vec<usize>, parameters: Vec<f64>) -> Self {
        Self {
            kind: OperationKind::Gate(gate),
            target_quantum_bits,
            parameters,
            classical_target: None,
            classical_condition: None,
        }
    }

    pub fn custom_unitary(
        label: impl Into<String>,
        matrix: OperatorMatrix,
        target_quantum_bits: Vec<usize>,
    ) -> Self {
        Self {
            kind: OperationKind::CustomUnitary {
                label: label.into(),
                matrix,
            },
            target_quantum_bits,
            parameters: Vec::new(),
            classical_target: None,
            classical_condition: None,
        }
    }

    pub fn measure(qubit: usize, classical_bit: usize) -> Self {
        Self {
            kind: OperationKind::Measure,
            target_quantum_bits: vec![qubit],
            parameters: Vec::new(),
            classical_target: Some(classical_bit),
            classical_condition: None,
        }
    }

    pub fn reset(qubit: usize) -> Self {
        Self {
            kind: OperationKind::Reset,
            target_quantum_bits: vec![qubit],
            parameters: Vec::new(),
            classical_target: None,
            classical_condition: None,
        }
    }

    pub fn barrier(qubits: Vec<usize>) -> Self {
        Self {
            kind: OperationKind::Barrier,
            target_quantum_bits: qubits,
            parameters: Vec::new(),
            classical_target: None,
            classical_condition: None,
        }
    }

    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.classical_condition = Some(condition);
        self
    }

    pub fn operation_name(&self) -> &str {
        match &self.kind {
            OperationKind::Gate(gate) => gate.gate_name(),
            OperationKind::CustomUnitary { label, .. } => label,
            OperationKind::Measure => "measure",
            OperationKind::Reset => "reset",
            OperationKind::Barrier => "barrier",
        }
    }

    pub fn target_qubits(&self) -> &[usize] {
        &self.target_quantum_bits
    }

    pub fn is_measurement(&self) -> bool {
        matches!(self.kind, OperationKind::Measure)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self.kind, OperationKind::Reset)
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, OperationKind::Barrier)
    }

    /// Measurement and reset; barriers are unitary no-ops.
    pub fn is_non_unitary(&self) -> bool {
        self.is_measurement() || self.is_reset()
    }

    pub fn is_conditioned(&self) -> bool {
        self.classical_condition.is_some()
    }

    /// Matrix acting on `target_quantum_bits`, or `None` for measure, reset and
    /// barrier.
    pub fn unitary_matrix(&self) -> Result<Option<OperatorMatrix>, CircuitError> {
        match &self.kind {
            OperationKind::Gate(gate) => gate.gate_matrix(&self.parameters).map(Some),
            OperationKind::CustomUnitary { matrix, .. } => Ok(Some(matrix.clone())),
            OperationKind::Measure | OperationKind::Reset | OperationKind::Barrier => Ok(None),
        }
    }

    fn validate(
        &self,
        number_of_quantum_bits: usize,
        number_of_classical_bits: usize,
    ) -> Result<(), CircuitError> {
        let mut seen = HashSet::with_capacity(self.target_quantum_bits.len());
        for &qubit in &self.target_quantum_bits {
            if qubit >= number_of_quantum_bits {
                return Err(CircuitError::InvalidQubitIndex {
                    index: qubit,
                    total: number_of_quantum_bits,
                });
            }
            if !seen.insert(qubit) {
                return Err(CircuitError::DuplicateQubit(qubit));
            }
        }

        let required_targets = match &self.kind {
            OperationKind::Gate(gate) => {
                gate.gate_matrix(&self.parameters)?;
                Some(gate.number_of_target_qubits())
            }
            OperationKind::CustomUnitary { label, matrix } => {
                check_operator_dimension(matrix, self.target_quantum_bits.len())?;
                if !is_unitary_matrix(matrix, CUSTOM_UNITARY_TOLERANCE) {
                    return Err(CircuitError::NonUnitaryMatrix(label.clone()));
                }
                None
            }
            OperationKind::Measure => {
                let qubit = self.target_quantum_bits.first().copied().unwrap_or_default();
                match self.classical_target {
                    None => return Err(CircuitError::MissingClassicalTarget(qubit)),
                    Some(bit) if bit >= number_of_classical_bits => {
                        return Err(CircuitError::InvalidClassicalBitIndex {
                            index: bit,
                            total: number_of_classical_bits,
                        })
                    }
                    Some(_) => {}
                }
                Some(1)
            }
            OperationKind::Reset => Some(1),
            OperationKind::Barrier => None,
        };

        if let Some(required) = required_targets {
            if self.target_quantum_bits.len() != required {
                return Err(CircuitError::QubitCountMismatch {
                    gate: self.operation_name().to_string(),
                    required,
                    provided: self.target_quantum_bits.len(),
                });
            }
        }

        if let Some(condition) = &self.classical_condition {
            if condition.classical_bits.len() > MAXIMUM_CONDITION_BITS {
                return Err(CircuitError::ConditionTooWide {
                    width: condition.classical_bits.len(),
                    max: MAXIMUM_CONDITION_BITS,
                });
            }
            if let Some(&bit) = condition
                .classical_bits
                .iter()
                .find(|&&bit| bit >= number_of_classical_bits)
            {
                return Err(CircuitError::InvalidClassicalBitIndex {
                    index: bit,
                    total: number_of_classical_bits,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// 4. QuantumCircuitStructure - Main circuit container
// =============================================================================

#[derive(Debug, Clone)]
pub struct QuantumCircuitStructure {
    id: Uuid,
    number_of_quantum_bits: usize,
    number_of_classical_bits: usize,
    operations: Vec<OperationInstance>,
}

impl QuantumCircuitStructure {
    /// Circuit with one classical bit per qubit.
    pub fn new(number_of_quantum_bits: usize) -> Self {
        Self::with_classical_bits(number_of_quantum_bits, number_of_quantum_bits)
    }

    pub fn with_classical_bits(number_of_quantum_bits: usize, number_of_classical_bits: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            number_of_quantum_bits,
            number_of_classical_bits,
            operations: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    pub fn number_of_classical_bits(&self) -> usize {
        self.number_of_classical_bits
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[OperationInstance] {
        &self.operations
    }

    /// True iff no operation is a measurement or reset.
    pub fn is_unitary(&self) -> bool {
        !self.operations.iter().any(OperationInstance::is_non_unitary)
    }

    pub fn has_classical_conditions(&self) -> bool {
        self.operations.iter().any(OperationInstance::is_conditioned)
    }

    pub fn summary(&self) -> CircuitSummary {
        CircuitSummary {
            number_of_quantum_bits: self.number_of_quantum_bits,
            operation_count: self.operations.len(),
        }
    }

    /// Structural checks: qubit and classical indices, arity, parameters and
    /// custom matrix shape.
    pub fn validate_structure(&self) -> Result<(), CircuitError> {
        if self.number_of_quantum_bits == 0 {
            return Err(CircuitError::NoQuantumBits);
        }
        self.operations.iter().try_for_each(|operation| {
            operation.validate(self.number_of_quantum_bits, self.number_of_classical_bits)
        })
    }

    pub fn add_operation(&mut self, operation: OperationInstance) -> &mut Self {
        self.operations.push(operation);
        self
    }

    pub fn apply_gate(
        &mut self,
        gate: StandardGate,
        target_quantum_bits: Vec<usize>,
        parameters: Vec<f64>,
    ) -> &mut Self {
        self.add_operation(OperationInstance::gate(gate, target_quantum_bits, parameters))
    }

    pub fn apply_conditioned_gate(
        &mut self,
        gate: StandardGate,
        target_quantum_bits: Vec<usize>,
        parameters: Vec<f64>,
        condition: ClassicalCondition,
    ) -> &mut Self {
        self.add_operation(
            OperationInstance::gate(gate, target_quantum_bits, parameters).with_condition(condition),
        )
    }

    pub fn apply_hadamard_gate(&mut self, qubit: usize) -> &mut Self {
        self.apply_gate(StandardGate::Hadamard, vec![qubit], Vec::new())
    }

    pub fn apply_pauli_x_gate(&mut self, qubit: usize) -> &mut Self {
        self.apply_gate(StandardGate::PauliX, vec![qubit], Vec::new())
    }

    pub fn apply_pauli_y_gate(&mut self, qubit: usize) -> &mut Self {
        self.apply_gate(StandardGate::PauliY, vec![qubit], Vec::new())
    }

    pub fn apply_pauli_z_gate(&mut self, qubit: usize) -> &mut Self {
        self.apply_gate(StandardGate::PauliZ, vec![qubit], Vec::new())
    }

    pub fn apply_phase_s_gate(&mut self, qubit: usize) -> &mut Self {
        self.apply_gate(StandardGate::PhaseS, vec![qubit], Vec::new())
    }

    pub fn apply_phase_t_gate(&mut self, qubit: usize) -> &mut Self {
        self.apply_gate(StandardGate::PhaseT, vec![qubit], Vec::new())
    }

    pub fn apply_rotation_x_gate(&mut self, qubit: usize, theta: f64) -> &mut Self {
        self.apply_gate(StandardGate::RotationX, vec![qubit], vec![theta])
    }

    pub fn apply_rotation_y_gate(&mut self, qubit: usize, theta: f64) -> &mut Self {
        self.apply_gate(StandardGate::RotationY, vec![qubit], vec![theta])
    }

    pub fn apply_rotation_z_gate(&mut self, qubit: usize, theta: f64) -> &mut Self {
        self.apply_gate(StandardGate::RotationZ, vec![qubit], vec![theta])
    }

    pub fn apply_controlled_not_gate(&mut self, control: usize, target: usize) -> &mut Self {
        self.apply_gate(StandardGate::ControlledNot, vec![control, target], Vec::new())
    }

    pub fn apply_controlled_z_gate(&mut self, control: usize, target: usize) -> &mut Self {
        self.apply_gate(StandardGate::ControlledZ, vec![control, target], Vec::new())
    }

    pub fn apply_controlled_hadamard_gate(&mut self, control: usize, target: usize) -> &mut Self {
        self.apply_gate(StandardGate::ControlledHadamard, vec![control, target], Vec::new())
    }

    pub fn apply_swap_gate(&mut self, qubit_a: usize, qubit_b: usize) -> &mut Self {
        self.apply_gate(StandardGate::Swap, vec![qubit_a, qubit_b], Vec::new())
    }

    pub fn apply_toffoli_gate(&mut self, control_a: usize, control_b: usize, target: usize) -> &mut Self {
        self.apply_gate(StandardGate::Toffoli, vec![control_a, control_b, target], Vec::new())
    }

    pub fn apply_custom_unitary(
        &mut self,
        label: impl Into<String>,
        matrix: OperatorMatrix,
        target_quantum_bits: Vec<usize>,
    ) -> &mut Self {
        self.add_operation(OperationInstance::custom_unitary(label, matrix, target_quantum_bits))
    }

    pub fn apply_measurement(&mut self, qubit: usize, classical_bit: usize) -> &mut Self {
        self.add_operation(OperationInstance::measure(qubit, classical_bit))
    }

    pub fn apply_reset(&mut self, qubit: usize) -> &mut Self {
        self.add_operation(OperationInstance::reset(qubit))
    }

    pub fn apply_barrier(&mut self, qubits: Vec<usize>) -> &mut Self {
        self.add_operation(OperationInstance::barrier(qubits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate_operations::pauli_x_matrix;
    use ndarray::Array2;

    #[test]
    fn test_circuit_creation() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit.apply_hadamard_gate(0);
        circuit.apply_controlled_not_gate(0, 1);

        assert_eq!(circuit.number_of_quantum_bits(), 2);
        assert_eq!(circuit.number_of_classical_bits(), 2);
        assert_eq!(circuit.operation_count(), 2);
        assert!(circuit.is_unitary());
        assert!(circuit.validate_structure().is_ok());
    }

    #[test]
    fn test_measurement_and_reset_break_unitarity() {
        let mut measured = QuantumCircuitStructure::new(1);
        measured.apply_hadamard_gate(0).apply_measurement(0, 0);
        assert!(!measured.is_unitary());

        let mut reset = QuantumCircuitStructure::new(1);
        reset.apply_reset(0);
        assert!(!reset.is_unitary());

        let mut barrier = QuantumCircuitStructure::new(2);
        barrier.apply_barrier(vec![0, 1]);
        assert!(barrier.is_unitary());
    }

    #[test]
    fn test_condition_combines_all_bits() {
        let mut state = ClassicalState::new();
        state.record(0, 1);
        state.record(2, 1);

        let condition = ClassicalCondition::new(vec![0, 1, 2], 0b101);
        assert_eq!(condition.register_value(&state), Some(5));
        assert!(condition.is_satisfied(&state));

        let most_recent_only = ClassicalCondition::on_bit(2, 1);
        assert!(most_recent_only.is_satisfied(&state));
        assert!(!ClassicalCondition::on_bit(1, 1).is_satisfied(&state));
    }

    #[test]
    fn test_condition_wider_than_register_is_rejected() {
        let mut circuit = QuantumCircuitStructure::with_classical_bits(1, 70);
        circuit.apply_measurement(0, 0).apply_conditioned_gate(
            StandardGate::PauliX,
            vec![0],
            Vec::new(),
            ClassicalCondition::new((0..70).collect(), 0),
        );
        assert_eq!(
            circuit.validate_structure(),
            Err(CircuitError::ConditionTooWide { width: 70, max: 64 })
        );

        let wide = ClassicalCondition::new((0..70).collect(), 0);
        assert_eq!(wide.register_value(&ClassicalState::new()), None);
        assert!(!wide.is_satisfied(&ClassicalState::new()));

        let full_width = ClassicalCondition::new((0..64).collect(), 1 << 63);
        let mut state = ClassicalState::new();
        state.record(63, 1);
        assert!(full_width.is_satisfied(&state));
    }

    #[test]
    fn test_validation_rejects_bad_indices() {
        let mut circuit = QuantumCircuitStructure::new(2);
        circuit.apply_hadamard_gate(2);
        assert_eq!(
            circuit.validate_structure(),
            Err(CircuitError::InvalidQubitIndex { index: 2, total: 2 })
        );

        let mut duplicate = QuantumCircuitStructure::new(2);
        duplicate.apply_controlled_not_gate(1, 1);
        assert_eq!(duplicate.validate_structure(), Err(CircuitError::DuplicateQubit(1)));

        let mut classical = QuantumCircuitStructure::with_classical_bits(2, 1);
        classical.apply_measurement(1, 1);
        assert!(matches!(
            classical.validate_structure(),
            Err(CircuitError::InvalidClassicalBitIndex { index: 1, total: 1 })
        ));
    }

    #[test]
    fn test_validation_rejects_arity_and_matrix_problems() {
        let mut arity = QuantumCircuitStructure::new(3);
        arity.apply_gate(StandardGate::ControlledNot, vec![0], Vec::new());
        assert!(matches!(
            arity.validate_structure(),
            Err(CircuitError::QubitCountMismatch { required: 2, provided: 1, .. })
        ));

        let mut custom = QuantumCircuitStructure::new(2);
        custom.apply_custom_unitary("not_unitary", Array2::zeros((2, 2)), vec![0]);
        assert!(matches!(
            custom.validate_structure(),
            Err(CircuitError::NonUnitaryMatrix(_))
        ));

        let mut wrong_shape = QuantumCircuitStructure::new(2);
        wrong_shape.apply_custom_unitary("x", pauli_x_matrix(), vec![0, 1]);
        assert!(matches!(
            wrong_shape.validate_structure(),
            Err(CircuitError::MatrixDimensionMismatch { expected: 4, .. })
        ));
    }

    #[test]
    fn test_empty_circuit_is_valid_but_zero_qubits_is_not() {
        assert!(QuantumCircuitStructure::new(1).validate_structure().is_ok());
        assert_eq!(
            QuantumCircuitStructure::new(0).validate_structure(),
            Err(CircuitError::NoQuantumBits)
        );
    }
}
