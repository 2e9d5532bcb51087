// =============================================================================
// MACROHARD Quantum Visualizer - State Backend
// =============================================================================
// Table of Contents:
//   1. QuantumStateBackendInterface - Trait for state representations
//   2. Local operator kernel
//   3. QuantumStateVector - Dense pure state
//   4. DensityMatrixState - Dense mixed state
// =============================================================================
// Purpose: Dense state representations used by the three engines. Basis index
//          bit q holds the state of qubit q (qubit 0 is least significant).
//          For a k-qubit operator on targets [t0, ..., tk-1], local index bit j
//          is the state of tj.
// =============================================================================

use crate::circuit_program::OperationInstance;
use crate::error::{CircuitError, StateError};
use crate::gate_operations::OperatorMatrix;
use ndarray::{Array1, Array2, ArrayViewMut1};
use num_complex::Complex64;

const ZERO_NORM_THRESHOLD: f64 = 1e-15;

// =============================================================================
// 1. QuantumStateBackendInterface - Common interface for all backends
// =============================================================================

pub trait QuantumStateBackendInterface {
    fn number_of_quantum_bits(&self) -> usize;

    fn reset_to_zero_state(&mut self);

    /// Applies a 2^k x 2^k unitary to the listed target qubits.
    fn apply_operator(&mut self, matrix: &OperatorMatrix, targets: &[usize])
        -> Result<(), StateError>;

    /// `[P(0), P(1)]` for a computational-basis measurement of `qubit`.
    fn qubit_outcome_probabilities(&self, qubit: usize) -> Result<[f64; 2], StateError>;

    /// Applies the matrix of a gate or custom unitary operation.
    fn apply_operation(&mut self, operation: &OperationInstance) -> Result<(), StateError> {
        if operation.is_barrier() {
            return Ok(());
        }
        let matrix = operation
            .unitary_matrix()?
            .ok_or_else(|| StateError::NotUnitary(operation.operation_name().to_string()))?;
        self.apply_operator(&matrix, operation.target_qubits())
    }
}

// =============================================================================
// 2. Local operator kernel
// =============================================================================

/// Precomputed index layout for one operator application.
struct LocalOperatorLayout {
    target_mask: usize,
    offsets: Vec<usize>,
}

impl LocalOperatorLayout {
    fn new(
        matrix: &OperatorMatrix,
        targets: &[usize],
        number_of_quantum_bits: usize,
    ) -> Result<Self, StateError> {
        let local_dimension = 1usize << targets.len();
        let (rows, columns) = matrix.dim();
        if rows != local_dimension || columns != local_dimension {
            return Err(StateError::DimensionMismatch {
                expected: local_dimension,
                actual: rows.max(columns),
            });
        }

        let mut target_mask = 0usize;
        for &target in targets {
            if target >= number_of_quantum_bits {
                return Err(CircuitError::InvalidQubitIndex {
                    index: target,
                    total: number_of_quantum_bits,
                }
                .into());
            }
            if target_mask & (1 << target) != 0 {
                return Err(CircuitError::DuplicateQubit(target).into());
            }
            target_mask |= 1 << target;
        }

        let offsets = (0..local_dimension)
            .map(|local| {
                targets
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| local & (1 << bit) != 0)
                    .fold(0usize, |acc, (_, &target)| acc | (1 << target))
            })
            .collect();

        Ok(Self {
            target_mask,
            offsets,
        })
    }

    fn apply(&self, matrix: &OperatorMatrix, mut vector: ArrayViewMut1<'_, Complex64>) {
        let local_dimension = self.offsets.len();
        let mut gathered = vec![Complex64::new(0.0, 0.0); local_dimension];
        for base in 0..vector.len() {
            if base & self.target_mask != 0 {
                continue;
            }
            for (slot, offset) in gathered.iter_mut().zip(&self.offsets) {
                *slot = vector[base | offset];
            }
            for (row, offset) in self.offsets.iter().enumerate() {
                vector[base | offset] = (0..local_dimension)
                    .map(|column| matrix[[row, column]] * gathered[column])
                    .sum();
            }
        }
    }
}

fn check_qubit(qubit: usize, number_of_quantum_bits: usize) -> Result<(), StateError> {
    if qubit >= number_of_quantum_bits {
        return Err(CircuitError::InvalidQubitIndex {
            index: qubit,
            total: number_of_quantum_bits,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// 3. QuantumStateVector - Full state vector representation
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct QuantumStateVector {
    amplitudes: Array1<Complex64>,
    number_of_quantum_bits: usize,
}

impl QuantumStateVector {
    pub fn zero_state(number_of_quantum_bits: usize) -> Self {
        let mut amplitudes = Array1::zeros(1usize << number_of_quantum_bits);
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            number_of_quantum_bits,
        }
    }

    /// Wraps raw amplitudes. The length must be a power of two; the vector is
    /// not renormalized.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> Result<Self, StateError> {
        let dimension = amplitudes.len();
        if !dimension.is_power_of_two() {
            return Err(StateError::NonPowerOfTwoDimension(dimension));
        }
        Ok(Self {
            number_of_quantum_bits: dimension.trailing_zeros() as usize,
            amplitudes: Array1::from(amplitudes),
        })
    }

    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes[index]
    }

    pub fn amplitudes(&self) -> &Array1<Complex64> {
        &self.amplitudes
    }

    pub fn into_amplitudes(self) -> Array1<Complex64> {
        self.amplitudes
    }

    pub fn norm_squared(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    pub fn normalize(&mut self) -> Result<(), StateError> {
        let norm = self.norm_squared().sqrt();
        if norm <= ZERO_NORM_THRESHOLD {
            return Err(StateError::ZeroNorm);
        }
        self.amplitudes.mapv_inplace(|a| a / norm);
        Ok(())
    }

    pub fn probability_distribution(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Projects `qubit` onto `outcome` and renormalizes. Returns the outcome
    /// probability before projection.
    pub fn collapse(&mut self, qubit: usize, outcome: u8) -> Result<f64, StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        let keep_set = outcome & 1 == 1;
        let probability = self.qubit_outcome_probabilities(qubit)?[usize::from(keep_set)];

        for (index, amplitude) in self.amplitudes.iter_mut().enumerate() {
            if (index & bit != 0) != keep_set {
                *amplitude = Complex64::new(0.0, 0.0);
            }
        }
        self.normalize()?;
        Ok(probability)
    }

    /// Moves all amplitude with `qubit` set onto the matching index with the
    /// bit cleared. Used after a collapse to outcome 1 to complete a reset.
    pub fn flip_collapsed_qubit_to_zero(&mut self, qubit: usize) -> Result<(), StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        for index in 0..self.dimension() {
            if index & bit != 0 {
                let amplitude = self.amplitudes[index];
                self.amplitudes[index ^ bit] += amplitude;
                self.amplitudes[index] = Complex64::new(0.0, 0.0);
            }
        }
        Ok(())
    }

    pub fn inner_product(&self, other: &Self) -> Complex64 {
        self.amplitudes
            .iter()
            .zip(other.amplitudes.iter())
            .map(|(a, b)| a.conj() * b)
            .sum()
    }
}

impl QuantumStateBackendInterface for QuantumStateVector {
    fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    fn reset_to_zero_state(&mut self) {
        self.amplitudes.fill(Complex64::new(0.0, 0.0));
        self.amplitudes[0] = Complex64::new(1.0, 0.0);
    }

    fn apply_operator(
        &mut self,
        matrix: &OperatorMatrix,
        targets: &[usize],
    ) -> Result<(), StateError> {
        let layout = LocalOperatorLayout::new(matrix, targets, self.number_of_quantum_bits)?;
        layout.apply(matrix, self.amplitudes.view_mut());
        Ok(())
    }

    fn qubit_outcome_probabilities(&self, qubit: usize) -> Result<[f64; 2], StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        let mut probabilities = [0.0; 2];
        for (index, amplitude) in self.amplitudes.iter().enumerate() {
            probabilities[usize::from(index & bit != 0)] += amplitude.norm_sqr();
        }
        Ok(probabilities)
    }
}

// =============================================================================
// 4. DensityMatrixState - Full density matrix representation
// =============================================================================

/// `matrix[[i, j]] = <i| rho |j>`. Branch states produced by projection are
/// left unnormalized so their trace carries the branch weight.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrixState {
    matrix: Array2<Complex64>,
    number_of_quantum_bits: usize,
}

impl DensityMatrixState {
    pub fn zero_state(number_of_quantum_bits: usize) -> Self {
        let dimension = 1usize << number_of_quantum_bits;
        let mut matrix = Array2::zeros((dimension, dimension));
        matrix[[0, 0]] = Complex64::new(1.0, 0.0);
        Self {
            matrix,
            number_of_quantum_bits,
        }
    }

    /// `rho_ij = psi_i * conj(psi_j)`.
    pub fn from_state_vector(state: &QuantumStateVector) -> Self {
        let amplitudes = state.amplitudes();
        let dimension = amplitudes.len();
        let matrix =
            Array2::from_shape_fn((dimension, dimension), |(i, j)| amplitudes[i] * amplitudes[j].conj());
        Self {
            matrix,
            number_of_quantum_bits: state.number_of_quantum_bits(),
        }
    }

    pub fn from_matrix(matrix: Array2<Complex64>) -> Result<Self, StateError> {
        let (rows, columns) = matrix.dim();
        if rows != columns {
            return Err(StateError::DimensionMismatch {
                expected: rows,
                actual: columns,
            });
        }
        if !rows.is_power_of_two() {
            return Err(StateError::NonPowerOfTwoDimension(rows));
        }
        Ok(Self {
            number_of_quantum_bits: rows.trailing_zeros() as usize,
            matrix,
        })
    }

    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> Array2<Complex64> {
        self.matrix
    }

    pub fn trace(&self) -> Complex64 {
        self.matrix.diag().sum()
    }

    pub fn scale(&mut self, factor: f64) {
        self.matrix.mapv_inplace(|entry| entry * factor);
    }

    pub fn accumulate(&mut self, other: &DensityMatrixState) -> Result<(), StateError> {
        if other.dimension() != self.dimension() {
            return Err(StateError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        self.matrix += &other.matrix;
        Ok(())
    }

    /// Rescales to unit trace. Fails on a vanishing trace.
    pub fn normalize_trace(&mut self) -> Result<(), StateError> {
        let trace = self.trace().re;
        if trace.abs() <= ZERO_NORM_THRESHOLD {
            return Err(StateError::ZeroNorm);
        }
        self.scale(1.0 / trace);
        Ok(())
    }

    /// Unnormalized branch `P rho P` for `P = |outcome><outcome|` on `qubit`.
    /// Its trace is the outcome probability.
    pub fn project(&self, qubit: usize, outcome: u8) -> Result<DensityMatrixState, StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        let wanted = if outcome & 1 == 1 { bit } else { 0 };
        let matrix = Array2::from_shape_fn(self.matrix.dim(), |(i, j)| {
            if i & bit == wanted && j & bit == wanted {
                self.matrix[[i, j]]
            } else {
                Complex64::new(0.0, 0.0)
            }
        });
        Ok(DensityMatrixState {
            matrix,
            number_of_quantum_bits: self.number_of_quantum_bits,
        })
    }

    /// Non-selective measurement: removes coherences across the two values of
    /// `qubit`.
    pub fn dephase(&mut self, qubit: usize) -> Result<(), StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        for ((i, j), entry) in self.matrix.indexed_iter_mut() {
            if (i ^ j) & bit != 0 {
                *entry = Complex64::new(0.0, 0.0);
            }
        }
        Ok(())
    }

    /// Reset channel with Kraus operators `|0><0|` and `|0><1|` on `qubit`.
    pub fn reset_qubit(&mut self, qubit: usize) -> Result<(), StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        let dimension = self.dimension();
        let mut reset = Array2::zeros((dimension, dimension));
        for i in (0..dimension).filter(|i| i & bit == 0) {
            for j in (0..dimension).filter(|j| j & bit == 0) {
                reset[[i, j]] = self.matrix[[i, j]] + self.matrix[[i | bit, j | bit]];
            }
        }
        self.matrix = reset;
        Ok(())
    }
}

impl QuantumStateBackendInterface for DensityMatrixState {
    fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    fn reset_to_zero_state(&mut self) {
        self.matrix.fill(Complex64::new(0.0, 0.0));
        self.matrix[[0, 0]] = Complex64::new(1.0, 0.0);
    }

    /// `rho -> U rho U^dagger`: U acts on every column, conj(U) on every row.
    fn apply_operator(
        &mut self,
        matrix: &OperatorMatrix,
        targets: &[usize],
    ) -> Result<(), StateError> {
        let layout = LocalOperatorLayout::new(matrix, targets, self.number_of_quantum_bits)?;
        let conjugate = matrix.mapv(|entry| entry.conj());
        for column in self.matrix.columns_mut() {
            layout.apply(matrix, column);
        }
        for row in self.matrix.rows_mut() {
            layout.apply(&conjugate, row);
        }
        Ok(())
    }

    fn qubit_outcome_probabilities(&self, qubit: usize) -> Result<[f64; 2], StateError> {
        check_qubit(qubit, self.number_of_quantum_bits)?;
        let bit = 1usize << qubit;
        let mut probabilities = [0.0; 2];
        for (index, entry) in self.matrix.diag().iter().enumerate() {
            probabilities[usize::from(index & bit != 0)] += entry.re;
        }
        Ok(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate_operations::{
        controlled_operator, hadamard_matrix, pauli_x_matrix, rotation_y_matrix, StandardGate,
    };

    const TOLERANCE: f64 = 1e-10;

    fn assert_close(actual: Complex64, expected: Complex64) {
        assert!(
            (actual - expected).norm() < TOLERANCE,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_zero_state_initialization() {
        let state = QuantumStateVector::zero_state(3);
        assert_eq!(state.number_of_quantum_bits(), 3);
        assert_eq!(state.dimension(), 8);
        assert_close(state.amplitude(0), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_from_amplitudes_rejects_bad_length() {
        let result = QuantumStateVector::from_amplitudes(vec![Complex64::new(1.0, 0.0); 3]);
        assert_eq!(result, Err(StateError::NonPowerOfTwoDimension(3)));
    }

    #[test]
    fn test_pauli_x_on_qubit_one_sets_bit_one() {
        let mut state = QuantumStateVector::zero_state(2);
        state.apply_operator(&pauli_x_matrix(), &[1]).unwrap();
        assert_close(state.amplitude(0b10), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_bell_state_amplitudes() {
        let mut state = QuantumStateVector::zero_state(2);
        state.apply_operator(&hadamard_matrix(), &[0]).unwrap();
        state
            .apply_operator(&controlled_operator(&pauli_x_matrix(), 1), &[0, 1])
            .unwrap();

        let expected = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        assert_close(state.amplitude(0b00), expected);
        assert_close(state.amplitude(0b11), expected);
        assert_close(state.amplitude(0b01), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_control_order_follows_targets() {
        // Control on qubit 1, target qubit 0: |10> -> |11>.
        let mut state = QuantumStateVector::zero_state(2);
        state.apply_operator(&pauli_x_matrix(), &[1]).unwrap();
        let cx = StandardGate::ControlledNot.gate_matrix(&[]).unwrap();
        state.apply_operator(&cx, &[1, 0]).unwrap();
        assert_close(state.amplitude(0b11), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_operator_dimension_checked() {
        let mut state = QuantumStateVector::zero_state(2);
        let result = state.apply_operator(&hadamard_matrix(), &[0, 1]);
        assert!(matches!(result, Err(StateError::DimensionMismatch { .. })));

        let out_of_range = state.apply_operator(&hadamard_matrix(), &[2]);
        assert!(matches!(
            out_of_range,
            Err(StateError::Circuit(CircuitError::InvalidQubitIndex { .. }))
        ));
    }

    #[test]
    fn test_collapse_and_flip_to_zero() {
        let mut state = QuantumStateVector::zero_state(1);
        state.apply_operator(&hadamard_matrix(), &[0]).unwrap();
        let probability = state.collapse(0, 1).unwrap();
        assert!((probability - 0.5).abs() < TOLERANCE);
        assert_close(state.amplitude(1), Complex64::new(1.0, 0.0));

        state.flip_collapsed_qubit_to_zero(0).unwrap();
        assert_close(state.amplitude(0), Complex64::new(1.0, 0.0));
        assert_close(state.amplitude(1), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_density_matches_pure_evolution() {
        let mut pure = QuantumStateVector::zero_state(2);
        let mut mixed = DensityMatrixState::zero_state(2);
        let ry = rotation_y_matrix(0.7);
        let cx = controlled_operator(&pauli_x_matrix(), 1);

        pure.apply_operator(&ry, &[0]).unwrap();
        pure.apply_operator(&cx, &[0, 1]).unwrap();
        mixed.apply_operator(&ry, &[0]).unwrap();
        mixed.apply_operator(&cx, &[0, 1]).unwrap();

        let expected = DensityMatrixState::from_state_vector(&pure);
        for ((i, j), value) in mixed.matrix().indexed_iter() {
            assert_close(*value, expected.matrix()[[i, j]]);
        }
    }

    #[test]
    fn test_projection_weights_and_dephasing() {
        let mut state = QuantumStateVector::zero_state(1);
        state.apply_operator(&hadamard_matrix(), &[0]).unwrap();
        let rho = DensityMatrixState::from_state_vector(&state);

        let branch = rho.project(0, 1).unwrap();
        assert!((branch.trace().re - 0.5).abs() < TOLERANCE);

        let mut dephased = rho.clone();
        dephased.dephase(0).unwrap();
        assert_close(dephased.matrix()[[0, 1]], Complex64::new(0.0, 0.0));
        assert_close(dephased.matrix()[[1, 1]], Complex64::new(0.5, 0.0));
    }

    #[test]
    fn test_reset_channel_returns_ground_state() {
        let mut state = QuantumStateVector::zero_state(2);
        state.apply_operator(&hadamard_matrix(), &[0]).unwrap();
        state
            .apply_operator(&controlled_operator(&pauli_x_matrix(), 1), &[0, 1])
            .unwrap();
        let mut rho = DensityMatrixState::from_state_vector(&state);
        rho.reset_qubit(0).unwrap();

        assert!((rho.trace().re - 1.0).abs() < TOLERANCE);
        let probabilities = rho.qubit_outcome_probabilities(0).unwrap();
        assert!((probabilities[0] - 1.0).abs() < TOLERANCE);
        let other = rho.qubit_outcome_probabilities(1).unwrap();
        assert!((other[1] - 0.5).abs() < TOLERANCE);
    }
}
