// =============================================================================
// MACROHARD Quantum Visualizer - Reduction Operators
// =============================================================================
// Table of Contents:
//   1. Statevector reduction by tensor contraction
//   2. Statevector reduction by basis projection
//   3. Density matrix partial trace
//   4. Whole-register helpers
// =============================================================================
// Purpose: Partial trace from an n-qubit state down to one qubit. Results are
//          Hermitized, trace-normalized and noise-flushed before they leave
//          this module.
// =============================================================================

use crate::error::ReductionError;
use crate::observables::ReducedDensityMatrix;
use crate::state_backend::{DensityMatrixState, QuantumStateBackendInterface, QuantumStateVector};
use ndarray::{ArrayD, Axis, Ix2};
use num_complex::Complex64;

fn check_qubit(qubit: usize, total: usize) -> Result<(), ReductionError> {
    if qubit >= total {
        return Err(ReductionError::QubitOutOfRange { qubit, total });
    }
    Ok(())
}

fn shape_error(err: ndarray::ShapeError) -> ReductionError {
    ReductionError::Shape(err.to_string())
}

/// Row-major tensor axis holding `qubit` (qubit 0 is the last axis).
fn tensor_axis(qubit: usize, number_of_quantum_bits: usize) -> usize {
    number_of_quantum_bits - 1 - qubit
}

// =============================================================================
// 1. Statevector reduction by tensor contraction
// =============================================================================

/// Views the amplitudes as an n-axis tensor, moves the qubit's axis to the
/// front and flattens to `V` of shape (2, 2^(n-1)); `rho = V V^dagger`.
pub fn reduce_state_vector(
    state: &QuantumStateVector,
    qubit: usize,
) -> Result<ReducedDensityMatrix, ReductionError> {
    let number_of_quantum_bits = state.number_of_quantum_bits();
    check_qubit(qubit, number_of_quantum_bits)?;

    let tensor = state
        .amplitudes()
        .view()
        .into_shape_with_order(vec![2usize; number_of_quantum_bits])
        .map_err(shape_error)?;

    let front = tensor_axis(qubit, number_of_quantum_bits);
    let order: Vec<usize> = std::iter::once(front)
        .chain((0..number_of_quantum_bits).filter(|&axis| axis != front))
        .collect();
    let permuted = tensor.permuted_axes(order);

    let matrix = permuted
        .to_shape((2, 1usize << (number_of_quantum_bits - 1)))
        .map_err(shape_error)?;
    let adjoint = matrix.t().mapv(|entry| entry.conj());
    let rho = matrix.dot(&adjoint);

    ReducedDensityMatrix::from_array(&rho)?.sanitize()
}

// =============================================================================
// 2. Statevector reduction by basis projection
// =============================================================================

/// Direct O(2^n) accumulation over basis indices grouped by the qubit's bit.
pub fn reduce_state_vector_by_projection(
    state: &QuantumStateVector,
    qubit: usize,
) -> Result<ReducedDensityMatrix, ReductionError> {
    check_qubit(qubit, state.number_of_quantum_bits())?;
    let bit = 1usize << qubit;
    let amplitudes = state.amplitudes();

    let mut elements = [[Complex64::new(0.0, 0.0); 2]; 2];
    for index in (0..amplitudes.len()).filter(|index| index & bit == 0) {
        let pair = [amplitudes[index], amplitudes[index | bit]];
        for row in 0..2 {
            for column in 0..2 {
                elements[row][column] += pair[row] * pair[column].conj();
            }
        }
    }
    ReducedDensityMatrix::new(elements).sanitize()
}

// =============================================================================
// 3. Density matrix partial trace
// =============================================================================

fn trace_axis_pair(
    tensor: &ArrayD<Complex64>,
    row_axis: usize,
    column_axis: usize,
) -> ArrayD<Complex64> {
    // column_axis > row_axis, so removing the column axis first keeps
    // row_axis valid.
    let zero_block = tensor
        .view()
        .index_axis_move(Axis(column_axis), 0)
        .index_axis_move(Axis(row_axis), 0);
    let one_block = tensor
        .view()
        .index_axis_move(Axis(column_axis), 1)
        .index_axis_move(Axis(row_axis), 1);
    &zero_block + &one_block
}

/// Views rho as a 2n-axis tensor (row axes then column axes) and traces out
/// every other qubit one axis pair at a time.
pub fn reduce_density_matrix(
    state: &DensityMatrixState,
    qubit: usize,
) -> Result<ReducedDensityMatrix, ReductionError> {
    let number_of_quantum_bits = state.number_of_quantum_bits();
    check_qubit(qubit, number_of_quantum_bits)?;

    let mut tensor = state
        .matrix()
        .to_owned()
        .into_shape_with_order(vec![2usize; 2 * number_of_quantum_bits])
        .map_err(shape_error)?;

    // Qubits still present, in row-axis order.
    let mut remaining: Vec<usize> = (0..number_of_quantum_bits).rev().collect();
    while remaining.len() > 1 {
        let position = remaining
            .iter()
            .position(|&present| present != qubit)
            .ok_or_else(|| ReductionError::Shape("no qubit left to trace".to_string()))?;
        let column_axis = remaining.len() + position;
        tensor = trace_axis_pair(&tensor, position, column_axis);
        remaining.remove(position);
    }

    let rho = tensor.into_dimensionality::<Ix2>().map_err(shape_error)?;
    ReducedDensityMatrix::from_array(&rho)?.sanitize()
}

// =============================================================================
// 4. Whole-register helpers
// =============================================================================

pub fn reduce_all_state_vector_qubits(
    state: &QuantumStateVector,
) -> Vec<Result<ReducedDensityMatrix, ReductionError>> {
    (0..state.number_of_quantum_bits())
        .map(|qubit| reduce_state_vector(state, qubit))
        .collect()
}

pub fn reduce_all_density_matrix_qubits(
    state: &DensityMatrixState,
) -> Vec<Result<ReducedDensityMatrix, ReductionError>> {
    (0..state.number_of_quantum_bits())
        .map(|qubit| reduce_density_matrix(state, qubit))
        .collect()
}
