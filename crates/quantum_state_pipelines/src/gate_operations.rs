// =============================================================================
// MACROHARD Quantum Visualizer - Gate Operations
// =============================================================================
// Table of Contents:
//   1. OperatorMatrix and local index convention
//   2. StandardGate - Closed gate set
//   3. Matrix constructors (single-qubit, controlled, swap)
//   4. Unitarity check
// =============================================================================
// Purpose: Gate matrices for every operation the pipelines execute. A k-qubit
//          operation with targets [t0, ..., tk-1] acts on a 2^k x 2^k matrix
//          whose local index bit j is the state of target tj. Controlled gates
//          list their controls first.
// =============================================================================

use crate::error::CircuitError;
use ndarray::{array, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// 1. OperatorMatrix
// =============================================================================

pub type OperatorMatrix = Array2<Complex64>;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

// =============================================================================
// 2. StandardGate - Closed gate set
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardGate {
    Identity,
    Hadamard,
    PauliX,
    PauliY,
    PauliZ,
    PhaseS,
    PhaseSDagger,
    PhaseT,
    PhaseTDagger,
    RotationX,
    RotationY,
    RotationZ,
    UnitaryU1,
    UnitaryU2,
    UnitaryU3,
    ControlledNot,
    ControlledY,
    ControlledZ,
    ControlledHadamard,
    Swap,
    Toffoli,
}

impl StandardGate {
    pub const ALL: [StandardGate; 21] = [
        StandardGate::Identity,
        StandardGate::Hadamard,
        StandardGate::PauliX,
        StandardGate::PauliY,
        StandardGate::PauliZ,
        StandardGate::PhaseS,
        StandardGate::PhaseSDagger,
        StandardGate::PhaseT,
        StandardGate::PhaseTDagger,
        StandardGate::RotationX,
        StandardGate::RotationY,
        StandardGate::RotationZ,
        StandardGate::UnitaryU1,
        StandardGate::UnitaryU2,
        StandardGate::UnitaryU3,
        StandardGate::ControlledNot,
        StandardGate::ControlledY,
        StandardGate::ControlledZ,
        StandardGate::ControlledHadamard,
        StandardGate::Swap,
        StandardGate::Toffoli,
    ];

    /// OpenQASM 2 mnemonic.
    pub fn gate_name(&self) -> &'static str {
        match self {
            StandardGate::Identity => "id",
            StandardGate::Hadamard => "h",
            StandardGate::PauliX => "x",
            StandardGate::PauliY => "y",
            StandardGate::PauliZ => "z",
            StandardGate::PhaseS => "s",
            StandardGate::PhaseSDagger => "sdg",
            StandardGate::PhaseT => "t",
            StandardGate::PhaseTDagger => "tdg",
            StandardGate::RotationX => "rx",
            StandardGate::RotationY => "ry",
            StandardGate::RotationZ => "rz",
            StandardGate::UnitaryU1 => "u1",
            StandardGate::UnitaryU2 => "u2",
            StandardGate::UnitaryU3 => "u3",
            StandardGate::ControlledNot => "cx",
            StandardGate::ControlledY => "cy",
            StandardGate::ControlledZ => "cz",
            StandardGate::ControlledHadamard => "ch",
            StandardGate::Swap => "swap",
            StandardGate::Toffoli => "ccx",
        }
    }

    pub fn number_of_target_qubits(&self) -> usize {
        match self {
            StandardGate::ControlledNot
            | StandardGate::ControlledY
            | StandardGate::ControlledZ
            | StandardGate::ControlledHadamard
            | StandardGate::Swap => 2,
            StandardGate::Toffoli => 3,
            _ => 1,
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            StandardGate::RotationX
            | StandardGate::RotationY
            | StandardGate::RotationZ
            | StandardGate::UnitaryU1 => 1,
            StandardGate::UnitaryU2 => 2,
            StandardGate::UnitaryU3 => 3,
            _ => 0,
        }
    }

    pub fn gate_matrix(&self, parameters: &[f64]) -> Result<OperatorMatrix, CircuitError> {
        if parameters.len() != self.parameter_count() {
            return Err(CircuitError::ParameterCountMismatch {
                gate: self.gate_name().to_string(),
                expected: self.parameter_count(),
                actual: parameters.len(),
            });
        }
        if parameters.iter().any(|p| !p.is_finite()) {
            return Err(CircuitError::NonFiniteParameter(self.gate_name().to_string()));
        }

        let matrix = match self {
            StandardGate::Identity => Array2::eye(2),
            StandardGate::Hadamard => hadamard_matrix(),
            StandardGate::PauliX => pauli_x_matrix(),
            StandardGate::PauliY => pauli_y_matrix(),
            StandardGate::PauliZ => pauli_z_matrix(),
            StandardGate::PhaseS => phase_matrix(FRAC_PI_2),
            StandardGate::PhaseSDagger => phase_matrix(-FRAC_PI_2),
            StandardGate::PhaseT => phase_matrix(FRAC_PI_4),
            StandardGate::PhaseTDagger => phase_matrix(-FRAC_PI_4),
            StandardGate::RotationX => rotation_x_matrix(parameters[0]),
            StandardGate::RotationY => rotation_y_matrix(parameters[0]),
            StandardGate::RotationZ => rotation_z_matrix(parameters[0]),
            StandardGate::UnitaryU1 => phase_matrix(parameters[0]),
            StandardGate::UnitaryU2 => u3_matrix(FRAC_PI_2, parameters[0], parameters[1]),
            StandardGate::UnitaryU3 => u3_matrix(parameters[0], parameters[1], parameters[2]),
            StandardGate::ControlledNot => controlled_operator(&pauli_x_matrix(), 1),
            StandardGate::ControlledY => controlled_operator(&pauli_y_matrix(), 1),
            StandardGate::ControlledZ => controlled_operator(&pauli_z_matrix(), 1),
            StandardGate::ControlledHadamard => controlled_operator(&hadamard_matrix(), 1),
            StandardGate::Swap => swap_matrix(),
            StandardGate::Toffoli => controlled_operator(&pauli_x_matrix(), 2),
        };
        Ok(matrix)
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gate_name())
    }
}

impl FromStr for StandardGate {
    type Err = CircuitError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let lowered = name.trim().to_ascii_lowercase();
        let alias = match lowered.as_str() {
            "i" => "id",
            "cnot" => "cx",
            "toffoli" => "ccx",
            "p" | "phase" => "u1",
            other => other,
        };
        StandardGate::ALL
            .iter()
            .copied()
            .find(|gate| gate.gate_name() == alias)
            .ok_or_else(|| CircuitError::UnknownGate(name.to_string()))
    }
}

// =============================================================================
// 3. Matrix constructors
// =============================================================================

pub fn hadamard_matrix() -> OperatorMatrix {
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    array![[h, h], [h, -h]]
}

pub fn pauli_x_matrix() -> OperatorMatrix {
    array![[ZERO, ONE], [ONE, ZERO]]
}

pub fn pauli_y_matrix() -> OperatorMatrix {
    array![
        [ZERO, Complex64::new(0.0, -1.0)],
        [Complex64::new(0.0, 1.0), ZERO]
    ]
}

pub fn pauli_z_matrix() -> OperatorMatrix {
    array![[ONE, ZERO], [ZERO, -ONE]]
}

/// diag(1, e^{i lambda}).
pub fn phase_matrix(lambda: f64) -> OperatorMatrix {
    array![[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, lambda)]]
}

pub fn rotation_x_matrix(theta: f64) -> OperatorMatrix {
    let cos = Complex64::new((theta / 2.0).cos(), 0.0);
    let minus_i_sin = Complex64::new(0.0, -(theta / 2.0).sin());
    array![[cos, minus_i_sin], [minus_i_sin, cos]]
}

pub fn rotation_y_matrix(theta: f64) -> OperatorMatrix {
    let cos = Complex64::new((theta / 2.0).cos(), 0.0);
    let sin = Complex64::new((theta / 2.0).sin(), 0.0);
    array![[cos, -sin], [sin, cos]]
}

pub fn rotation_z_matrix(theta: f64) -> OperatorMatrix {
    array![
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)]
    ]
}

pub fn u3_matrix(theta: f64, phi: f64, lambda: f64) -> OperatorMatrix {
    let cos = (theta / 2.0).cos();
    let sin = (theta / 2.0).sin();
    array![
        [Complex64::new(cos, 0.0), -Complex64::from_polar(sin, lambda)],
        [
            Complex64::from_polar(sin, phi),
            Complex64::from_polar(cos, phi + lambda)
        ]
    ]
}

/// Exchanges local bits 0 and 1.
pub fn swap_matrix() -> OperatorMatrix {
    let mut matrix = Array2::zeros((4, 4));
    matrix[[0, 0]] = ONE;
    matrix[[1, 2]] = ONE;
    matrix[[2, 1]] = ONE;
    matrix[[3, 3]] = ONE;
    matrix
}

/// Lifts `base` to a gate controlled by the lowest `number_of_controls` local
/// bits; `base` acts on the local bits above them.
pub fn controlled_operator(base: &OperatorMatrix, number_of_controls: usize) -> OperatorMatrix {
    let base_dimension = base.nrows();
    let dimension = base_dimension << number_of_controls;
    let control_mask = (1usize << number_of_controls) - 1;

    let mut matrix = Array2::zeros((dimension, dimension));
    for column in 0..dimension {
        if column & control_mask != control_mask {
            matrix[[column, column]] = ONE;
            continue;
        }
        let base_column = column >> number_of_controls;
        for base_row in 0..base_dimension {
            let row = (base_row << number_of_controls) | control_mask;
            matrix[[row, column]] = base[[base_row, base_column]];
        }
    }
    matrix
}

// =============================================================================
// 4. Unitarity check
// =============================================================================

/// Checks that `matrix` is square with power-of-two side `2^k` matching
/// `number_of_targets`.
pub fn check_operator_dimension(
    matrix: &OperatorMatrix,
    number_of_targets: usize,
) -> Result<(), CircuitError> {
    let expected = 1usize << number_of_targets;
    let (rows, columns) = matrix.dim();
    if rows != expected || columns != expected {
        return Err(CircuitError::MatrixDimensionMismatch {
            rows,
            columns,
            expected,
        });
    }
    Ok(())
}

pub fn is_unitary_matrix(matrix: &OperatorMatrix, tolerance: f64) -> bool {
    let (rows, columns) = matrix.dim();
    if rows != columns {
        return false;
    }
    let adjoint = matrix.t().mapv(|c| c.conj());
    let product = adjoint.dot(matrix);
    product.indexed_iter().all(|((i, j), value)| {
        let expected = if i == j { ONE } else { ZERO };
        (*value - expected).norm() <= tolerance
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_equal(a: &OperatorMatrix, b: &OperatorMatrix) -> bool {
        a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() < 1e-12)
    }

    #[test]
    fn test_every_standard_gate_is_unitary() {
        for gate in StandardGate::ALL {
            let parameters = vec![0.37; gate.parameter_count()];
            let matrix = gate.gate_matrix(&parameters).unwrap();
            assert_eq!(matrix.nrows(), 1 << gate.number_of_target_qubits());
            assert!(is_unitary_matrix(&matrix, 1e-12), "{gate} not unitary");
        }
    }

    #[test]
    fn test_controlled_not_local_convention() {
        // control = local bit 0, target = local bit 1: |01> (index 1) -> |11> (index 3)
        let cx = StandardGate::ControlledNot.gate_matrix(&[]).unwrap();
        assert_eq!(cx[[3, 1]], ONE);
        assert_eq!(cx[[1, 3]], ONE);
        assert_eq!(cx[[0, 0]], ONE);
        assert_eq!(cx[[2, 2]], ONE);
    }

    #[test]
    fn test_toffoli_flips_only_when_both_controls_set() {
        let ccx = StandardGate::Toffoli.gate_matrix(&[]).unwrap();
        assert_eq!(ccx[[7, 3]], ONE);
        assert_eq!(ccx[[3, 7]], ONE);
        for index in [0, 1, 2, 4, 5, 6] {
            assert_eq!(ccx[[index, index]], ONE);
        }
    }

    #[test]
    fn test_u3_special_cases() {
        let u2 = StandardGate::UnitaryU2.gate_matrix(&[0.0, std::f64::consts::PI]).unwrap();
        assert!(approx_equal(&u2, &hadamard_matrix()));

        let u3 = StandardGate::UnitaryU3
            .gate_matrix(&[std::f64::consts::PI, 0.0, std::f64::consts::PI])
            .unwrap();
        assert!(approx_equal(&u3, &pauli_x_matrix()));
    }

    #[test]
    fn test_parameter_validation() {
        assert!(matches!(
            StandardGate::RotationX.gate_matrix(&[]),
            Err(CircuitError::ParameterCountMismatch { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            StandardGate::RotationY.gate_matrix(&[f64::NAN]),
            Err(CircuitError::NonFiniteParameter(_))
        ));
    }

    #[test]
    fn test_gate_name_parsing() {
        assert_eq!("H".parse::<StandardGate>(), Ok(StandardGate::Hadamard));
        assert_eq!("cnot".parse::<StandardGate>(), Ok(StandardGate::ControlledNot));
        assert_eq!("ccx".parse::<StandardGate>(), Ok(StandardGate::Toffoli));
        assert!("foo".parse::<StandardGate>().is_err());
    }

    #[test]
    fn test_non_unitary_matrix_detected() {
        let projector = array![[ONE, ZERO], [ZERO, ZERO]];
        assert!(!is_unitary_matrix(&projector, 1e-9));
        assert!(check_operator_dimension(&projector, 2).is_err());
        assert!(check_operator_dimension(&projector, 1).is_ok());
    }
}
