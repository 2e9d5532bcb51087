// =============================================================================
// MACROHARD Quantum Visualizer - Single-Qubit Observables
// =============================================================================
// Table of Contents:
//   1. Numerical cleanup helpers
//   2. ReducedDensityMatrix - 2x2 single-qubit state
//   3. BlochVector
//   4. QubitStateReport - Per-qubit wire record
// =============================================================================
// Purpose: Bloch vector and purity of a reduced single-qubit state, plus the
//          cleanup applied at every reporting boundary: Hermitization, trace
//          renormalization and flushing of sub-1e-12 noise to exact zero.
// =============================================================================

use crate::error::ReductionError;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// =============================================================================
// 1. Numerical cleanup helpers
// =============================================================================

pub const CLIP_THRESHOLD: f64 = 1e-12;
pub const TRACE_THRESHOLD: f64 = 1e-15;

pub fn clip_tiny_value(value: f64) -> f64 {
    if value.abs() < CLIP_THRESHOLD {
        0.0
    } else {
        value
    }
}

pub fn clip_tiny_complex(value: Complex64) -> Complex64 {
    Complex64::new(clip_tiny_value(value.re), clip_tiny_value(value.im))
}

// =============================================================================
// 2. ReducedDensityMatrix - 2x2 single-qubit state
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedDensityMatrix {
    elements: [[Complex64; 2]; 2],
}

impl ReducedDensityMatrix {
    pub fn new(elements: [[Complex64; 2]; 2]) -> Self {
        Self { elements }
    }

    pub fn from_array(matrix: &Array2<Complex64>) -> Result<Self, ReductionError> {
        if matrix.dim() != (2, 2) {
            return Err(ReductionError::Shape(format!(
                "expected 2x2 reduced state, got {:?}",
                matrix.dim()
            )));
        }
        Ok(Self::new([
            [matrix[[0, 0]], matrix[[0, 1]]],
            [matrix[[1, 0]], matrix[[1, 1]]],
        ]))
    }

    pub fn zeros() -> Self {
        Self::new([[Complex64::new(0.0, 0.0); 2]; 2])
    }

    /// |0><0|.
    pub fn ground_state() -> Self {
        let mut state = Self::zeros();
        state.elements[0][0] = Complex64::new(1.0, 0.0);
        state
    }

    /// I/2, the explicit fallback for a qubit whose reduction failed.
    pub fn maximally_mixed() -> Self {
        let mut state = Self::zeros();
        state.elements[0][0] = Complex64::new(0.5, 0.0);
        state.elements[1][1] = Complex64::new(0.5, 0.0);
        state
    }

    pub fn elements(&self) -> &[[Complex64; 2]; 2] {
        &self.elements
    }

    pub fn element(&self, row: usize, column: usize) -> Complex64 {
        self.elements[row][column]
    }

    pub fn trace(&self) -> Complex64 {
        self.elements[0][0] + self.elements[1][1]
    }

    pub fn is_finite(&self) -> bool {
        self.elements
            .iter()
            .flatten()
            .all(|entry| entry.re.is_finite() && entry.im.is_finite())
    }

    /// (rho + rho^dagger) / 2.
    pub fn hermitize(&self) -> Self {
        let mut result = Self::zeros();
        for row in 0..2 {
            for column in 0..2 {
                result.elements[row][column] =
                    (self.elements[row][column] + self.elements[column][row].conj()) * 0.5;
            }
        }
        result
    }

    /// Divides by the trace when it is not vanishing, otherwise returns the
    /// input unchanged.
    pub fn normalize_trace(&self) -> Self {
        let trace = self.trace();
        if trace.norm() <= TRACE_THRESHOLD {
            return *self;
        }
        self.map(|entry| entry / trace)
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut result = *self;
        for row in 0..2 {
            for column in 0..2 {
                result.elements[row][column] += other.elements[row][column];
            }
        }
        result
    }

    pub fn scale(&self, factor: f64) -> Self {
        self.map(|entry| entry * factor)
    }

    pub fn clip_tiny_values(&self) -> Self {
        self.map(clip_tiny_complex)
    }

    /// Boundary cleanup: Hermitize, renormalize, flush noise. Fails on
    /// non-finite input or a degenerate trace.
    pub fn sanitize(&self) -> Result<Self, ReductionError> {
        if !self.is_finite() {
            return Err(ReductionError::NonFinite);
        }
        let hermitian = self.hermitize();
        let trace = hermitian.trace().norm();
        if trace <= TRACE_THRESHOLD {
            return Err(ReductionError::DegenerateTrace(trace));
        }
        Ok(hermitian.normalize_trace().clip_tiny_values())
    }

    /// Re Tr(rho^2) clipped to [0, 1].
    pub fn purity(&self) -> f64 {
        let mut trace_of_square = Complex64::new(0.0, 0.0);
        for row in 0..2 {
            for inner in 0..2 {
                trace_of_square += self.elements[row][inner] * self.elements[inner][row];
            }
        }
        clip_tiny_value(trace_of_square.re.clamp(0.0, 1.0))
    }

    pub fn bloch_vector(&self) -> BlochVector {
        let coherence = self.elements[0][1];
        BlochVector::new(
            2.0 * coherence.re,
            -2.0 * coherence.im,
            (self.elements[0][0] - self.elements[1][1]).re,
        )
        .clip_tiny_values()
    }

    pub fn frobenius_distance(&self, other: &Self) -> f64 {
        self.elements
            .iter()
            .flatten()
            .zip(other.elements.iter().flatten())
            .map(|(a, b)| (a - b).norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    pub fn hermiticity_error(&self) -> f64 {
        let mut worst: f64 = 0.0;
        for row in 0..2 {
            for column in 0..2 {
                let difference = self.elements[row][column] - self.elements[column][row].conj();
                worst = worst.max(difference.norm());
            }
        }
        worst
    }

    /// Eigenvalues of the Hermitian part, ascending.
    pub fn eigenvalues(&self) -> [f64; 2] {
        let hermitian = self.hermitize();
        let a = hermitian.elements[0][0].re;
        let d = hermitian.elements[1][1].re;
        let b = hermitian.elements[0][1];
        let half_trace = (a + d) / 2.0;
        let radius = (((a - d) / 2.0).powi(2) + b.norm_sqr()).sqrt();
        [half_trace - radius, half_trace + radius]
    }

    /// Unit trace, Hermitian and positive semidefinite within `tolerance`.
    pub fn is_physical(&self, tolerance: f64) -> bool {
        self.is_finite()
            && (self.trace() - Complex64::new(1.0, 0.0)).norm() <= tolerance
            && self.hermiticity_error() <= tolerance
            && self.eigenvalues()[0] >= -tolerance
    }

    pub fn to_array(&self) -> Array2<Complex64> {
        Array2::from_shape_fn((2, 2), |(row, column)| self.elements[row][column])
    }

    fn map(&self, operation: impl Fn(Complex64) -> Complex64) -> Self {
        let mut result = *self;
        for entry in result.elements.iter_mut().flatten() {
            *entry = operation(*entry);
        }
        result
    }
}

impl Default for ReducedDensityMatrix {
    fn default() -> Self {
        Self::ground_state()
    }
}

fn format_complex(value: Complex64) -> String {
    let value = clip_tiny_complex(value);
    if value.im == 0.0 {
        format!("{:.4}", value.re)
    } else if value.re == 0.0 {
        format!("{:.4}i", value.im)
    } else if value.im < 0.0 {
        format!("{:.4}-{:.4}i", value.re, -value.im)
    } else {
        format!("{:.4}+{:.4}i", value.re, value.im)
    }
}

impl fmt::Display for ReducedDensityMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.elements.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}, {}]", format_complex(row[0]), format_complex(row[1]))?;
        }
        Ok(())
    }
}

type WireMatrix = [[[f64; 2]; 2]; 2];

impl Serialize for ReducedDensityMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire: WireMatrix = [[[0.0; 2]; 2]; 2];
        for row in 0..2 {
            for column in 0..2 {
                let entry = self.elements[row][column];
                wire[row][column] = [entry.re, entry.im];
            }
        }
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReducedDensityMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireMatrix::deserialize(deserializer)?;
        let mut matrix = Self::zeros();
        for row in 0..2 {
            for column in 0..2 {
                let [re, im] = wire[row][column];
                matrix.elements[row][column] = Complex64::new(re, im);
            }
        }
        Ok(matrix)
    }
}

// =============================================================================
// 3. BlochVector
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct BlochVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BlochVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn clip_tiny_values(&self) -> Self {
        Self::new(
            clip_tiny_value(self.x),
            clip_tiny_value(self.y),
            clip_tiny_value(self.z),
        )
    }

    pub fn distance(&self, other: &Self) -> f64 {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z).magnitude()
    }
}

impl From<[f64; 3]> for BlochVector {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<BlochVector> for [f64; 3] {
    fn from(vector: BlochVector) -> Self {
        vector.components()
    }
}

// =============================================================================
// 4. QubitStateReport - Per-qubit wire record
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QubitStateReport {
    pub bloch: BlochVector,
    pub purity: f64,
    pub rho: ReducedDensityMatrix,
}

impl QubitStateReport {
    /// Derives Bloch vector and purity from an already sanitized state.
    pub fn from_density_matrix(rho: ReducedDensityMatrix) -> Self {
        Self {
            bloch: rho.bloch_vector(),
            purity: rho.purity(),
            rho,
        }
    }

    pub fn maximally_mixed() -> Self {
        Self::from_density_matrix(ReducedDensityMatrix::maximally_mixed())
    }
}
