// src/correlation.rs
//! Correlation handling shared by both basket pricers.
//!
//! # Cholesky factorization
//!
//! For a correlation matrix C the lower-triangular factor L with L·Lᵀ = C is
//! built row by row:
//! ```text
//! L_jj = √(C_jj - Σ_{k<j} L_jk²)
//! L_ij = (C_ij - Σ_{k<j} L_ik L_jk) / L_jj      (i > j)
//! ```
//! A negative residual under the square root means C is not positive
//! semi-definite and the factorization fails; it is never clamped.
//!
//! # Correlated draws
//!
//! If z is a vector of independent N(0,1) variates then L·z has covariance
//! L·Lᵀ = C, which is how correlated Brownian increments are produced.

use crate::error::{validation::validate_correlation, BasketError, BasketResult};
use crate::rng;
use nalgebra::DMatrix;
use rand::Rng;

/// Tolerance on unit diagonal and symmetry
pub const CORRELATION_TOLERANCE: f64 = 1e-6;

/// Residual below which a pivot is treated as negative rather than rounding
const NEGATIVE_RESIDUAL_TOLERANCE: f64 = 1e-12;

/// Numerator magnitude allowed against a zero pivot
const ZERO_PIVOT_TOLERANCE: f64 = 1e-10;

/// Dense, validated n×n correlation matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    inner: DMatrix<f64>,
}

impl CorrelationMatrix {
    /// Build from row-major nested vectors
    pub fn new(rows: Vec<Vec<f64>>) -> BasketResult<Self> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n) {
            return Err(BasketError::InvalidCorrelation {
                reason: format!("matrix is not square: row {} has {} entries, expected {}", i, row.len(), n),
            });
        }
        let inner = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::from_matrix(inner)
    }

    pub fn from_matrix(inner: DMatrix<f64>) -> BasketResult<Self> {
        let n = inner.nrows();
        if n == 0 {
            return Err(BasketError::InvalidCorrelation {
                reason: "matrix is empty".to_string(),
            });
        }
        if inner.ncols() != n {
            return Err(BasketError::InvalidCorrelation {
                reason: format!("matrix is not square ({}×{})", n, inner.ncols()),
            });
        }

        for i in 0..n {
            if !((inner[(i, i)] - 1.0).abs() <= CORRELATION_TOLERANCE) {
                return Err(BasketError::InvalidCorrelation {
                    reason: format!("diagonal entry [{},{}] = {} must be 1", i, i, inner[(i, i)]),
                });
            }
            for j in (i + 1)..n {
                let (upper, lower) = (inner[(i, j)], inner[(j, i)]);
                if !((upper - lower).abs() <= CORRELATION_TOLERANCE) {
                    return Err(BasketError::InvalidCorrelation {
                        reason: format!("matrix is not symmetric at [{},{}]: {} vs {}", i, j, upper, lower),
                    });
                }
                for (r, c, rho) in [(i, j, upper), (j, i, lower)] {
                    validate_correlation(&format!("rho[{},{}]", r, c), rho).map_err(|_| {
                        BasketError::InvalidCorrelation {
                            reason: format!("entry [{},{}] = {} is outside [-1, 1]", r, c, rho),
                        }
                    })?;
                }
            }
        }

        Ok(Self { inner })
    }

    pub fn identity(n: usize) -> BasketResult<Self> {
        Self::from_matrix(DMatrix::identity(n, n))
    }

    /// Equicorrelated matrix with `rho` off the diagonal
    pub fn uniform(n: usize, rho: f64) -> BasketResult<Self> {
        Self::from_matrix(DMatrix::from_fn(n, n, |i, j| if i == j { 1.0 } else { rho }))
    }

    pub fn dim(&self) -> usize {
        self.inner.nrows()
    }

    /// Bounds-checked entry access
    pub fn get(&self, i: usize, j: usize) -> BasketResult<f64> {
        self.inner
            .get((i, j))
            .copied()
            .ok_or_else(|| BasketError::InvalidConfiguration {
                field: "correlation index".to_string(),
                reason: format!("[{},{}] is outside a {}×{} matrix", i, j, self.dim(), self.dim()),
            })
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.inner
    }

    pub fn cholesky(&self) -> BasketResult<CholeskyFactor> {
        cholesky(&self.inner).map(|lower| CholeskyFactor { lower })
    }
}

/// Lower-triangular factor L of a correlation matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    lower: DMatrix<f64>,
}

impl CholeskyFactor {
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    pub fn lower(&self) -> &DMatrix<f64> {
        &self.lower
    }

    /// L·Lᵀ
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.lower * self.lower.transpose()
    }

    /// Write L·z into `out`
    pub fn correlate(&self, independent: &[f64], out: &mut [f64]) {
        for (i, slot) in out.iter_mut().enumerate().take(self.dim()) {
            let mut sum = 0.0;
            for (j, z) in independent.iter().enumerate().take(i + 1) {
                sum += self.lower[(i, j)] * z;
            }
            *slot = sum;
        }
    }

    pub fn correlated_normals(&self, independent: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.dim()];
        self.correlate(independent, &mut out);
        out
    }

    /// Draw one correlated normal vector; `scratch` receives the independent draws
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, scratch: &mut [f64], out: &mut [f64]) {
        rng::fill_normals(rng, scratch);
        self.correlate(scratch, out);
    }
}

/// Sequential Cholesky factorization of a symmetric positive semi-definite matrix
pub fn cholesky(matrix: &DMatrix<f64>) -> BasketResult<DMatrix<f64>> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(BasketError::InvalidCorrelation {
            reason: format!("matrix is not square ({}×{})", n, matrix.ncols()),
        });
    }

    let mut l = DMatrix::<f64>::zeros(n, n);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }

            if i == j {
                if sum < -NEGATIVE_RESIDUAL_TOLERANCE || sum.is_nan() {
                    return Err(BasketError::CholeskyFailure {
                        row: i,
                        reason: format!(
                            "square root of negative residual {:.3e}; matrix is not positive semi-definite",
                            sum
                        ),
                    });
                }
                l[(i, i)] = sum.max(0.0).sqrt();
            } else if l[(j, j)] > 0.0 {
                l[(i, j)] = sum / l[(j, j)];
            } else if sum.abs() > ZERO_PIVOT_TOLERANCE {
                return Err(BasketError::CholeskyFailure {
                    row: i,
                    reason: format!(
                        "division by ~0 pivot in column {} with residual {:.3e}",
                        j, sum
                    ),
                });
            }
        }
    }

    Ok(l)
}
