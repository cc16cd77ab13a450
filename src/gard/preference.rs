//! Catalytic preference model.
//!
//! Two dense G x G matrices decide which amphiphile a micelle takes up next:
//! - K (affinity): intrinsic, composition-independent pairwise affinity
//! - B (enhancement): catalytic boost each micelle amphiphile (column) gives
//!   each soup amphiphile (row)
//!
//! The score of soup amphiphile `r` joining a micelle with composition `n` is
//!
//! ```text
//! score[r] = Σ_c ( n[c] · B[r, c] + K[r, c] )
//! ```
//!
//! and every type reaching the maximum score is incorporated.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut2, Zip};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};

use crate::error::{GardError, Result};

/// Affinity and enhancement matrices of a soup.
#[derive(Clone, Debug, PartialEq)]
pub struct Preferences {
    affinity: Array2<f64>,
    enhancement: Array2<f64>,
}

impl Preferences {
    /// Sample K ~ Normal(k_mu, k_sigma) and B ~ LogNormal(b_mu, b_sigma),
    /// element-wise over a `types x types` grid.
    pub fn sample<R: Rng + ?Sized>(
        types: usize,
        k_mu: f64,
        k_sigma: f64,
        b_mu: f64,
        b_sigma: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let normal = Normal::new(k_mu, k_sigma).map_err(|e| {
            GardError::InvalidConfig(format!("affinity distribution: {}", e))
        })?;
        let log_normal = LogNormal::new(b_mu, b_sigma).map_err(|e| {
            GardError::InvalidConfig(format!("enhancement distribution: {}", e))
        })?;

        let affinity =
            Array2::from_shape_simple_fn((types, types), || normal.sample(&mut *rng));
        let enhancement =
            Array2::from_shape_simple_fn((types, types), || log_normal.sample(&mut *rng));

        Ok(Self {
            affinity,
            enhancement,
        })
    }

    /// Wrap caller-supplied matrices. Both must be square and of equal shape.
    pub fn from_matrices(affinity: Array2<f64>, enhancement: Array2<f64>) -> Result<Self> {
        let types = affinity.nrows();
        check_shape(types, &affinity)?;
        check_shape(types, &enhancement)?;
        Ok(Self {
            affinity,
            enhancement,
        })
    }

    /// Number of amphiphile types the matrices cover.
    #[inline]
    pub fn types(&self) -> usize {
        self.affinity.nrows()
    }

    #[inline]
    pub fn affinity(&self) -> &Array2<f64> {
        &self.affinity
    }

    #[inline]
    pub fn enhancement(&self) -> &Array2<f64> {
        &self.enhancement
    }

    #[inline]
    pub fn affinity_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.affinity.view_mut()
    }

    #[inline]
    pub fn enhancement_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.enhancement.view_mut()
    }

    /// Replace K. The new matrix must keep the current shape.
    pub fn set_affinity(&mut self, affinity: Array2<f64>) -> Result<()> {
        check_shape(self.types(), &affinity)?;
        self.affinity = affinity;
        Ok(())
    }

    /// Replace B. The new matrix must keep the current shape.
    pub fn set_enhancement(&mut self, enhancement: Array2<f64>) -> Result<()> {
        check_shape(self.types(), &enhancement)?;
        self.enhancement = enhancement;
        Ok(())
    }

    /// Preference score of every soup amphiphile for a micelle of the given composition.
    pub fn scores(&self, composition: ArrayView1<'_, u64>) -> Result<Array1<f64>> {
        if composition.len() != self.types() {
            return Err(GardError::CompositionLength {
                expected: self.types(),
                found: composition.len(),
            });
        }
        let scores = self
            .enhancement
            .outer_iter()
            .zip(self.affinity.outer_iter())
            .map(|(b_row, k_row)| {
                Zip::from(&b_row)
                    .and(&k_row)
                    .and(&composition)
                    .fold(0.0, |acc, &b, &k, &n| acc + (n as f64 * b + k))
            })
            .collect();
        Ok(scores)
    }

    /// Types a micelle of the given composition incorporates this cycle.
    pub fn favoured_types(&self, composition: ArrayView1<'_, u64>) -> Result<Vec<usize>> {
        Ok(favoured_types(self.scores(composition)?.view()))
    }
}

/// Indices of every score equal to the maximum, in ascending order.
///
/// Ties are compared exactly. NaN never wins, so an all-NaN vector yields
/// no favoured types.
pub fn favoured_types(scores: ArrayView1<'_, f64>) -> Vec<usize> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score == max)
        .map(|(i, _)| i)
        .collect()
}

fn check_shape(types: usize, matrix: &Array2<f64>) -> Result<()> {
    if matrix.dim() != (types, types) {
        return Err(GardError::ShapeMismatch {
            expected: (types, types),
            found: matrix.dim(),
        });
    }
    Ok(())
}
