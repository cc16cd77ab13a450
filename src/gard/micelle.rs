//! Micelle representation.
//!
//! A micelle is a count vector over amphiphile types. It grows one unit at a
//! time and divides into two daughters whose compositions sum to its own.

use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use rand::Rng;
use tracing::warn;

use super::config::SplitPolicy;
use crate::error::{GardError, Result};

/// A single self-assembled aggregate in the soup.
///
/// Element `i` of the composition is the number of type-`i` amphiphiles in
/// the micelle. The vector length (G) never changes after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Micelle {
    /// Per-type amphiphile counts.
    composition: Array1<u64>,
    /// N of the soup this micelle belongs to, handed down to daughters.
    seed_size: usize,
}

impl Micelle {
    /// Create a micelle of `seed_size` units, each of a uniformly random type.
    ///
    /// Duplicate draws land on the same entry, so the units spread over at
    /// most `seed_size` distinct types.
    pub fn new<R: Rng + ?Sized>(seed_size: usize, types: usize, rng: &mut R) -> Result<Self> {
        if types == 0 {
            return Err(GardError::InvalidConfig(
                "a micelle needs at least one amphiphile type".to_string(),
            ));
        }

        let mut composition = Array1::<u64>::zeros(types);
        for _ in 0..seed_size {
            composition[rng.gen_range(0..types)] += 1;
        }

        Ok(Self {
            composition,
            seed_size,
        })
    }

    /// Create a micelle from an explicit composition vector.
    pub fn from_composition(seed_size: usize, composition: Array1<u64>) -> Result<Self> {
        if composition.is_empty() {
            return Err(GardError::InvalidConfig(
                "a micelle needs at least one amphiphile type".to_string(),
            ));
        }
        Ok(Self {
            composition,
            seed_size,
        })
    }

    #[inline]
    pub fn composition(&self) -> ArrayView1<'_, u64> {
        self.composition.view()
    }

    /// Mutable view of the counts. Entries can be rewritten, the length cannot.
    #[inline]
    pub fn composition_mut(&mut self) -> ArrayViewMut1<'_, u64> {
        self.composition.view_mut()
    }

    /// Number of amphiphile types (G).
    #[inline]
    pub fn types(&self) -> usize {
        self.composition.len()
    }

    #[inline]
    pub fn seed_size(&self) -> usize {
        self.seed_size
    }

    /// Total number of units in the micelle.
    pub fn total(&self) -> u64 {
        self.composition.sum()
    }

    /// Incorporate one amphiphile of type `index`.
    pub fn add_unit(&mut self, index: usize) -> Result<()> {
        let types = self.types();
        let count = self
            .composition
            .get_mut(index)
            .ok_or(GardError::TypeIndexOutOfRange { index, types })?;
        *count += 1;
        Ok(())
    }

    /// Split with the default policy: retry until the first daughter is non-empty.
    pub fn split<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Micelle, Micelle)> {
        self.split_with(SplitPolicy::default(), rng)
    }

    /// Split into two daughters under an explicit policy.
    ///
    /// For every type with `v > 0` units, the first daughter receives a
    /// uniform draw from `0..=v` and the second daughter the rest. Types
    /// with no units stay empty in both. The parent is left untouched.
    pub fn split_with<R: Rng + ?Sized>(
        &self,
        policy: SplitPolicy,
        rng: &mut R,
    ) -> Result<(Micelle, Micelle)> {
        if self.total() == 0 {
            return Err(GardError::EmptyMicelle);
        }

        let first = match policy {
            SplitPolicy::SingleDraw => {
                let first = self.draw_partition(rng);
                if first.sum() == 0 || first == self.composition {
                    warn!(total = self.total(), "single-draw split left a daughter empty");
                }
                first
            }
            SplitPolicy::Retry { max_attempts } => {
                let mut accepted = None;
                for _ in 0..max_attempts {
                    let candidate = self.draw_partition(rng);
                    if candidate.sum() > 0 {
                        accepted = Some(candidate);
                        break;
                    }
                }
                accepted.ok_or(GardError::SplitAttemptsExhausted {
                    attempts: max_attempts,
                })?
            }
        };

        let second = &self.composition - &first;

        Ok((
            Micelle::from_composition(self.seed_size, first)?,
            Micelle::from_composition(self.seed_size, second)?,
        ))
    }

    /// One draw of the first daughter's share of every type.
    fn draw_partition<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<u64> {
        self.composition
            .map(|&count| if count == 0 { 0 } else { rng.gen_range(0..=count) })
    }
}
