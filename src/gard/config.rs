//! Soup configuration: population size, type count, and the distributions
//! the preference matrices are drawn from.

use serde::{Deserialize, Serialize};

use crate::error::{GardError, Result};

/// Default bound on split re-draws.
pub const DEFAULT_MAX_SPLIT_ATTEMPTS: u32 = 1000;

/// How a micelle decides whether a split draw is acceptable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Re-draw the whole partition until the first daughter holds at least
    /// one unit, giving up after `max_attempts` draws.
    Retry { max_attempts: u32 },
    /// Accept the first draw, even when it leaves a daughter empty.
    SingleDraw,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        SplitPolicy::Retry {
            max_attempts: DEFAULT_MAX_SPLIT_ATTEMPTS,
        }
    }
}

/// Configuration for a GARD soup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoupConfig {
    /// N: size of the seed micelle. Micelles split once they reach 2N units.
    pub seed_size: usize,
    /// G: number of distinct amphiphile types.
    pub types: usize,
    /// Mean of the normal distribution for the affinity matrix K.
    #[serde(default = "default_k_mu")]
    pub k_mu: f64,
    /// Standard deviation of the normal distribution for K.
    #[serde(default = "default_k_sigma")]
    pub k_sigma: f64,
    /// Mean (log-space) of the log-normal distribution for the enhancement matrix B.
    #[serde(default = "default_b_mu")]
    pub b_mu: f64,
    /// Standard deviation (log-space) of the log-normal distribution for B.
    #[serde(default = "default_b_sigma")]
    pub b_sigma: f64,
    #[serde(default)]
    pub split_policy: SplitPolicy,
}

fn default_k_mu() -> f64 {
    0.0
}

fn default_k_sigma() -> f64 {
    1.0
}

fn default_b_mu() -> f64 {
    3.0
}

fn default_b_sigma() -> f64 {
    1.0
}

impl SoupConfig {
    /// Config with the default distributions: K ~ Normal(0, 1), B ~ LogNormal(3, 1).
    pub fn new(seed_size: usize, types: usize) -> Self {
        Self {
            seed_size,
            types,
            k_mu: default_k_mu(),
            k_sigma: default_k_sigma(),
            b_mu: default_b_mu(),
            b_sigma: default_b_sigma(),
            split_policy: SplitPolicy::default(),
        }
    }

    /// Split threshold: micelles with at least this many units divide.
    #[inline]
    pub fn split_threshold(&self) -> u64 {
        2 * self.seed_size as u64
    }

    /// Reject parameters the soup cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.seed_size == 0 {
            return Err(GardError::InvalidConfig(
                "seed_size (N) must be positive".to_string(),
            ));
        }
        if self.types == 0 {
            return Err(GardError::InvalidConfig(
                "types (G) must be positive".to_string(),
            ));
        }
        check_distribution("k", self.k_mu, self.k_sigma)?;
        check_distribution("b", self.b_mu, self.b_sigma)?;
        if let SplitPolicy::Retry { max_attempts: 0 } = self.split_policy {
            return Err(GardError::InvalidConfig(
                "split retry bound must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_distribution(name: &str, mu: f64, sigma: f64) -> Result<()> {
    if !mu.is_finite() {
        return Err(GardError::InvalidConfig(format!(
            "{}_mu must be finite, got {}",
            name, mu
        )));
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(GardError::InvalidConfig(format!(
            "{}_sigma must be finite and positive, got {}",
            name, sigma
        )));
    }
    Ok(())
}
