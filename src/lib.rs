//! Graded Autocatalysis Replication Domain (GARD) soup simulator.
//!
//! A soup holds a population of micelles, each a count vector over G
//! amphiphile types. Every cycle each micelle takes up the amphiphile type(s)
//! its composition favours most under the affinity matrix K and the
//! enhancement matrix B, then micelles that reached 2N units divide in two.
//!
//! All randomness is drawn from a caller-provided [`rand::Rng`], so a seeded
//! generator reproduces a run exactly.
//!
//! With the `python` feature the crate also builds as a Python extension
//! module exposing the soup to numpy-based analysis code.

pub mod error;
pub mod gard;

#[cfg(feature = "python")]
mod python;

pub use error::{GardError, Result};
pub use gard::{
    favoured_types, CycleSummary, Micelle, Preferences, Soup, SoupConfig, SplitPolicy,
    DEFAULT_MAX_SPLIT_ATTEMPTS,
};
