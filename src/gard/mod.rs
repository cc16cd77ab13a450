//! GARD soup dynamics.
//!
//! This module provides:
//! - Micelle: composition vector, unit uptake, random division
//! - Preferences: affinity (K) and enhancement (B) matrices and the scoring rule
//! - Soup: the micelle population and its grow-then-split cycle
//! - SoupConfig: population size, type count, matrix distributions, split policy

pub mod config;
pub mod micelle;
pub mod preference;
pub mod soup;

pub use config::{SoupConfig, SplitPolicy, DEFAULT_MAX_SPLIT_ATTEMPTS};
pub use micelle::Micelle;
pub use preference::{favoured_types, Preferences};
pub use soup::{CycleSummary, Soup};
