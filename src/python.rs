//! Python bindings.
//!
//! Exposes a `Soup` class with the same surface as the pure-Python pygard
//! prototype (`Soup(N, Ng, K_mu=0, K_sigma=1, B_mu=3, B_sigma=1)`, `N`, `Ng`,
//! `K`, `B`, `contents[i].composition`, `grow_micelles`, `split_micelles`,
//! `run_cycle`, `get_composition`) so existing notebooks keep working while
//! the dynamics run in Rust. Micelles in `contents` are read-only snapshots.

use ndarray::Array1;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::GardError;
use crate::gard::{Soup, SoupConfig};

impl From<GardError> for PyErr {
    fn from(err: GardError) -> Self {
        match err {
            GardError::TypeIndexOutOfRange { .. } => PyIndexError::new_err(err.to_string()),
            GardError::InvalidConfig(_)
            | GardError::ShapeMismatch { .. }
            | GardError::CompositionLength { .. } => PyValueError::new_err(err.to_string()),
            GardError::EmptyMicelle | GardError::SplitAttemptsExhausted { .. } => {
                PyRuntimeError::new_err(err.to_string())
            }
        }
    }
}

/// Snapshot of one micelle, as handed out by `Soup.contents`.
#[pyclass(name = "Micelle")]
pub struct PyMicelle {
    composition: Array1<u64>,
}

#[pymethods]
impl PyMicelle {
    #[getter]
    fn composition<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.composition.to_pyarray(py)
    }

    fn total(&self) -> u64 {
        self.composition.sum()
    }
}

/// A GARD soup driven from Python.
///
/// The soup owns its generator: pass `seed` for a reproducible run,
/// otherwise it is seeded from OS entropy.
#[pyclass(name = "Soup")]
pub struct PySoup {
    inner: Soup,
    rng: StdRng,
}

#[pymethods]
impl PySoup {
    #[new]
    #[pyo3(signature = (N, Ng, K_mu=0.0, K_sigma=1.0, B_mu=3.0, B_sigma=1.0, seed=None))]
    #[allow(non_snake_case)]
    fn new(
        N: usize,
        Ng: usize,
        K_mu: f64,
        K_sigma: f64,
        B_mu: f64,
        B_sigma: f64,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut config = SoupConfig::new(N, Ng);
        config.k_mu = K_mu;
        config.k_sigma = K_sigma;
        config.b_mu = B_mu;
        config.b_sigma = B_sigma;

        let inner = Soup::new(config, &mut rng)?;
        Ok(Self { inner, rng })
    }

    #[getter(N)]
    fn seed_size(&self) -> usize {
        self.inner.seed_size()
    }

    #[getter(Ng)]
    fn types(&self) -> usize {
        self.inner.types()
    }

    #[getter(K)]
    fn affinity<'py>(&self, py: Python<'py>) -> &'py PyArray2<f64> {
        self.inner.affinity().to_pyarray(py)
    }

    #[setter(K)]
    fn set_affinity(&mut self, affinity: PyReadonlyArray2<f64>) -> PyResult<()> {
        self.inner.set_affinity(affinity.as_array().to_owned())?;
        Ok(())
    }

    #[getter(B)]
    fn enhancement<'py>(&self, py: Python<'py>) -> &'py PyArray2<f64> {
        self.inner.enhancement().to_pyarray(py)
    }

    #[setter(B)]
    fn set_enhancement(&mut self, enhancement: PyReadonlyArray2<f64>) -> PyResult<()> {
        self.inner.set_enhancement(enhancement.as_array().to_owned())?;
        Ok(())
    }

    /// Read-only list of micelles, one `Micelle` view per entry.
    #[getter]
    fn contents(&self) -> Vec<PyMicelle> {
        self.inner
            .micelles()
            .iter()
            .map(|micelle| PyMicelle {
                composition: micelle.composition().to_owned(),
            })
            .collect()
    }

    /// Composition of one micelle as a 1-D array.
    fn composition<'py>(&self, py: Python<'py>, index: usize) -> PyResult<&'py PyArray1<u64>> {
        let micelle = self.inner.micelles().get(index).ok_or_else(|| {
            PyIndexError::new_err(format!(
                "micelle {} out of range for {} micelles",
                index,
                self.inner.micelles().len()
            ))
        })?;
        Ok(micelle.composition().to_pyarray(py))
    }

    /// Add one amphiphile of type `amphiphile` to micelle `index`.
    fn add_amphiphile(&mut self, index: usize, amphiphile: usize) -> PyResult<()> {
        let count = self.inner.micelles().len();
        let micelle = self.inner.micelles_mut().get_mut(index).ok_or_else(|| {
            PyIndexError::new_err(format!(
                "micelle {} out of range for {} micelles",
                index, count
            ))
        })?;
        micelle.add_unit(amphiphile)?;
        Ok(())
    }

    /// Growth phase only. Returns the number of amphiphiles added.
    fn grow_micelles(&mut self) -> PyResult<u64> {
        Ok(self.inner.grow()?)
    }

    /// Split phase only. Returns the number of micelles that divided.
    fn split_micelles(&mut self) -> PyResult<usize> {
        Ok(self.inner.split_all(&mut self.rng)?)
    }

    /// Grow then split. Returns a dict summarising the cycle.
    fn run_cycle<'py>(&mut self, py: Python<'py>) -> PyResult<&'py PyDict> {
        let summary = self.inner.run_cycle(&mut self.rng)?;

        let dict = PyDict::new(py);
        dict.set_item("cycle", summary.cycle)?;
        dict.set_item("micelles_grown", summary.micelles_grown)?;
        dict.set_item("units_added", summary.units_added)?;
        dict.set_item("splits", summary.splits)?;
        dict.set_item("micelles", summary.micelles)?;
        Ok(dict)
    }

    /// (n_micelles, Ng) array of every micelle's composition.
    fn get_composition<'py>(&self, py: Python<'py>) -> &'py PyArray2<u64> {
        self.inner.all_compositions().into_pyarray(py)
    }

    fn total_units(&self) -> u64 {
        self.inner.total_units()
    }

    fn __len__(&self) -> usize {
        self.inner.micelles().len()
    }
}

/// Python module definition
#[pymodule]
fn gard(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PySoup>()?;
    m.add_class::<PyMicelle>()?;
    Ok(())
}
