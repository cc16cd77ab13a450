//! The soup: global preference matrices plus the population of micelles,
//! advanced one grow-then-split cycle at a time.

use ndarray::{Array2, ArrayViewMut2};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use super::config::SoupConfig;
use super::micelle::Micelle;
use super::preference::Preferences;
use crate::error::{GardError, Result};

/// What happened during one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// 1-based index of the cycle.
    pub cycle: u64,
    /// Micelles that received growth (population at the start of the cycle).
    pub micelles_grown: usize,
    /// Amphiphiles incorporated across all micelles.
    pub units_added: u64,
    /// Micelles that divided.
    pub splits: usize,
    /// Population at the end of the cycle.
    pub micelles: usize,
}

/// A GARD soup.
#[derive(Clone, Debug)]
pub struct Soup {
    config: SoupConfig,
    preferences: Preferences,
    micelles: Vec<Micelle>,
    cycles_run: u64,
}

impl Soup {
    /// Build a soup: sample K and B from the configured distributions and
    /// seed it with a single random micelle of N units.
    pub fn new<R: Rng + ?Sized>(config: SoupConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let preferences = Preferences::sample(
            config.types,
            config.k_mu,
            config.k_sigma,
            config.b_mu,
            config.b_sigma,
            rng,
        )?;
        Self::with_preferences(config, preferences, rng)
    }

    /// Build a soup around caller-supplied matrices (must be G x G).
    pub fn with_preferences<R: Rng + ?Sized>(
        config: SoupConfig,
        preferences: Preferences,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        if preferences.types() != config.types {
            return Err(GardError::ShapeMismatch {
                expected: (config.types, config.types),
                found: preferences.affinity().dim(),
            });
        }

        let seed = Micelle::new(config.seed_size, config.types, rng)?;
        debug!(
            seed_size = config.seed_size,
            types = config.types,
            "soup initialised"
        );

        Ok(Self {
            config,
            preferences,
            micelles: vec![seed],
            cycles_run: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &SoupConfig {
        &self.config
    }

    /// N: seed micelle size.
    #[inline]
    pub fn seed_size(&self) -> usize {
        self.config.seed_size
    }

    /// G: number of amphiphile types.
    #[inline]
    pub fn types(&self) -> usize {
        self.config.types
    }

    /// Micelles at or above this size divide (2N).
    #[inline]
    pub fn split_threshold(&self) -> u64 {
        self.config.split_threshold()
    }

    #[inline]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// K: intrinsic affinity matrix.
    #[inline]
    pub fn affinity(&self) -> &Array2<f64> {
        self.preferences.affinity()
    }

    /// B: catalytic enhancement matrix.
    #[inline]
    pub fn enhancement(&self) -> &Array2<f64> {
        self.preferences.enhancement()
    }

    /// Overwrite K in place.
    pub fn affinity_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.preferences.affinity_mut()
    }

    /// Overwrite B in place, e.g. to force a deterministic favourite.
    pub fn enhancement_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.preferences.enhancement_mut()
    }

    pub fn set_affinity(&mut self, affinity: Array2<f64>) -> Result<()> {
        self.preferences.set_affinity(affinity)
    }

    pub fn set_enhancement(&mut self, enhancement: Array2<f64>) -> Result<()> {
        self.preferences.set_enhancement(enhancement)
    }

    #[inline]
    pub fn micelles(&self) -> &[Micelle] {
        &self.micelles
    }

    /// Mutable access to the population, without the ability to add or remove micelles.
    #[inline]
    pub fn micelles_mut(&mut self) -> &mut [Micelle] {
        &mut self.micelles
    }

    #[inline]
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Amphiphiles summed over every micelle.
    pub fn total_units(&self) -> u64 {
        self.micelles.iter().map(Micelle::total).sum()
    }

    /// Growth phase: every micelle takes up one unit of each favoured type.
    ///
    /// Micelles are independent here (they only read K and B), so the
    /// population is processed on the rayon pool. Returns units added.
    pub fn grow(&mut self) -> Result<u64> {
        let preferences = &self.preferences;
        let added = self
            .micelles
            .par_iter_mut()
            .map(|micelle| -> Result<u64> {
                let favoured = preferences.favoured_types(micelle.composition())?;
                for &index in &favoured {
                    micelle.add_unit(index)?;
                }
                Ok(favoured.len() as u64)
            })
            .collect::<Result<Vec<u64>>>()?;

        Ok(added.iter().sum())
    }

    /// Split phase: replace every micelle with at least 2N units by its two
    /// daughters.
    ///
    /// Candidates are fixed before anything is split, so daughters are never
    /// reconsidered in the same call. Daughters are appended after the
    /// surviving micelles. If any split fails the population is left as it
    /// was. Returns the number of splits.
    pub fn split_all<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        let threshold = self.split_threshold();
        let ready: Vec<usize> = self
            .micelles
            .iter()
            .enumerate()
            .filter(|(_, micelle)| micelle.total() >= threshold)
            .map(|(i, _)| i)
            .collect();

        if ready.is_empty() {
            return Ok(0);
        }

        let mut daughters = Vec::with_capacity(2 * ready.len());
        for &i in &ready {
            let parent = &self.micelles[i];
            let (first, second) = parent.split_with(self.config.split_policy, rng)?;
            trace!(
                parent = parent.total(),
                first = first.total(),
                second = second.total(),
                "micelle split"
            );
            daughters.push(first);
            daughters.push(second);
        }

        let mut index = 0;
        self.micelles.retain(|_| {
            let keep = ready.binary_search(&index).is_err();
            index += 1;
            keep
        });
        self.micelles.extend(daughters);

        Ok(ready.len())
    }

    /// Advance one cycle: grow, then split.
    pub fn run_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<CycleSummary> {
        let micelles_grown = self.micelles.len();
        let units_added = self.grow()?;
        let splits = self.split_all(rng)?;
        self.cycles_run += 1;

        let summary = CycleSummary {
            cycle: self.cycles_run,
            micelles_grown,
            units_added,
            splits,
            micelles: self.micelles.len(),
        };
        debug!(
            cycle = summary.cycle,
            units_added = summary.units_added,
            splits = summary.splits,
            micelles = summary.micelles,
            "cycle complete"
        );
        Ok(summary)
    }

    /// Run `count` cycles, stopping at the first error.
    pub fn run_cycles<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<CycleSummary>> {
        (0..count).map(|_| self.run_cycle(&mut *rng)).collect()
    }

    /// Snapshot of every micelle's composition, one row per micelle.
    ///
    /// The array is an owned copy; changing it does not touch the soup.
    pub fn all_compositions(&self) -> Array2<u64> {
        let types = self.types();
        let mut out = Array2::<u64>::zeros((self.micelles.len(), types));
        for (mut row, micelle) in out.outer_iter_mut().zip(&self.micelles) {
            row.assign(&micelle.composition());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gard::config::SplitPolicy;
    use ndarray::{array, Array1};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// N=3, G=8 soup where B favours type 0 only and K is all ones.
    fn biased_soup(rng: &mut StdRng) -> Soup {
        let mut soup = Soup::new(SoupConfig::new(3, 8), rng).unwrap();
        let mut b = Array2::<f64>::zeros((8, 8));
        b.row_mut(0).fill(10.0);
        soup.set_enhancement(b).unwrap();
        soup.set_affinity(Array2::ones((8, 8))).unwrap();
        soup
    }

    #[test]
    fn test_initialisation() {
        let mut rng = StdRng::seed_from_u64(42);
        let soup = Soup::new(SoupConfig::new(5, 10), &mut rng).unwrap();

        assert_eq!(soup.micelles().len(), 1);
        let micelle = &soup.micelles()[0];
        assert_eq!(micelle.types(), soup.types());
        assert_eq!(micelle.total(), soup.seed_size() as u64);
        assert_eq!(soup.affinity().dim(), (10, 10));
        assert_eq!(soup.enhancement().dim(), (10, 10));
        assert_eq!(soup.split_threshold(), 10);
        assert_eq!(soup.cycles_run(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            Soup::new(SoupConfig::new(0, 10), &mut rng),
            Err(GardError::InvalidConfig(_))
        ));
        let mut config = SoupConfig::new(5, 10);
        config.k_sigma = -0.5;
        assert!(Soup::new(config, &mut rng).is_err());
    }

    #[test]
    fn test_with_preferences_checks_types() {
        let mut rng = StdRng::seed_from_u64(1);
        let prefs = Preferences::from_matrices(Array2::ones((4, 4)), Array2::ones((4, 4))).unwrap();
        assert!(matches!(
            Soup::with_preferences(SoupConfig::new(2, 5), prefs, &mut rng),
            Err(GardError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_grow_adds_one_per_favoured_type() {
        let mut rng = StdRng::seed_from_u64(7);
        for &(n, g) in &[(1usize, 5usize), (5, 10), (10, 40), (50, 100)] {
            let mut soup = Soup::new(SoupConfig::new(n, g), &mut rng).unwrap();
            let expected = soup
                .preferences()
                .favoured_types(soup.micelles()[0].composition())
                .unwrap()
                .len() as u64;

            let added = soup.grow().unwrap();

            assert_eq!(added, expected);
            assert_eq!(soup.micelles()[0].total(), n as u64 + expected);
        }
    }

    #[test]
    fn test_grow_biased_matrix_favours_type_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut soup = biased_soup(&mut rng);
        let before = soup.micelles()[0].composition().to_owned();

        for cycle in 1..=4u64 {
            assert_eq!(soup.grow().unwrap(), 1);
            assert_eq!(soup.micelles()[0].composition()[0], before[0] + cycle);
        }
        assert_eq!(soup.total_units(), 3 + 4);
    }

    #[test]
    fn test_grow_ties_add_every_favourite() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut soup = Soup::new(SoupConfig::new(3, 6), &mut rng).unwrap();
        soup.set_enhancement(Array2::ones((6, 6))).unwrap();
        soup.set_affinity(Array2::zeros((6, 6))).unwrap();

        assert_eq!(soup.grow().unwrap(), 6);
        assert_eq!(soup.total_units(), 3 + 6);
    }

    #[test]
    fn test_split_all_at_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut soup = Soup::new(SoupConfig::new(5, 10), &mut rng).unwrap();
        soup.micelles_mut()[0].composition_mut()[0] += 5;
        let before = soup.total_units();

        let splits = soup.split_all(&mut rng).unwrap();

        assert_eq!(splits, 1);
        assert_eq!(soup.micelles().len(), 2);
        assert_eq!(soup.total_units(), before);
        assert!(soup.micelles()[0].total() > 0);
    }

    #[test]
    fn test_split_all_below_threshold_is_noop() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut soup = Soup::new(SoupConfig::new(5, 10), &mut rng).unwrap();
        soup.micelles_mut()[0].composition_mut()[0] += 4;

        assert_eq!(soup.split_all(&mut rng).unwrap(), 0);
        assert_eq!(soup.micelles().len(), 1);
    }

    #[test]
    fn test_split_all_keeps_survivors_and_appends_daughters() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut soup = Soup::new(SoupConfig::new(2, 3), &mut rng).unwrap();
        soup.micelles = vec![
            Micelle::from_composition(2, array![4u64, 0, 0]).unwrap(),
            Micelle::from_composition(2, array![1u64, 1, 0]).unwrap(),
            Micelle::from_composition(2, array![0u64, 2, 3]).unwrap(),
        ];

        assert_eq!(soup.split_all(&mut rng).unwrap(), 2);

        let micelles = soup.micelles();
        assert_eq!(micelles.len(), 5);
        assert_eq!(micelles[0].composition(), array![1u64, 1, 0].view());
        assert_eq!(
            &micelles[1].composition() + &micelles[2].composition(),
            array![4u64, 0, 0]
        );
        assert_eq!(
            &micelles[3].composition() + &micelles[4].composition(),
            array![0u64, 2, 3]
        );
        assert_eq!(soup.total_units(), 4 + 2 + 5);
    }

    #[test]
    fn test_split_all_failure_leaves_population_intact() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut config = SoupConfig::new(1, 2);
        config.split_policy = SplitPolicy::Retry { max_attempts: 1 };
        let mut soup = Soup::new(config, &mut rng).unwrap();
        soup.micelles = vec![Micelle::from_composition(1, array![2u64, 0]).unwrap(); 64];

        // A 2-unit single-type micelle leaves the first daughter empty with
        // probability 1/3 per draw, so one of 64 single attempts fails.
        let before = soup.micelles().to_vec();
        let result = soup.split_all(&mut rng);

        assert!(matches!(result, Err(GardError::SplitAttemptsExhausted { attempts: 1 })));
        assert_eq!(soup.micelles(), before.as_slice());
    }

    #[test]
    fn test_run_cycle_summary() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut soup = biased_soup(&mut rng);

        let first = soup.run_cycle(&mut rng).unwrap();
        assert_eq!(first.cycle, 1);
        assert_eq!(first.micelles_grown, 1);
        assert_eq!(first.units_added, 1);
        assert_eq!(first.splits, 0);
        assert_eq!(first.micelles, 1);

        // Units 4 and 5, then the micelle reaches 2N = 6 on the third cycle.
        soup.run_cycle(&mut rng).unwrap();
        let third = soup.run_cycle(&mut rng).unwrap();
        assert_eq!(third.splits, 1);
        assert_eq!(third.micelles, 2);
        assert_eq!(soup.total_units(), 6);
        assert_eq!(soup.cycles_run(), 3);
    }

    #[test]
    fn test_cycle_summary_serializes_field_names() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut soup = biased_soup(&mut rng);
        let summary = soup.run_cycle(&mut rng).unwrap();

        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "cycle": 1,
                "micelles_grown": 1,
                "units_added": 1,
                "splits": 0,
                "micelles": 1
            })
        );
    }

    #[test]
    fn test_run_cycles_collects_summaries() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut soup = Soup::new(SoupConfig::new(4, 12), &mut rng).unwrap();
        let summaries = soup.run_cycles(15, &mut rng).unwrap();

        assert_eq!(summaries.len(), 15);
        for pair in summaries.windows(2) {
            assert_eq!(pair[1].micelles_grown, pair[0].micelles);
        }
        let added: u64 = summaries.iter().map(|s| s.units_added).sum();
        assert_eq!(soup.total_units(), 4 + added);
    }

    #[test]
    fn test_all_compositions_snapshot() {
        let mut rng = StdRng::seed_from_u64(42);
        let soup = Soup::new(SoupConfig::new(5, 10), &mut rng).unwrap();

        let mut snapshot = soup.all_compositions();
        assert_eq!(snapshot.dim(), (1, 10));
        assert_eq!(snapshot.sum(), 5);

        snapshot.fill(99);
        assert_eq!(soup.total_units(), 5);
    }

    #[test]
    fn test_all_compositions_rows_follow_population() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut soup = Soup::new(SoupConfig::new(5, 10), &mut rng).unwrap();
        soup.run_cycles(30, &mut rng).unwrap();

        let snapshot = soup.all_compositions();
        assert_eq!(snapshot.nrows(), soup.micelles().len());
        for (row, micelle) in snapshot.outer_iter().zip(soup.micelles()) {
            assert_eq!(row, micelle.composition());
        }
        assert_eq!(snapshot.sum(), soup.total_units());
    }

    #[test]
    fn test_reproducible_with_same_seed() {
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut soup = Soup::new(SoupConfig::new(4, 10), &mut rng).unwrap();
            soup.run_cycles(25, &mut rng).unwrap();
            soup.all_compositions()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_wrong_length_micelle_aborts_grow() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut soup = Soup::new(SoupConfig::new(2, 4), &mut rng).unwrap();
        soup.micelles_mut()[0] = Micelle::from_composition(2, Array1::ones(3)).unwrap();

        assert_eq!(
            soup.grow().unwrap_err(),
            GardError::CompositionLength {
                expected: 4,
                found: 3
            }
        );
    }
}
