use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{precondition, Result};

/// How row subsets are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Uniform sample without replacement, sorted ascending.
    #[default]
    Random,
    /// Leading rows only; no randomness ("sanity" mode).
    Deterministic,
}

/// Disjoint partition of `0..n` into training and held-out indices, each ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

impl Split {
    /// Draw `train_size` training rows; the rest are held out.
    ///
    /// Deterministic mode trains on the leading rows.
    pub fn with_train_size<R: Rng + ?Sized>(
        n: usize,
        train_size: usize,
        mode: SplitMode,
        rng: &mut R,
    ) -> Result<Self> {
        let train = draw(n, train_size, mode, rng)?;
        let holdout = complement(n, &train);
        Ok(Self { train, holdout })
    }

    /// Draw `holdout_size` held-out rows; the rest are training rows.
    ///
    /// Deterministic mode holds out the leading rows.
    pub fn with_holdout_size<R: Rng + ?Sized>(
        n: usize,
        holdout_size: usize,
        mode: SplitMode,
        rng: &mut R,
    ) -> Result<Self> {
        let holdout = draw(n, holdout_size, mode, rng)?;
        let train = complement(n, &holdout);
        Ok(Self { train, holdout })
    }
}

fn draw<R: Rng + ?Sized>(n: usize, count: usize, mode: SplitMode, rng: &mut R) -> Result<Vec<usize>> {
    if count > n {
        return Err(precondition(format!(
            "cannot draw {} rows from a sample of {}",
            count, n
        )));
    }
    let mut picked = match mode {
        SplitMode::Deterministic => (0..count).collect::<Vec<_>>(),
        SplitMode::Random => rand::seq::index::sample(rng, n, count).into_vec(),
    };
    picked.sort_unstable();
    Ok(picked)
}

/// Ascending indices of `0..n` not in `sorted`.
fn complement(n: usize, sorted: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(n - sorted.len());
    let mut it = sorted.iter().peekable();
    for i in 0..n {
        if it.peek() == Some(&&i) {
            it.next();
        } else {
            out.push(i);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn deterministic_train_prefix() {
        let mut rng = StdRng::seed_from_u64(0);
        let s = Split::with_train_size(6, 4, SplitMode::Deterministic, &mut rng).unwrap();
        assert_eq!(s.train, vec![0, 1, 2, 3]);
        assert_eq!(s.holdout, vec![4, 5]);
    }

    #[test]
    fn deterministic_holdout_prefix() {
        let mut rng = StdRng::seed_from_u64(0);
        let s = Split::with_holdout_size(5, 2, SplitMode::Deterministic, &mut rng).unwrap();
        assert_eq!(s.holdout, vec![0, 1]);
        assert_eq!(s.train, vec![2, 3, 4]);
    }

    #[test]
    fn random_split_is_sorted_disjoint_and_complete() {
        let mut rng = StdRng::seed_from_u64(42);
        let s = Split::with_train_size(50, 17, SplitMode::Random, &mut rng).unwrap();
        assert_eq!(s.train.len(), 17);
        assert_eq!(s.holdout.len(), 33);
        assert!(s.train.windows(2).all(|w| w[0] < w[1]));
        assert!(s.holdout.windows(2).all(|w| w[0] < w[1]));
        let mut all: Vec<usize> = s.train.iter().chain(&s.holdout).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_draw_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Split::with_train_size(3, 4, SplitMode::Random, &mut rng).is_err());
    }
}
