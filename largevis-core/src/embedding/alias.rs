//! Walker/Vose alias tables for O(1) sampling from a discrete distribution.

use rand::Rng;
use rand::distributions::Standard;
use thiserror::Error;

use crate::error::define_error_codes;

/// Errors returned while building an [`AliasTable`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AliasError {
    /// At least one weight is required.
    #[error("cannot build an alias table from no weights")]
    Empty,
    /// Weights must be finite and non-negative.
    #[error("weight {weight} at index {index} is negative or non-finite")]
    InvalidWeight {
        /// Position of the rejected weight.
        index: usize,
        /// The rejected weight.
        weight: f64,
    },
    /// Weights must not all be zero.
    #[error("weights sum to zero")]
    ZeroTotal,
}

define_error_codes! {
    /// Stable codes describing [`AliasError`] variants.
    enum AliasErrorCode for AliasError {
        /// No weights were supplied.
        Empty => Empty => "ALIAS_EMPTY",
        /// A weight was negative or non-finite.
        InvalidWeight => InvalidWeight { .. } => "ALIAS_INVALID_WEIGHT",
        /// All weights were zero.
        ZeroTotal => ZeroTotal => "ALIAS_ZERO_TOTAL",
    }
}

/// Samples outcome `i` with probability `weights[i] / sum(weights)`.
///
/// # Examples
/// ```
/// use largevis_core::embedding::AliasTable;
///
/// let table = AliasTable::new([1.0, 1.0, 2.0])?;
/// assert_eq!(table.len(), 3);
/// // Slot 2 holds its own outcome with certainty.
/// assert_eq!(table.sample(0.9, 0.5), 2);
/// # Ok::<(), largevis_core::embedding::AliasError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AliasTable {
    probabilities: Vec<f64>,
    aliases: Vec<usize>,
}

impl AliasTable {
    /// Builds the table from non-negative weights.
    ///
    /// # Errors
    /// Returns [`AliasError`] when `weights` is empty, holds a negative or
    /// non-finite value, or sums to zero.
    pub fn new<W>(weights: W) -> Result<Self, AliasError>
    where
        W: IntoIterator,
        W::Item: Into<f64>,
    {
        let weights: Vec<f64> = weights.into_iter().map(Into::into).collect();
        if weights.is_empty() {
            return Err(AliasError::Empty);
        }
        if let Some((index, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(AliasError::InvalidWeight { index, weight });
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(AliasError::ZeroTotal);
        }

        let len = weights.len();
        let scale = len as f64 / total;
        let mut probabilities: Vec<f64> = weights.iter().map(|w| w * scale).collect();
        let mut aliases: Vec<usize> = (0..len).collect();
        let (mut small, mut large): (Vec<usize>, Vec<usize>) =
            (0..len).partition(|&i| probabilities[i] < 1.0);

        while let (Some(&under), Some(&over)) = (small.last(), large.last()) {
            small.pop();
            aliases[under] = over;
            probabilities[over] -= 1.0 - probabilities[under];
            if probabilities[over] < 1.0 {
                large.pop();
                small.push(over);
            }
        }
        // Rounding leftovers keep their own outcome.
        for slot in small.into_iter().chain(large) {
            probabilities[slot] = 1.0;
        }

        Ok(Self {
            probabilities,
            aliases,
        })
    }

    /// Number of outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Always `false`; construction rejects empty weights.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Maps two uniforms in `[0, 1)` to an outcome.
    ///
    /// `u` picks the slot and `v` decides between the slot and its alias.
    #[must_use]
    pub fn sample(&self, u: f64, v: f64) -> usize {
        let len = self.probabilities.len();
        let slot = ((u * len as f64) as usize).min(len - 1);
        if v < self.probabilities[slot] {
            slot
        } else {
            self.aliases[slot]
        }
    }

    /// Draws an outcome using `rng`.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u: f64 = rng.sample(Standard);
        let v: f64 = rng.sample(Standard);
        self.sample(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rstest::rstest;

    #[test]
    fn matches_target_frequencies() {
        let table = AliasTable::new([1.0_f32, 1.0, 2.0]).expect("valid weights");
        let mut rng = SmallRng::seed_from_u64(7);
        let mut counts = [0_usize; 3];
        let draws = 200_000;
        for _ in 0..draws {
            counts[table.sample_with(&mut rng)] += 1;
        }
        let expected = [0.25, 0.25, 0.5];
        for (count, target) in counts.iter().zip(expected) {
            let observed = *count as f64 / draws as f64;
            assert!(
                (observed - target).abs() < 0.01,
                "observed {observed}, expected {target}"
            );
        }
    }

    #[test]
    fn zero_weight_outcomes_are_never_drawn() {
        let table = AliasTable::new([0.0, 3.0, 0.0, 1.0]).expect("valid weights");
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let outcome = table.sample_with(&mut rng);
            assert!(outcome == 1 || outcome == 3);
        }
    }

    #[test]
    fn slot_index_is_clamped_at_the_upper_edge() {
        let table = AliasTable::new([1.0, 1.0]).expect("valid weights");
        assert_eq!(table.sample(1.0, 0.0), 1);
        assert_eq!(table.sample(0.0, 0.0), 0);
    }

    #[test]
    fn single_outcome_always_wins() {
        let table = AliasTable::new([5.0]).expect("valid weights");
        assert_eq!(table.sample(0.99, 0.99), 0);
        assert!(!table.is_empty());
    }

    #[rstest]
    #[case(vec![], AliasErrorCode::Empty)]
    #[case(vec![1.0, -0.5], AliasErrorCode::InvalidWeight)]
    #[case(vec![f64::NAN], AliasErrorCode::InvalidWeight)]
    #[case(vec![f64::INFINITY], AliasErrorCode::InvalidWeight)]
    #[case(vec![0.0, 0.0], AliasErrorCode::ZeroTotal)]
    fn rejects_invalid_weights(#[case] weights: Vec<f64>, #[case] expected: AliasErrorCode) {
        let err = AliasTable::new(weights).expect_err("weights are invalid");
        assert_eq!(err.code(), expected);
    }
}
