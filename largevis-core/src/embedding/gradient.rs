//! Force laws for the embedding objective.
//!
//! Each law turns the squared distance `d2` between two embedded points into
//! a scalar coefficient applied to their difference vector `y_i - y_other`.
//! Attraction (positive edges) pulls the pair together; repulsion (negative
//! samples) pushes it apart, scaled by `gamma`.
//!
//! The law is chosen once per run and the SGD loop is monomorphised over it.

/// Lower bound applied to `d2` before evaluating a law.
pub(crate) const MIN_DIST_SQUARED: f32 = 1e-8;
/// Upper bound applied to `d2`; also keeps `exp(d2)` finite in `f32`.
pub(crate) const MAX_DIST_SQUARED: f32 = 80.0;
/// Offset keeping repulsion finite for coincident points.
pub(crate) const REPULSION_EPSILON: f32 = 0.1;
/// Every gradient component is clipped to `[-GRADIENT_CLIP, GRADIENT_CLIP]`.
pub(crate) const GRADIENT_CLIP: f32 = 4.0;

/// A scalar force law over squared distances.
pub(crate) trait ForceLaw: Send + Sync {
    /// Coefficient for an edge pair; non-positive.
    fn attraction(&self, d2: f32) -> f32;
    /// Coefficient for a negative sample before `gamma`; non-negative.
    fn repulsion(&self, d2: f32) -> f32;
}

/// `p = 1 / (1 + a * d2)` for a general `a > 0`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AlphaLaw {
    pub(crate) alpha: f32,
}

impl ForceLaw for AlphaLaw {
    fn attraction(&self, d2: f32) -> f32 {
        -2.0 * self.alpha / (1.0 + self.alpha * d2)
    }

    fn repulsion(&self, d2: f32) -> f32 {
        2.0 / ((REPULSION_EPSILON + d2) * (1.0 + self.alpha * d2))
    }
}

/// `p = 1 / (1 + d2)`, the common case with the multiplications folded away.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AlphaOneLaw;

impl ForceLaw for AlphaOneLaw {
    fn attraction(&self, d2: f32) -> f32 {
        -2.0 / (1.0 + d2)
    }

    fn repulsion(&self, d2: f32) -> f32 {
        2.0 / ((REPULSION_EPSILON + d2) * (1.0 + d2))
    }
}

/// `p = 1 / (1 + exp(d2))`, used when `alpha == 0`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ExponentialLaw;

impl ForceLaw for ExponentialLaw {
    fn attraction(&self, d2: f32) -> f32 {
        -2.0 / (1.0 + (-d2).exp())
    }

    fn repulsion(&self, d2: f32) -> f32 {
        2.0 / (1.0 + d2.exp())
    }
}

/// Which force law a run uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ForceLawKind {
    /// `alpha == 0`.
    Exponential,
    /// `alpha == 1`.
    AlphaOne,
    /// Any other positive `alpha`.
    Alpha(f32),
}

impl ForceLawKind {
    /// Picks the law matching `alpha`.
    ///
    /// # Examples
    /// ```
    /// use largevis_core::embedding::ForceLawKind;
    ///
    /// assert_eq!(ForceLawKind::from_alpha(0.0), ForceLawKind::Exponential);
    /// assert_eq!(ForceLawKind::from_alpha(1.0), ForceLawKind::AlphaOne);
    /// assert_eq!(ForceLawKind::from_alpha(0.5), ForceLawKind::Alpha(0.5));
    /// ```
    #[must_use]
    pub fn from_alpha(alpha: f32) -> Self {
        if alpha == 0.0 {
            Self::Exponential
        } else if alpha == 1.0 {
            Self::AlphaOne
        } else {
            Self::Alpha(alpha)
        }
    }
}

/// A force law bound to `gamma`, producing clipped gradient vectors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Gradient<L> {
    law: L,
    gamma: f32,
}

impl<L: ForceLaw> Gradient<L> {
    pub(crate) fn new(law: L, gamma: f32) -> Self {
        Self { law, gamma }
    }

    /// Writes the attractive gradient for the pair `(y_i, y_j)` into `out`.
    pub(crate) fn positive(&self, y_i: &[f32], y_j: &[f32], out: &mut [f32]) {
        let d2 = difference(y_i, y_j, out);
        let coefficient = self.law.attraction(d2);
        scale_and_clip(out, coefficient);
    }

    /// Writes the repulsive gradient for the pair `(y_i, y_k)` into `out`.
    pub(crate) fn negative(&self, y_i: &[f32], y_k: &[f32], out: &mut [f32]) {
        let d2 = difference(y_i, y_k, out);
        let coefficient = self.gamma * self.law.repulsion(d2);
        scale_and_clip(out, coefficient);
    }
}

/// Stores `a - b` in `out` and returns the clamped squared norm.
fn difference(a: &[f32], b: &[f32], out: &mut [f32]) -> f32 {
    let mut d2 = 0.0;
    for ((slot, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *slot = x - y;
        d2 += *slot * *slot;
    }
    d2.clamp(MIN_DIST_SQUARED, MAX_DIST_SQUARED)
}

fn scale_and_clip(out: &mut [f32], coefficient: f32) {
    for value in out {
        *value = (*value * coefficient).clamp(-GRADIENT_CLIP, GRADIENT_CLIP);
    }
}
