//! Tolerance-aware comparisons shared by every place where tableau arithmetic
//! turns into a discrete decision (pivot selection, integrality, pruning).

use std::fmt;
use std::ops::Neg;

use num_rational::Rational64;
use num_traits::{Num, Zero};

/// Fixed tolerance absorbing floating point drift across pivots.
pub const EPSILON: f64 = 1e-11;

/// True if `value` lies within [`EPSILON`] of an integer.
pub fn is_integral(value: f64) -> bool {
    approx_eq(value, value.round())
}

/// True if `value` is not below zero by more than [`EPSILON`].
pub fn is_non_negative(value: f64) -> bool {
    value >= -EPSILON
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Nearest integer, or `None` when `value` is not finite or does not fit in `i64`.
pub fn nearest_integer(value: f64) -> Option<i64> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

/// The field a tableau is computed over.
///
/// `f64` compares against [`EPSILON`]; [`Rational64`] compares exactly. All
/// simplex, branch-and-bound and elimination code is written against this
/// trait so either arithmetic can be selected at solve time.
pub trait Scalar:
    Clone + fmt::Debug + PartialOrd + Num + Neg<Output = Self> + Send + Sync + 'static
{
    fn from_i64(value: i64) -> Self;

    fn to_f64(&self) -> f64;

    /// Strictly negative beyond tolerance.
    fn is_below_zero(&self) -> bool;

    /// Strictly positive beyond tolerance.
    fn is_above_zero(&self) -> bool;

    fn is_near_zero(&self) -> bool {
        !self.is_below_zero() && !self.is_above_zero()
    }

    fn is_integral(&self) -> bool;

    fn round_down(&self) -> Self;

    fn round_up(&self) -> Self;

    fn nearest_integer(&self) -> Option<i64>;

    /// Smallest integer not below `self`, treating values within tolerance of
    /// an integer as that integer.
    fn integral_ceiling(&self) -> Self {
        match self.nearest_integer() {
            Some(n) if self.is_integral() => Self::from_i64(n),
            _ => self.round_up(),
        }
    }
}

impl Scalar for f64 {
    fn from_i64(value: i64) -> Self {
        value as f64
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn is_below_zero(&self) -> bool {
        !is_non_negative(*self)
    }

    fn is_above_zero(&self) -> bool {
        *self > EPSILON
    }

    fn is_integral(&self) -> bool {
        is_integral(*self)
    }

    fn round_down(&self) -> Self {
        f64::floor(*self)
    }

    fn round_up(&self) -> Self {
        f64::ceil(*self)
    }

    fn nearest_integer(&self) -> Option<i64> {
        nearest_integer(*self)
    }
}

impl Scalar for Rational64 {
    fn from_i64(value: i64) -> Self {
        Rational64::from_integer(value)
    }

    fn to_f64(&self) -> f64 {
        *self.numer() as f64 / *self.denom() as f64
    }

    fn is_below_zero(&self) -> bool {
        *self < Rational64::zero()
    }

    fn is_above_zero(&self) -> bool {
        *self > Rational64::zero()
    }

    fn is_integral(&self) -> bool {
        Rational64::is_integer(self)
    }

    fn round_down(&self) -> Self {
        Rational64::floor(self)
    }

    fn round_up(&self) -> Self {
        Rational64::ceil(self)
    }

    fn nearest_integer(&self) -> Option<i64> {
        Some(Rational64::round(self).to_integer())
    }
}
