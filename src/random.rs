//! Random sources.
//!
//! The engine never owns a generator. Every call that draws takes a
//! `&mut impl RandomSource`, so the same inputs and the same source
//! always produce the same result.

use rand::RngCore;

/// Uniform random numbers in `[0, 1)`.
///
/// Values outside that range are tolerated; the weighted selector clamps
/// them before use.
///
/// # Examples
///
/// ```rust
/// use gachaplan::random::{ConstantRandom, RandomSource};
///
/// let mut source = ConstantRandom(0.25);
/// assert_eq!(source.next_f64(), 0.25);
///
/// let mut counter = 0.0;
/// let mut closure = || {
///     counter += 0.1;
///     counter
/// };
/// assert!((closure.next_f64() - 0.1).abs() < 1e-12);
/// ```
pub trait RandomSource {
    /// Produce the next uniform value.
    fn next_f64(&mut self) -> f64;
}

impl<F> RandomSource for F
where
    F: FnMut() -> f64,
{
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

/// A source that always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRandom(pub f64);

impl RandomSource for ConstantRandom {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

/// A source that cycles through a fixed list of values.
///
/// An empty list behaves like `ConstantRandom(0.0)`.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Create a source cycling through `values`.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }
}

/// Adapts any `rand` generator into a `RandomSource`.
///
/// # Examples
///
/// ```rust
/// use gachaplan::random::{RandomSource, RngSource};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut a = RngSource::new(StdRng::seed_from_u64(7));
/// let mut b = RngSource::new(StdRng::seed_from_u64(7));
/// assert_eq!(a.next_f64(), b.next_f64());
/// ```
#[derive(Debug, Clone)]
pub struct RngSource<R>(R);

impl<R: RngCore> RngSource<R> {
    /// Wrap a generator.
    pub fn new(rng: R) -> Self {
        Self(rng)
    }

    /// Unwrap the generator.
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        rand::Rng::gen::<f64>(&mut self.0)
    }
}
