//! Game logic: turns, coefficients, answer validation, scoring, session state

pub mod arbitrator;
pub mod clock;
pub mod coefficient;
pub mod dictionary;
pub mod scoring;
pub mod session;
pub mod turn;
pub mod validation;

use rand::Rng;
use std::collections::VecDeque;

/// Uniform random draws in [0, 1).
///
/// Turn generation only ever asks for uniform floats, so tests can script the
/// exact sequence of decisions.
pub trait RandomSource: Send {
    fn uniform(&mut self) -> f64;
}

/// Adapter for any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<rand::rngs::StdRng> {
    /// Seeded from thread-local entropy, for live play.
    pub fn from_entropy() -> Self {
        use rand::SeedableRng;
        RngSource(rand::rngs::StdRng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn uniform(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Replays a fixed list of draws, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        match self.values.pop_front() {
            Some(v) => {
                self.values.push_back(v);
                v.clamp(0.0, 1.0 - f64::EPSILON)
            }
            None => 0.0,
        }
    }
}

/// Uniform index into a non-empty collection of `len` items.
pub(crate) fn pick_index(rng: &mut dyn RandomSource, len: usize) -> usize {
    debug_assert!(len > 0);
    ((rng.uniform() * len as f64) as usize).min(len.saturating_sub(1))
}
