//! The named-stream pseudo-random number service.
//!
//! Every stochastic decision in a simulation (arrivals, service times,
//! request mix, random routing, random fit) draws from a named stream
//! installed here. All streams share one engine, so a fixed seed makes an
//! entire iteration reproducible.

use rand::distributions::{Uniform, WeightedIndex};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal, Poisson};
use rustc_hash::FxHashMap;

/// Named distribution streams over a single seeded engine.
///
/// The service is owned by the kernel and passed down explicitly to the
/// components that draw from it; there is no global instance.
#[derive(Debug)]
pub struct Prng {
    rng: StdRng,
    seed: u64,
    streams: FxHashMap<String, Stream>,
}

#[derive(Debug, Clone)]
enum Stream {
    Exponential(Exp<f64>),
    Poisson(Poisson<f64>),
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
    Discrete(WeightedIndex<f64>),
}

impl Prng {
    /// A service seeded from a non-deterministic source.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    /// A service with an explicit seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            streams: FxHashMap::default(),
        }
    }

    /// The seed the engine currently runs on.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restarts the engine from `seed`. Installed streams are kept.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Restarts the engine from a non-deterministic seed.
    pub fn reseed_from_entropy(&mut self) {
        self.set_seed(rand::random());
    }

    /// Installs an exponential stream with rate parameter `rate`.
    pub fn set_exponential(
        &mut self,
        name: impl Into<String>,
        rate: f64,
    ) -> Result<(), PrngError> {
        let name = name.into();
        let dist = Exp::new(rate).map_err(|_| PrngError::invalid(&name))?;
        self.streams.insert(name, Stream::Exponential(dist));
        Ok(())
    }

    /// Installs a Poisson stream with the given mean.
    pub fn set_poisson(&mut self, name: impl Into<String>, mean: f64) -> Result<(), PrngError> {
        let name = name.into();
        let dist = Poisson::new(mean).map_err(|_| PrngError::invalid(&name))?;
        self.streams.insert(name, Stream::Poisson(dist));
        Ok(())
    }

    /// Installs a normal stream.
    pub fn set_normal(
        &mut self,
        name: impl Into<String>,
        mean: f64,
        std_dev: f64,
    ) -> Result<(), PrngError> {
        let name = name.into();
        let dist = Normal::new(mean, std_dev).map_err(|_| PrngError::invalid(&name))?;
        self.streams.insert(name, Stream::Normal(dist));
        Ok(())
    }

    /// Installs a uniform stream over `[min, max)`.
    pub fn set_uniform(
        &mut self,
        name: impl Into<String>,
        min: f64,
        max: f64,
    ) -> Result<(), PrngError> {
        let name = name.into();
        if !(min < max) {
            return Err(PrngError::invalid(&name));
        }
        self.streams.insert(name, Stream::Uniform(Uniform::new(min, max)));
        Ok(())
    }

    /// Installs a categorical stream; `weights` are normalized internally
    /// and draws return the selected index.
    pub fn set_discrete(
        &mut self,
        name: impl Into<String>,
        weights: &[f64],
    ) -> Result<(), PrngError> {
        let name = name.into();
        let dist = WeightedIndex::new(weights).map_err(|_| PrngError::invalid(&name))?;
        self.streams.insert(name, Stream::Discrete(dist));
        Ok(())
    }

    /// Draws from the named stream.
    ///
    /// # Panics
    ///
    /// Panics if no stream was installed under `name`; drawing from an
    /// unregistered stream is a programming error, not a runtime condition.
    pub fn next(&mut self, name: &str) -> f64 {
        let stream = self
            .streams
            .get(name)
            .unwrap_or_else(|| panic!("draw from unregistered stream `{name}`"));
        match stream {
            Stream::Exponential(dist) => dist.sample(&mut self.rng),
            Stream::Poisson(dist) => dist.sample(&mut self.rng),
            Stream::Normal(dist) => dist.sample(&mut self.rng),
            Stream::Uniform(dist) => dist.sample(&mut self.rng),
            Stream::Discrete(dist) => dist.sample(&mut self.rng) as f64,
        }
    }
}

/// Stream installation error.
#[derive(Debug, thiserror::Error)]
pub enum PrngError {
    /// The distribution parameters are outside their domain.
    #[error("stream `{0}` has invalid distribution parameters")]
    InvalidParameters(String),
}

impl PrngError {
    fn invalid(name: &str) -> Self {
        Self::InvalidParameters(name.to_owned())
    }
}
