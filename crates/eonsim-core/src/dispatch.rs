//! Atomic reservation and release of spectrum along a route.

use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashMap;

use crate::network::routing::{link_key, Route};
use crate::prng::Prng;
use crate::request::Request;
use crate::spectrum::Spectrum;

/// Per-link spectra keyed by the Cantor pairing of the link endpoints; one
/// entry per directed edge of the topology.
pub type Carriers = FxHashMap<u64, Spectrum>;

/// Reserves one contiguous slice on every link of a route, or nothing.
#[derive(Debug)]
pub struct Dispatcher {
    carriers: Carriers,
}

impl Dispatcher {
    pub fn new(carriers: Carriers) -> Self {
        Self { carriers }
    }

    pub fn carriers(&self) -> &Carriers {
        &self.carriers
    }

    /// The link keys along `route`, in source → destination order.
    fn keys(route: &Route) -> impl Iterator<Item = u64> + '_ {
        route
            .vertices
            .iter()
            .tuple_windows()
            .map(|(&x, &y)| link_key(x, y))
    }

    /// Attempts to place the request: asks its fit policy for a candidate
    /// slice on the first link, then validates that the candidate is free on
    /// every link of the route. Only a fully validated candidate mutates any
    /// spectrum; the same slice is then allocated on every link and recorded
    /// on the request.
    ///
    /// Returns `false`, leaving all spectra untouched, when no candidate
    /// exists or any link cannot carry it.
    pub fn dispatch(&mut self, request: &mut Request, prng: &mut Prng) -> bool {
        let keys = Self::keys(&request.route).collect::<Vec<_>>();
        let Some(&first) = keys.first() else {
            return false;
        };
        let width = request.fsus.into_usize();
        let candidate = request
            .allocator
            .select(self.spectrum(first), width, prng);
        let Some(slice) = candidate else {
            return false;
        };
        for &key in &keys {
            let spectrum = self.spectrum(key);
            if spectrum.available() < width || !spectrum.available_at(slice) {
                return false;
            }
        }
        for &key in &keys {
            let spectrum = self.spectrum_mut(key);
            spectrum.allocate(slice);
            debug!("link {key}: {}", spectrum.render());
        }
        request.slice = Some(slice);
        true
    }

    /// Returns the request's reserved slice to every link of its route.
    pub fn release(&mut self, request: &Request) {
        let Some(slice) = request.slice else {
            debug_assert!(false, "releasing a request that was never placed");
            return;
        };
        for key in Self::keys(&request.route) {
            let spectrum = self.spectrum_mut(key);
            spectrum.deallocate(slice);
            debug!("link {key}: {}", spectrum.render());
        }
    }

    fn spectrum(&self, key: u64) -> &Spectrum {
        self.carriers
            .get(&key)
            .expect("route traverses a link absent from the carriers")
    }

    fn spectrum_mut(&mut self, key: u64) -> &mut Spectrum {
        self.carriers
            .get_mut(&key)
            .expect("route traverses a link absent from the carriers")
    }
}
