//! Traffic request classes and in-flight requests.

use crate::network::routing::Route;
use crate::spectrum::{Slice, SpectrumAllocator};
use crate::units::Fsus;

/// A class of connection requests from the configuration: its FSU demand,
/// spectrum fit policy, draw weight, and running per-iteration counters.
#[derive(Debug, Clone)]
pub struct RequestType {
    pub name: String,
    pub modulation: String,
    pub allocator: SpectrumAllocator,
    pub bandwidth: f64,
    /// Relative weight in the `"fsus"` draw.
    pub ratio: f64,
    /// FSU demand, derived from the modulation at configuration load.
    pub fsus: Fsus,
    /// Requests of this type scheduled since the last reset or warm-up.
    pub counting: u64,
    /// Requests of this type blocked since the last reset or warm-up.
    pub blocking: u64,
}

impl RequestType {
    pub fn new(
        name: impl Into<String>,
        modulation: impl Into<String>,
        allocator: SpectrumAllocator,
        bandwidth: f64,
        ratio: f64,
        fsus: Fsus,
    ) -> Self {
        Self {
            name: name.into(),
            modulation: modulation.into(),
            allocator,
            bandwidth,
            ratio,
            fsus,
            counting: 0,
            blocking: 0,
        }
    }
}

/// One connection attempt. Created when its arrival is drawn; an accepted
/// request is carried unchanged by the matching departure.
#[derive(Debug, Clone)]
pub struct Request {
    pub fsus: Fsus,
    pub allocator: SpectrumAllocator,
    pub route: Route,
    /// The reserved slice, recorded by a successful dispatch.
    pub slice: Option<Slice>,
    pub accepted: bool,
}

impl Request {
    pub fn new(fsus: Fsus, allocator: SpectrumAllocator, route: Route) -> Self {
        Self {
            fsus,
            allocator,
            route,
            slice: None,
            accepted: false,
        }
    }
}
