#![warn(unreachable_pub, missing_debug_implementations)]

//! The core simulation library. This crate defines the discrete-event
//! [kernel](kernel::Kernel) that turns validated [settings](settings::Settings)
//! into blocking and fragmentation statistics for dynamic routing and
//! spectrum assignment on elastic optical networks.

#[macro_use]
mod ident;

pub mod dispatch;
pub mod event;
pub mod fragmentation;
pub mod kernel;
pub mod modulation;
pub mod network;
pub mod prng;
pub mod request;
pub mod settings;
pub mod spectrum;
pub mod stats;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use kernel::{Kernel, KernelError};
pub use network::routing::{Route, RouteStrategy, Router};
pub use network::topology::{Edge, Topology, TopologyError, Vertex};
pub use settings::{Settings, SettingsError};
pub use spectrum::{Slice, Spectrum, SpectrumAllocator};
pub use stats::Statistics;
