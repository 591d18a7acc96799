//! Utilities for writing tests.

use crate::network::topology::{Edge, Topology, Vertex};
use crate::request::RequestType;
use crate::settings::Settings;
use crate::spectrum::SpectrumAllocator;
use crate::units::{Cost, Fsus};

fn symmetric(edges: &[(usize, usize, f64)]) -> Vec<Edge> {
    edges
        .iter()
        .flat_map(|&(a, b, cost)| {
            [
                Edge::new(Vertex::new(a), Vertex::new(b), Cost::new(cost)),
                Edge::new(Vertex::new(b), Vertex::new(a), Cost::new(cost)),
            ]
        })
        .collect()
}

/// Two vertices joined by one symmetric link of cost 1.
pub fn two_node_topology() -> Topology {
    Topology::new(2, &symmetric(&[(0, 1, 1.0)])).expect("valid topology")
}

/// Three vertices: the detour 0 - 1 - 2 costs 2 + 2, the direct link 0 - 2
/// costs `direct_cost`. All links symmetric.
pub fn triangle_topology(direct_cost: f64) -> Topology {
    Topology::new(
        3,
        &symmetric(&[(0, 1, 2.0), (1, 2, 2.0), (0, 2, direct_cost)]),
    )
    .expect("valid topology")
}

/// Four vertices in two components: 0 - 1 and 2 - 3.
pub fn disconnected_topology() -> Topology {
    Topology::new(4, &symmetric(&[(0, 1, 1.0), (2, 3, 1.0)])).expect("valid topology")
}

/// Settings over [`two_node_topology`]: 4 slots per link and a single
/// first-fit request type demanding 2 slots.
pub fn two_node_settings(arrival_rate: f64, service_rate: f64) -> Settings {
    Settings::builder()
        .topology(two_node_topology())
        .fsus_per_link(Fsus::new(4))
        .time_units(100.0)
        .arrival_rate(arrival_rate)
        .service_rate(service_rate)
        .sampling_time(1.0)
        .request_types(vec![RequestType::new(
            "100G",
            "16-QAM",
            SpectrumAllocator::FirstFit,
            100.0,
            1.0,
            Fsus::new(2),
        )])
        .build()
}
