//! Route computation strategies and the memoizing [`Router`].

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::network::topology::{Topology, Vertex};
use crate::prng::Prng;
use crate::units::Cost;

/// Cantor pairing of an ordered vertex pair; the unique key of a directed
/// link and of a cached route.
pub fn link_key(source: Vertex, destination: Vertex) -> u64 {
    let x = source.inner() as u64;
    let y = destination.inner() as u64;
    (x + y) * (x + y + 1) / 2 + y
}

/// An ordered vertex sequence from a source to a destination, with the
/// summed edge cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub vertices: Vec<Vertex>,
    pub cost: Cost,
}

impl Route {
    pub fn new(vertices: Vec<Vertex>, cost: Cost) -> Self {
        Self { vertices, cost }
    }

    pub fn source(&self) -> Option<Vertex> {
        self.vertices.first().copied()
    }

    pub fn destination(&self) -> Option<Vertex> {
        self.vertices.last().copied()
    }

    /// The number of links the route traverses.
    pub fn hops(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }
}

/// Route computation strategies. The set is closed, so strategies are enum
/// variants rather than trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStrategy {
    /// Unweighted shortest path; the reported cost is zero.
    BreadthFirst,
    /// Any path to the destination, not necessarily minimal; cost zero.
    DepthFirst,
    /// Minimum-cost path; equal costs are broken by fewer hops.
    Dijkstra,
    /// The best of up to `k` cheapest paths from a loop-permitting
    /// best-first search.
    KShortest { k: usize },
    /// Ignores the requested endpoints and draws a distinct random pair
    /// from the `"routing"` stream, then routes it with Dijkstra.
    Random,
}

impl RouteStrategy {
    fn compute(self, topology: &Topology, source: Vertex, destination: Vertex) -> Option<Route> {
        match self {
            Self::BreadthFirst => breadth_first(topology, source, destination),
            Self::DepthFirst => depth_first(topology, source, destination),
            Self::Dijkstra => dijkstra(topology, source, destination),
            Self::KShortest { k } => k_shortest(topology, source, destination, k)
                .into_iter()
                .next(),
            // The router resolves randomized lookups before strategy dispatch.
            Self::Random => unreachable!("randomized lookups are resolved by the router"),
        }
    }
}

/// Computes routes with the installed strategy, memoizing results per
/// ordered endpoint pair.
///
/// The cache is keyed by [`link_key`] and never evicts; installing a new
/// strategy clears it, since different strategies disagree about the best
/// path for the same pair. Randomized lookups cache under the concrete
/// drawn pair, never under the [`Vertex::NULL`] sentinel, so repeated draws
/// of the same pair hit the cache while distinct draws stay distinct.
#[derive(Debug)]
pub struct Router {
    strategy: RouteStrategy,
    cache: FxHashMap<u64, Route>,
}

impl Router {
    pub fn new(strategy: RouteStrategy) -> Self {
        Self {
            strategy,
            cache: FxHashMap::default(),
        }
    }

    pub fn strategy(&self) -> RouteStrategy {
        self.strategy
    }

    /// Replaces the strategy and drops all memoized routes.
    pub fn set_strategy(&mut self, strategy: RouteStrategy) {
        self.strategy = strategy;
        self.cache.clear();
    }

    /// The number of memoized routes.
    pub fn cached_routes(&self) -> usize {
        self.cache.len()
    }

    /// A route from `source` to `destination`, served from the cache when
    /// possible. A [`Vertex::NULL`] endpoint (or the [`RouteStrategy::Random`]
    /// strategy) requests a randomized pair instead.
    pub fn compute(
        &mut self,
        topology: &Topology,
        prng: &mut Prng,
        source: Vertex,
        destination: Vertex,
    ) -> Option<Route> {
        if matches!(self.strategy, RouteStrategy::Random)
            || source.is_null()
            || destination.is_null()
        {
            return self.compute_random(topology, prng);
        }
        let key = link_key(source, destination);
        if let Some(route) = self.cache.get(&key) {
            return Some(route.clone());
        }
        let route = self.strategy.compute(topology, source, destination)?;
        self.cache.insert(key, route.clone());
        Some(route)
    }

    /// Draws endpoint pairs until one is distinct and connected; the drawn
    /// pair's Dijkstra route is memoized like any other lookup.
    fn compute_random(&mut self, topology: &Topology, prng: &mut Prng) -> Option<Route> {
        loop {
            let source = Vertex::new(prng.next("routing") as usize);
            let destination = Vertex::new(prng.next("routing") as usize);
            if source == destination {
                continue;
            }
            let key = link_key(source, destination);
            if let Some(route) = self.cache.get(&key) {
                return Some(route.clone());
            }
            if let Some(route) = dijkstra(topology, source, destination) {
                self.cache.insert(key, route.clone());
                return Some(route);
            }
        }
    }
}

fn breadth_first(topology: &Topology, source: Vertex, destination: Vertex) -> Option<Route> {
    let mut visited = FxHashSet::default();
    let mut predecessors = FxHashMap::default();
    let mut queue = VecDeque::new();
    visited.insert(source);
    queue.push_back(source);
    while let Some(vertex) = queue.pop_front() {
        if vertex == destination {
            break;
        }
        for (adjacent, _) in topology.at(vertex) {
            if visited.insert(adjacent) {
                predecessors.insert(adjacent, vertex);
                queue.push_back(adjacent);
            }
        }
    }
    let vertices = backtrace(&predecessors, source, destination)?;
    Some(Route::new(vertices, Cost::ZERO))
}

fn depth_first(topology: &Topology, source: Vertex, destination: Vertex) -> Option<Route> {
    let mut visited = FxHashSet::default();
    let mut predecessors = FxHashMap::default();
    let mut stack = vec![source];
    while let Some(vertex) = stack.pop() {
        if !visited.insert(vertex) {
            continue;
        }
        if vertex == destination {
            break;
        }
        for (adjacent, _) in topology.at(vertex) {
            if !visited.contains(&adjacent) {
                predecessors.insert(adjacent, vertex);
                stack.push(adjacent);
            }
        }
    }
    let vertices = backtrace(&predecessors, source, destination)?;
    Some(Route::new(vertices, Cost::ZERO))
}

/// Minimum-cost path with a secondary tie-breaker: when two relaxations
/// reach a vertex at equal cost, the one with fewer hops wins.
fn dijkstra(topology: &Topology, source: Vertex, destination: Vertex) -> Option<Route> {
    let mut costs: FxHashMap<Vertex, f64> = FxHashMap::default();
    let mut hops: FxHashMap<Vertex, usize> = FxHashMap::default();
    let mut predecessors: FxHashMap<Vertex, Vertex> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    costs.insert(source, 0.0);
    hops.insert(source, 0);
    heap.push(Reverse((OrderedFloat(0.0), 0usize, source)));
    while let Some(Reverse((OrderedFloat(cost), hop, vertex))) = heap.pop() {
        if vertex == destination {
            break;
        }
        if cost > costs[&vertex] || (cost == costs[&vertex] && hop > hops[&vertex]) {
            continue;
        }
        for (adjacent, weight) in topology.at(vertex) {
            let next_cost = cost + weight.into_f64();
            let next_hops = hop + 1;
            let best_cost = costs.get(&adjacent).copied().unwrap_or(f64::INFINITY);
            let best_hops = hops.get(&adjacent).copied().unwrap_or(usize::MAX);
            if next_cost > best_cost || (next_cost == best_cost && next_hops >= best_hops) {
                continue;
            }
            costs.insert(adjacent, next_cost);
            hops.insert(adjacent, next_hops);
            predecessors.insert(adjacent, vertex);
            heap.push(Reverse((OrderedFloat(next_cost), next_hops, adjacent)));
        }
    }
    let vertices = backtrace(&predecessors, source, destination)?;
    Some(Route::new(vertices, Cost::new(costs[&destination])))
}

/// Up to `k` paths in ascending order of cumulative cost, found by
/// best-first search over partial paths. Revisits are not pruned, so
/// returned paths may contain loops.
pub fn k_shortest(
    topology: &Topology,
    source: Vertex,
    destination: Vertex,
    k: usize,
) -> Vec<Route> {
    let mut routes = Vec::new();
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((OrderedFloat(0.0), vec![source])));
    while routes.len() < k {
        let Some(Reverse((OrderedFloat(cost), vertices))) = heap.pop() else {
            break;
        };
        let &vertex = vertices.last().expect("partial paths are never empty");
        if vertex == destination {
            routes.push(Route::new(vertices, Cost::new(cost)));
            continue;
        }
        for (adjacent, weight) in topology.at(vertex) {
            let mut extended = vertices.clone();
            extended.push(adjacent);
            heap.push(Reverse((OrderedFloat(cost + weight.into_f64()), extended)));
        }
    }
    routes
}

/// Walks predecessor links from the destination back to the source. `None`
/// when the trace never reaches the source (the destination is unreachable).
fn backtrace(
    predecessors: &FxHashMap<Vertex, Vertex>,
    source: Vertex,
    destination: Vertex,
) -> Option<Vec<Vertex>> {
    let mut vertices = vec![destination];
    let mut current = destination;
    while current != source {
        current = *predecessors.get(&current)?;
        vertices.push(current);
    }
    vertices.reverse();
    Some(vertices)
}
