//! Time-ordered simulation events.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Arrival,
    Departure,
}

/// An arrival or departure at a point in simulated time, carrying the
/// request it concerns.
#[derive(Debug, Clone)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
    pub request: Request,
}

impl Event {
    pub fn arrival(time: f64, request: Request) -> Self {
        Self {
            time,
            kind: EventKind::Arrival,
            request,
        }
    }

    pub fn departure(time: f64, request: Request) -> Self {
        Self {
            time,
            kind: EventKind::Departure,
            request,
        }
    }
}

// Heap entry ordered by time alone, inverted so the binary max-heap pops
// the earliest event first.
#[derive(Debug)]
struct QueuedEvent(Event);

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.time == other.0.time
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(other.0.time).cmp(&OrderedFloat(self.0.time))
    }
}

/// Pending arrivals and departures in ascending order of simulated time.
///
/// Events with identical timestamps pop in unspecified order; nothing may
/// depend on the tie-break.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<QueuedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.heap.push(QueuedEvent(event));
    }

    /// The earliest pending event.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|queued| &queued.0)
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|queued| queued.0)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
