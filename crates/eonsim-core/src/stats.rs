//! Running statistics and the snapshots sampled over simulated time.

use crate::units::Fsus;

/// The kernel's running counters and the fragmentation values of the most
/// recent sample. Snapshots are plain copies of this struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub time: f64,
    pub absolute_fragmentation: f64,
    pub entropy_fragmentation: f64,
    pub external_fragmentation: f64,
    pub active_requests: u64,
    pub total_fsus_requested: Fsus,
    pub total_fsus_blocked: Fsus,
    pub total_requests: u64,
    pub total_requests_blocked: u64,
}

impl Statistics {
    /// Ratio of blocked requests to scheduled requests; zero before any
    /// request has been scheduled.
    pub fn grade_of_service(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_requests_blocked as f64 / self.total_requests as f64
    }

    /// Ratio of blocked FSU demand to scheduled FSU demand; zero before any
    /// demand has been scheduled.
    pub fn slot_blocking_probability(&self) -> f64 {
        if self.total_fsus_requested == Fsus::ZERO {
            return 0.0;
        }
        self.total_fsus_blocked.into_f64() / self.total_fsus_requested.into_f64()
    }
}
