//! Validated simulation settings.

use crate::network::topology::Topology;
use crate::request::RequestType;
use crate::units::Fsus;

/// Everything one simulation needs: the topology, the traffic mix, load
/// parameters, and sampling controls. Construct with the builder; the
/// kernel validates on construction.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct Settings {
    pub topology: Topology,
    /// Slots per link; also the cap on concurrently active requests.
    pub fsus_per_link: Fsus,
    /// Total simulated time per iteration.
    pub time_units: f64,
    /// Rate of the exponential inter-arrival stream.
    pub arrival_rate: f64,
    /// Rate of the exponential service-time stream.
    pub service_rate: f64,
    /// Minimum simulated-time gap between statistics snapshots.
    pub sampling_time: f64,
    /// Discard statistics accumulated in the first 10% of `time_units`.
    #[builder(default)]
    pub ignore_first: bool,
    /// The traffic mix; draw weights come from each type's `ratio`.
    pub request_types: Vec<RequestType>,
    /// Fixed PRNG seed for reproducible runs; drawn from entropy when unset.
    #[builder(default)]
    pub seed: Option<u64>,
}

impl Settings {
    /// The smallest FSU demand across request types, used as the entropy
    /// metric's minimum-width threshold.
    pub fn min_fsus(&self) -> Fsus {
        self.request_types
            .iter()
            .map(|ty| ty.fsus)
            .min()
            .unwrap_or(Fsus::ONE)
    }

    /// Checks the properties the kernel relies on.
    ///
    /// Correctness properties:
    ///
    /// - Durations and rates must be positive and finite.
    /// - Links must carry at least one slot.
    /// - The topology must offer at least two vertices and one edge.
    /// - At least one request type must exist, none may demand zero slots,
    ///   and the draw weights must include a positive entry.
    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        if !(self.time_units > 0.0) || !self.time_units.is_finite() {
            return Err(SettingsError::NonPositiveDuration(self.time_units));
        }
        if !(self.arrival_rate > 0.0) || !self.arrival_rate.is_finite() {
            return Err(SettingsError::NonPositiveArrival(self.arrival_rate));
        }
        if !(self.service_rate > 0.0) || !self.service_rate.is_finite() {
            return Err(SettingsError::NonPositiveService(self.service_rate));
        }
        if self.sampling_time < 0.0 {
            return Err(SettingsError::NegativeSampling(self.sampling_time));
        }
        if self.fsus_per_link == Fsus::ZERO {
            return Err(SettingsError::NoSlots);
        }
        if self.topology.size() < 2 {
            return Err(SettingsError::TooFewVertices(self.topology.size()));
        }
        if self.topology.edges().next().is_none() {
            return Err(SettingsError::NoLinks);
        }
        if self.request_types.is_empty() {
            return Err(SettingsError::NoRequestTypes);
        }
        for ty in &self.request_types {
            if ty.fsus == Fsus::ZERO {
                return Err(SettingsError::ZeroDemand(ty.name.clone()));
            }
        }
        if !self.request_types.iter().any(|ty| ty.ratio > 0.0) {
            return Err(SettingsError::ZeroRatios);
        }
        Ok(())
    }
}

/// Simulation settings error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The simulated duration is not a positive finite number.
    #[error("simulation duration must be positive (got {0})")]
    NonPositiveDuration(f64),

    /// The arrival rate is not a positive finite number.
    #[error("arrival rate must be positive (got {0})")]
    NonPositiveArrival(f64),

    /// The service rate is not a positive finite number.
    #[error("service rate must be positive (got {0})")]
    NonPositiveService(f64),

    /// The sampling gap is negative.
    #[error("sampling time must be non-negative (got {0})")]
    NegativeSampling(f64),

    /// Links would carry no slots.
    #[error("links must carry at least one slot")]
    NoSlots,

    /// Random endpoint pairs need at least two vertices.
    #[error("at least two vertices are required (got {0})")]
    TooFewVertices(usize),

    /// The topology has no edges to carry traffic.
    #[error("the topology has no links")]
    NoLinks,

    /// No traffic was configured.
    #[error("no request types configured")]
    NoRequestTypes,

    /// A request type demands zero slots.
    #[error("request type `{0}` demands zero slots")]
    ZeroDemand(String),

    /// Every draw weight is zero.
    #[error("request type ratios must include a positive weight")]
    ZeroRatios,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn canned_settings_validate() {
        let settings = testing::two_node_settings(1.0, 2.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_duration_fails() {
        let mut settings = testing::two_node_settings(1.0, 2.0);
        settings.time_units = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NonPositiveDuration(_))
        ));
    }

    #[test]
    fn empty_mix_fails() {
        let mut settings = testing::two_node_settings(1.0, 2.0);
        settings.request_types.clear();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NoRequestTypes)
        ));
    }

    #[test]
    fn zero_ratios_fail() {
        let mut settings = testing::two_node_settings(1.0, 2.0);
        for ty in &mut settings.request_types {
            ty.ratio = 0.0;
        }
        assert!(matches!(settings.validate(), Err(SettingsError::ZeroRatios)));
    }

    #[test]
    fn min_fsus_takes_the_smallest_demand() {
        let settings = testing::two_node_settings(1.0, 2.0);
        assert_eq!(settings.min_fsus(), Fsus::new(2));
    }
}
