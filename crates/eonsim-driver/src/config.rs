//! The on-disk JSON configuration and its translation into validated
//! simulation settings.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use eonsim_core::modulation::{ModulationFormat, ModulationKind};
use eonsim_core::network::topology::{Topology, TopologyError};
use eonsim_core::request::RequestType;
use eonsim_core::settings::Settings;
use eonsim_core::spectrum::SpectrumAllocator;
use eonsim_core::units::{Cost, Fsus};

/// Where the configuration lives when the command line names none.
pub const DEFAULT_CONFIG_PATH: &str = "resources/configuration/configuration.json";

/// The configuration file schema. Field names are kebab-case on disk.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Gate for informational log lines.
    pub enable_logging: bool,
    /// When `false`, a per-iteration dataset CSV is written next to the
    /// report.
    pub export_dataset: bool,
    pub params: Params,
    /// The modulation table: spectral efficiency per modulation name.
    pub modulation: Vec<ModulationEntry>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Params {
    /// Discard statistics from the first 10% of the simulated time.
    pub ignore_first: bool,
    /// Minimum simulated-time gap between snapshots.
    pub sampling_time: u64,
    /// Simulated time units per iteration.
    pub simulation_duration: f64,
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub iterations: u32,
    /// Full spectrum per link, GHz.
    pub spectrum_width: f64,
    /// One slot, GHz; with `spectrum-width` this yields the slots per link.
    pub slot_width: f64,
    #[serde(default)]
    pub modulation: ModulationKind,
    /// Path to the adjacency-matrix topology file.
    pub topology: PathBuf,
    pub requests: Vec<RequestEntry>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestEntry {
    #[serde(rename = "type")]
    pub name: String,
    /// A name from the modulation table.
    pub modulation: String,
    /// Demanded bandwidth, GHz.
    pub bandwidth: f64,
    pub allocator: SpectrumAllocator,
    /// Relative weight in the traffic mix.
    pub ratio: f64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModulationEntry {
    #[serde(rename = "type")]
    pub name: String,
    pub bits_per_symbol: u64,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().into(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Resolves the schema into kernel settings: derives the slot count per
    /// link, computes every request type's FSU demand through the selected
    /// modulation, and reads the topology file.
    ///
    /// Adaptive modulations are fed the infinite worst-case distance, since
    /// the configuration carries no per-request distances.
    pub fn to_settings(&self, service_rate_override: Option<f64>) -> Result<Settings, ConfigError> {
        if !(self.params.slot_width > 0.0) {
            return Err(ConfigError::NonPositiveSlotWidth(self.params.slot_width));
        }
        let fsus_per_link = Fsus::new((self.params.spectrum_width / self.params.slot_width) as u64);
        let efficiencies = self
            .modulation
            .iter()
            .map(|entry| (entry.name.as_str(), entry.bits_per_symbol))
            .collect::<HashMap<_, _>>();
        let request_types = self
            .params
            .requests
            .iter()
            .map(|entry| {
                let efficiency = *efficiencies
                    .get(entry.modulation.as_str())
                    .ok_or_else(|| ConfigError::UnknownModulation(entry.modulation.clone()))?;
                let format = ModulationFormat::from_kind(
                    self.params.modulation,
                    self.params.slot_width,
                    efficiency,
                );
                let fsus = match self.params.modulation {
                    ModulationKind::Passband => format.demand(entry.bandwidth),
                    _ => format.demand(Cost::INFINITE.into_f64()),
                };
                Ok(RequestType::new(
                    entry.name.clone(),
                    entry.modulation.clone(),
                    entry.allocator,
                    entry.bandwidth,
                    entry.ratio,
                    fsus,
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let matrix =
            fs::read_to_string(&self.params.topology).map_err(|source| ConfigError::Read {
                path: self.params.topology.clone(),
                source,
            })?;
        let topology = Topology::from_adjacency_matrix(&matrix)?;
        Ok(Settings::builder()
            .topology(topology)
            .fsus_per_link(fsus_per_link)
            .time_units(self.params.simulation_duration)
            .arrival_rate(self.params.arrival_rate)
            .service_rate(service_rate_override.unwrap_or(self.params.service_rate))
            .sampling_time(self.params.sampling_time as f64)
            .ignore_first(self.params.ignore_first)
            .request_types(request_types)
            .build())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration or topology file cannot be read.
    #[error("cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or misses required keys.
    #[error("malformed configuration")]
    Json(#[from] serde_json::Error),

    /// The slot width would divide by zero.
    #[error("slot width must be positive (got {0})")]
    NonPositiveSlotWidth(f64),

    /// A request names a modulation absent from the modulation table.
    #[error("request references unknown modulation `{0}`")]
    UnknownModulation(String),

    /// The topology file is malformed.
    #[error("malformed topology file")]
    Topology(#[from] TopologyError),
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn sample(topology_path: &str) -> String {
        format!(
            r#"{{
                "enable-logging": false,
                "export-dataset": true,
                "params": {{
                    "ignore-first": true,
                    "sampling-time": 2,
                    "simulation-duration": 100.0,
                    "arrival-rate": 3.0,
                    "service-rate": 1.0,
                    "iterations": 2,
                    "spectrum-width": 5000.0,
                    "slot-width": 12.5,
                    "topology": "{topology_path}",
                    "requests": [
                        {{ "type": "100G", "modulation": "16-QAM", "bandwidth": 100.0, "allocator": "first-fit", "ratio": 0.6 }},
                        {{ "type": "400G", "modulation": "64-QAM", "bandwidth": 400.0, "allocator": "best-fit", "ratio": 0.4 }}
                    ]
                }},
                "modulation": [
                    {{ "type": "16-QAM", "bits-per-symbol": 4 }},
                    {{ "type": "64-QAM", "bits-per-symbol": 6 }}
                ]
            }}"#
        )
    }

    fn write_topology() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "2\n0 1\n1 0\n").unwrap();
        file
    }

    #[test]
    fn parses_kebab_case_keys() {
        let config: Config = serde_json::from_str(&sample("unused")).unwrap();
        assert!(!config.enable_logging);
        assert!(config.export_dataset);
        assert!(config.params.ignore_first);
        assert_eq!(config.params.iterations, 2);
        assert_eq!(config.params.modulation, ModulationKind::Passband);
        assert_eq!(config.params.requests.len(), 2);
        assert_eq!(
            config.params.requests[0].allocator,
            SpectrumAllocator::FirstFit
        );
        assert_eq!(
            config.params.requests[1].allocator,
            SpectrumAllocator::BestFit
        );
    }

    #[test]
    fn settings_derive_slot_counts_and_demands() {
        let topology = write_topology();
        let text = sample(topology.path().to_str().unwrap());
        let config: Config = serde_json::from_str(&text).unwrap();
        let settings = config.to_settings(None).unwrap();
        assert_eq!(settings.fsus_per_link, Fsus::new(400));
        // 100 GHz over 4 bit/s/Hz at 12.5 GHz slots → 2 slots; 400 over 6 → 6.
        assert_eq!(settings.request_types[0].fsus, Fsus::new(2));
        assert_eq!(settings.request_types[1].fsus, Fsus::new(6));
        assert_eq!(settings.topology.size(), 2);
        assert_eq!(settings.service_rate, 1.0);
    }

    #[test]
    fn service_rate_override_wins() {
        let topology = write_topology();
        let text = sample(topology.path().to_str().unwrap());
        let config: Config = serde_json::from_str(&text).unwrap();
        let settings = config.to_settings(Some(7.5)).unwrap();
        assert_eq!(settings.service_rate, 7.5);
    }

    #[test]
    fn unknown_modulation_is_rejected() {
        let topology = write_topology();
        let text = sample(topology.path().to_str().unwrap())
            .replace("\"16-QAM\", \"bandwidth\"", "\"QPSK\", \"bandwidth\"");
        let config: Config = serde_json::from_str(&text).unwrap();
        assert!(matches!(
            config.to_settings(None),
            Err(ConfigError::UnknownModulation(_))
        ));
    }

    #[test]
    fn missing_keys_are_rejected() {
        let text = sample("unused").replace("\"arrival-rate\": 3.0,", "");
        assert!(serde_json::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn unknown_allocator_is_rejected() {
        let text = sample("unused").replace("first-fit", "perfect-fit");
        assert!(serde_json::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn missing_topology_file_is_rejected() {
        let config: Config =
            serde_json::from_str(&sample("/nonexistent/topology.txt")).unwrap();
        assert!(matches!(
            config.to_settings(None),
            Err(ConfigError::Read { .. })
        ));
    }
}
