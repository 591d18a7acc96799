//! Per-iteration report rendering and dataset export.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use chrono::Local;
use eonsim_core::kernel::Kernel;
use eonsim_core::stats::Statistics;

use crate::config::Config;

/// Renders the human-readable key-value report for one finished iteration.
pub fn render_report(config: &Config, kernel: &Kernel, iteration: u32, elapsed_secs: f64) -> String {
    let settings = kernel.settings();
    let statistics = kernel.statistics();
    let total_requests = statistics.total_requests as f64;
    let fsus_per_link = settings.fsus_per_link.into_f64();
    let mut out = String::new();
    let _ = writeln!(out, "created at: {}", Local::now().format("%d/%m/%Y %Hh%M"));
    let _ = writeln!(out, "seed: {}", kernel.seed());
    let _ = writeln!(out, "simulated time: {:.3}", statistics.time);
    let _ = writeln!(
        out,
        "spectrum width (GHz): {:.2}",
        config.params.spectrum_width
    );
    let _ = writeln!(out, "slot width (GHz): {:.2}", config.params.slot_width);
    let _ = writeln!(out, "fsus per link: {}", settings.fsus_per_link);
    let _ = writeln!(
        out,
        "load (E): {:.3}",
        settings.arrival_rate / settings.service_rate
    );
    let _ = writeln!(out, "arrival rate: {:.3}", settings.arrival_rate);
    let _ = writeln!(out, "service rate: {:.3}", settings.service_rate);
    let _ = writeln!(
        out,
        "grade of service: {:.3}",
        statistics.grade_of_service()
    );
    let _ = writeln!(out, "total requests: {}", statistics.total_requests);
    for ty in &settings.request_types {
        let _ = writeln!(out, "requests for {} FSU(s)", ty.fsus);
        let _ = writeln!(out, "ratio: {:.3}", ty.counting as f64 / total_requests);
        let _ = writeln!(
            out,
            "grade of service: {:.3}",
            ty.blocking as f64 / total_requests
        );
        let _ = writeln!(
            out,
            "normalized load: {:.3}",
            settings.arrival_rate * (ty.fsus.into_f64() / fsus_per_link)
        );
    }
    let _ = writeln!(out, "iteration: {iteration}");
    let _ = writeln!(out, "execution time (s): {elapsed_secs:.6}");
    out
}

pub fn write_report(path: impl AsRef<Path>, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

// One CSV row per snapshot; the header comes from the field names.
#[derive(Debug, serde::Serialize)]
struct DatasetRow {
    time: f64,
    absolute_fragmentation: f64,
    entropy: f64,
    external_fragmentation: f64,
    grade_of_service: f64,
    slot_blocking_probability: f64,
    active_requests: u64,
}

impl From<&Statistics> for DatasetRow {
    fn from(snapshot: &Statistics) -> Self {
        Self {
            time: snapshot.time,
            absolute_fragmentation: snapshot.absolute_fragmentation,
            entropy: snapshot.entropy_fragmentation,
            external_fragmentation: snapshot.external_fragmentation,
            grade_of_service: snapshot.grade_of_service(),
            slot_blocking_probability: snapshot.slot_blocking_probability(),
            active_requests: snapshot.active_requests,
        }
    }
}

/// Writes the snapshot dataset of one iteration as CSV.
pub fn write_dataset(path: impl AsRef<Path>, snapshots: &[Statistics]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for snapshot in snapshots {
        writer.serialize(DatasetRow::from(snapshot))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use eonsim_core::units::Fsus;

    use super::*;

    fn snapshot(time: f64) -> Statistics {
        Statistics {
            time,
            absolute_fragmentation: 0.5,
            entropy_fragmentation: 0.25,
            external_fragmentation: 0.75,
            active_requests: 3,
            total_fsus_requested: Fsus::new(20),
            total_fsus_blocked: Fsus::new(5),
            total_requests: 10,
            total_requests_blocked: 2,
        }
    }

    #[test]
    fn dataset_has_one_row_per_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01_dataset.csv");
        write_dataset(&path, &[snapshot(1.0), snapshot(3.5)]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some(
                "time,absolute_fragmentation,entropy,external_fragmentation,\
                 grade_of_service,slot_blocking_probability,active_requests"
            )
        );
        assert_eq!(lines.next(), Some("1.0,0.5,0.25,0.75,0.2,0.25,3"));
        assert_eq!(lines.next(), Some("3.5,0.5,0.25,0.75,0.2,0.25,3"));
        assert_eq!(lines.next(), None);
    }
}
