//! Configuration loading, report rendering, and the iteration loop that
//! drives the simulation kernel.

pub mod config;
pub mod report;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use eonsim_core::kernel::{Kernel, KernelError};
use log::info;

use crate::config::{Config, ConfigError};

/// Runs every configured iteration, writing `NN_report.txt` (and, when
/// dataset export is on, `NN_dataset.csv`) into `output_dir`.
pub fn run(
    config: &Config,
    service_rate_override: Option<f64>,
    output_dir: impl AsRef<Path>,
) -> Result<(), Error> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir).map_err(|source| Error::CreateDir {
        path: output_dir.into(),
        source,
    })?;
    let settings = config.to_settings(service_rate_override)?;
    let mut kernel = Kernel::new(settings)?;
    for iteration in 1..=config.params.iterations {
        info!("running iteration {iteration}");
        let started = Instant::now();
        kernel.run();
        let elapsed_secs = started.elapsed().as_secs_f64();
        info!("ended iteration {iteration}");
        let report = report::render_report(config, &kernel, iteration, elapsed_secs);
        let report_path = output_dir.join(format!("{iteration:02}_report.txt"));
        report::write_report(&report_path, &report).map_err(|source| Error::Write {
            path: report_path,
            source,
        })?;
        if !config.export_dataset {
            let dataset_path = output_dir.join(format!("{iteration:02}_dataset.csv"));
            report::write_dataset(&dataset_path, kernel.snapshots())?;
        }
        kernel.reset()?;
    }
    Ok(())
}

/// Driver error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up the simulation")]
    Kernel(#[from] KernelError),

    #[error("cannot create output directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot export dataset")]
    Dataset(#[from] csv::Error),
}
