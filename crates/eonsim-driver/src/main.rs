use std::path::PathBuf;

use clap::Parser;

use eonsim_driver::config::{Config, DEFAULT_CONFIG_PATH};

/// Dynamic routing and spectrum assignment simulator for elastic optical
/// networks.
#[derive(Parser, Debug)]
#[command(author, version, about, allow_missing_positional = true)]
struct Args {
    /// Overrides the configuration's service rate
    service_rate: Option<f64>,

    /// Path to the configuration JSON
    config: Option<PathBuf>,

    /// Directory receiving per-iteration reports and datasets
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)?;
    init_logging(config.enable_logging);
    eonsim_driver::run(&config, args.service_rate, &args.output_dir)?;
    Ok(())
}

/// The `enable-logging` gate sets the default level; `RUST_LOG` still wins
/// when present.
fn init_logging(enabled: bool) {
    let level = if enabled {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
