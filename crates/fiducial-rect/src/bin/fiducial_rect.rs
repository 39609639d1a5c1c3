use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use fiducial_rect::io::{self, MeasureConfig, MeasureReport};
use fiducial_rect::OffsetModel;

#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
use log::{info, warn};

#[cfg(not(feature = "tracing"))]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[cfg(not(feature = "tracing"))]
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fiducial-rect",
    version,
    about = "Measure rectangles framed by four fiducial markers"
)]
struct Cli {
    /// JSON file with detected markers: [{"id": 3, "corners": [[x, y], ...]}, ...].
    #[arg(required_unless_present = "config")]
    detections: Option<PathBuf>,

    /// Targets as a JSON array of four-id arrays, e.g. '[[1, 2, 3, 4]]'.
    #[arg(long, required_unless_present = "config")]
    targets: Option<String>,

    /// JSON job config (detections_path, targets, params, output_path).
    #[arg(long, conflicts_with_all = ["detections", "targets"])]
    config: Option<PathBuf>,

    /// Printed marker edge length in millimetres.
    #[arg(long, allow_hyphen_values = true)]
    marker_size_mm: Option<f64>,

    /// Distance from marker edge to rectangle edge in millimetres.
    #[arg(long, allow_hyphen_values = true)]
    offset_mm: Option<f64>,

    #[arg(long, value_enum)]
    offset_model: Option<OffsetModel>,

    /// Write JSON here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Emit the full report (outcomes, detected ids) instead of the bare response.
    #[arg(long)]
    report: bool,

    #[cfg(not(feature = "tracing"))]
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit JSON-formatted tracing events.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_log: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    if let Err(err) = fiducial_rect::core::init_with_level(cli.log_level.into()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    #[cfg(feature = "tracing")]
    fiducial_rect::core::init_tracing(cli.json_log);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(cli)))]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (mut cfg, config_path) = load_config(&cli)?;
    apply_overrides(&mut cfg, &cli);

    let measurer = cfg.build_measurer()?;
    let base_dir = config_path.as_deref().and_then(Path::parent);
    let detected = cfg.load_detections(base_dir)?;
    info!(
        "loaded {} markers from {}",
        detected.len(),
        cfg.detections_path
    );

    let resolution = measurer.resolve_report(&detected, &cfg.targets);
    if resolution.resolved() < cfg.targets.len() {
        warn!(
            "resolved {} of {} targets",
            resolution.resolved(),
            cfg.targets.len()
        );
    }

    let json = if cli.report {
        let mut report = MeasureReport::new(&cfg, config_path.as_deref(), &detected);
        report.set_resolution(resolution);
        serde_json::to_string_pretty(&report)?
    } else {
        io::response_json(&resolution.results)?
    };

    match cli.output.or_else(|| cfg.output_path(base_dir)) {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, json)?;
            info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<(MeasureConfig, Option<PathBuf>), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.config {
        return Ok((MeasureConfig::load_json(path)?, Some(path.clone())));
    }

    let (Some(detections), Some(targets)) = (&cli.detections, &cli.targets) else {
        return Err("either --config or DETECTIONS with --targets is required".into());
    };
    let cfg = MeasureConfig {
        detections_path: detections.to_string_lossy().into_owned(),
        targets: io::parse_targets(targets)?,
        params: Default::default(),
        output_path: None,
    };
    Ok((cfg, None))
}

fn apply_overrides(cfg: &mut MeasureConfig, cli: &Cli) {
    if let Some(marker_size_mm) = cli.marker_size_mm {
        cfg.params.marker_size_mm = marker_size_mm;
    }
    if let Some(offset_mm) = cli.offset_mm {
        cfg.params.offset_mm = offset_mm;
    }
    if let Some(offset_model) = cli.offset_model {
        cfg.params.offset_model = offset_model;
    }
}
