use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mct_thermometry::calibration::AnchorPoint;
use mct_thermometry::config::{AppConfig, ReadingConfig};
use mct_thermometry::instrument::{sample_reading, ReadingHistory, VirtualBridge};
use mct_thermometry::managers::CalibrationManager;
use mct_thermometry::melting_curve::{fixed_point, shared_curve, FIXED_POINTS, P_MIN};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "mct-cli",
    about = "Melting-curve thermometer calibration and conversion"
)]
struct Cli {
    /// JSON configuration file (defaults are used if missing)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the reference dataset path
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Override the fit degree
    #[arg(long)]
    degree: Option<usize>,
    /// Log progress to stderr
    #[arg(long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert capacitances with the base calibration
    Convert {
        /// Capacitance in pF (repeatable)
        #[arg(long = "capacitance", required = true)]
        capacitances: Vec<f64>,
    },
    /// Recalibrate, then convert
    Recalibrate(RecalibrateArgs),
    /// Print the current calibration coefficients
    Coefficients,
    /// Dump the melting-curve grid as tab-separated T (mK) and P (MPa)
    Curve {
        /// Print every Nth grid point
        #[arg(long, default_value_t = 1)]
        every: usize,
    },
    /// List the melting-curve fixed points
    FixedPoints,
    /// Replay capacitances through a virtual bridge
    Simulate {
        #[arg(long = "capacitance", required = true)]
        capacitances: Vec<f64>,
    },
}

#[derive(Args, Debug)]
struct RecalibrateArgs {
    /// Anchor as C,P in pF and MPa (give once or twice)
    #[arg(long = "point", value_parser = parse_anchor)]
    points: Vec<AnchorPoint>,
    /// Anchor at a named fixed point (pmin, a, ab, neel) with --anchor-capacitance
    #[arg(long, conflicts_with = "points", requires = "anchor_capacitance")]
    fixed_point: Option<String>,
    /// Capacitance measured at the fixed point, in pF
    #[arg(long)]
    anchor_capacitance: Option<f64>,
    /// Capacitances to convert after recalibrating (repeatable)
    #[arg(long = "capacitance")]
    capacitances: Vec<f64>,
}

#[derive(Serialize)]
struct Conversion {
    capacitance_pf: f64,
    pressure_low_mpa: f64,
    temperature_low_mk: f64,
    temperature_high_mk: f64,
}

#[derive(Serialize)]
struct RecalibrationReport {
    coefficients: Vec<f64>,
    anchors: Vec<AnchorPoint>,
    conversions: Vec<Conversion>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        mct_thermometry::init_logging();
    }

    let mut config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();
    if let Some(dataset) = cli.dataset {
        config.calibration.dataset_path = dataset;
    }
    if let Some(degree) = cli.degree {
        config.calibration.fit_degree = degree;
    }
    config.validate().context("invalid configuration")?;

    let calibration = config.calibration.clone();
    let load_manager = move || {
        CalibrationManager::new(&calibration).with_context(|| {
            format!(
                "loading reference dataset {}",
                calibration.dataset_path.display()
            )
        })
    };

    match cli.command {
        Commands::FixedPoints => {
            println!("{}", serde_json::to_string_pretty(&FIXED_POINTS)?);
        }
        Commands::Curve { every } => run_curve(every)?,
        Commands::Convert { capacitances } => {
            let manager = load_manager()?;
            let conversions = convert_all(&manager, &capacitances)?;
            println!("{}", serde_json::to_string_pretty(&conversions)?);
        }
        Commands::Recalibrate(args) => run_recalibrate(&load_manager()?, args)?,
        Commands::Coefficients => {
            let manager = load_manager()?;
            println!("{}", serde_json::to_string_pretty(&manager.summary()?)?);
        }
        Commands::Simulate { capacitances } => {
            run_simulate(&load_manager()?, capacitances, &config.reading)?
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_anchor(raw: &str) -> std::result::Result<AnchorPoint, String> {
    let (c, p) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected C,P but got {raw:?}"))?;
    let c = c
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("capacitance {c:?}: {err}"))?;
    let p = p
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("pressure {p:?}: {err}"))?;
    Ok(AnchorPoint::new(c, p))
}

fn convert_all(manager: &CalibrationManager, capacitances: &[f64]) -> Result<Vec<Conversion>> {
    capacitances
        .iter()
        .map(|&c| {
            Ok(Conversion {
                capacitance_pf: c,
                pressure_low_mpa: manager.capacitance_to_pressure_low(c)?,
                temperature_low_mk: manager.capacitance_to_temperature_low(c)?,
                temperature_high_mk: manager.capacitance_to_temperature_high(c)?,
            })
        })
        .collect()
}

fn run_recalibrate(manager: &CalibrationManager, args: RecalibrateArgs) -> Result<()> {
    let anchors = match args.fixed_point {
        Some(name) => {
            let fp = fixed_point(&name).with_context(|| format!("unknown fixed point {name:?}"))?;
            let capacitance = args
                .anchor_capacitance
                .unwrap_or_else(|| manager.default_pmin_capacitance());
            vec![AnchorPoint::new(capacitance, fp.pressure_mpa)]
        }
        None if args.points.is_empty() => {
            vec![AnchorPoint::new(
                args.anchor_capacitance
                    .unwrap_or_else(|| manager.default_pmin_capacitance()),
                P_MIN.pressure_mpa,
            )]
        }
        None => args.points,
    };
    if anchors.len() > 2 {
        bail!("at most two --point anchors are allowed, got {}", anchors.len());
    }

    let coefficients = manager.recalibrate(&anchors).context("recalibration failed")?;
    let report = RecalibrationReport {
        coefficients,
        anchors,
        conversions: convert_all(manager, &args.capacitances)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_curve(every: usize) -> Result<()> {
    if every == 0 {
        bail!("--every must be at least 1");
    }
    let curve = shared_curve();
    println!("T_mK\tP_MPa");
    for (t, p) in curve
        .temperatures_k()
        .iter()
        .zip(curve.pressures_mpa())
        .step_by(every)
    {
        println!("{:.6}\t{:.6}", t * 1e3, p);
    }
    Ok(())
}

fn run_simulate(
    manager: &CalibrationManager,
    capacitances: Vec<f64>,
    reading: &ReadingConfig,
) -> Result<()> {
    let count = capacitances.len();
    let interval = Duration::from_millis(reading.poll_interval_ms);
    let mut bridge = VirtualBridge::new(capacitances, 0.0);
    let mut history = ReadingHistory::new(reading.history_capacity);
    for sample in 0..count {
        if sample > 0 {
            thread::sleep(interval);
        }
        let reading = sample_reading(&mut bridge, manager)?;
        println!("{}", serde_json::to_string(&reading)?);
        history.push(reading);
    }
    if let Some(latest) = history.latest() {
        log::info!(
            "[Simulate] {} readings, last T_low = {:.3} mK",
            history.len(),
            latest.temperature_low_mk
        );
    }
    Ok(())
}
