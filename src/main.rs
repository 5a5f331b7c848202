//! Bench-side PID tuning tool.
//!
//! Usage:
//!   pid-analyzer [--config FILE] <COMMAND>
//!
//! Examples:
//!   # Pull Air Temp telemetry out of a controller log
//!   pid-analyzer extract --log bench.log --mode "air temp" --setpoint 37 --out-dir data
//!
//!   # Score one experiment and append it to the table
//!   pid-analyzer analyze --samples data/Data_monitor1.parquet --kp 2 --ki 0.1 --kd 0.5
//!
//!   # Recommend gains once three or more experiments are recorded
//!   pid-analyzer tune --table experiments.parquet --out tuning_result.txt

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pid_analyzer::config::TunerConfig;
use pid_analyzer::experiment::{ExperimentResult, Gains};
use pid_analyzer::extract::OperatingMode;
use pid_analyzer::input;
use pid_analyzer::sequence::FileSequence;
use pid_analyzer::storage;
use pid_analyzer::TuningSession;

#[derive(Parser)]
#[command(name = "pid-analyzer")]
#[command(about = "Step-response analysis and PID gain recommendation")]
#[command(version)]
struct Args {
    /// JSON configuration file (analyzer and forest sections, all optional)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Override the sampling interval (time units between samples)
    #[arg(long, global = true)]
    sampling_interval: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract one mode's samples from a log and export them as Parquet
    Extract {
        /// Controller log file
        #[arg(short = 'l', long)]
        log: PathBuf,

        /// Operating mode (Air Temp, Baby, Humidity)
        #[arg(short = 'm', long)]
        mode: String,

        /// Setpoint the experiment targeted
        #[arg(short = 's', long)]
        setpoint: String,

        /// Directory receiving Data_monitor{n}.parquet
        #[arg(short = 'o', long, default_value = ".")]
        out_dir: PathBuf,

        /// Counter file numbering exports (default: <out-dir>/log_counter.txt)
        #[arg(long)]
        counter: Option<PathBuf>,
    },

    /// Compute step-response metrics and append them to the experiment table
    Analyze {
        /// Sample table written by `extract`
        #[arg(long)]
        samples: PathBuf,

        /// Proportional gain used in the experiment
        #[arg(long)]
        kp: String,

        /// Integral gain used in the experiment
        #[arg(long)]
        ki: String,

        /// Derivative gain used in the experiment
        #[arg(long)]
        kd: String,

        /// Experiment table (created when absent)
        #[arg(short = 't', long, default_value = "experiments.parquet")]
        table: PathBuf,
    },

    /// Delete one record from the experiment table
    Remove {
        /// Experiment table
        #[arg(short = 't', long, default_value = "experiments.parquet")]
        table: PathBuf,

        /// Zero-based record index
        #[arg(short = 'i', long)]
        index: usize,
    },

    /// Train on the experiment table and write recommended gains
    Tune {
        /// Experiment table
        #[arg(short = 't', long, default_value = "experiments.parquet")]
        table: PathBuf,

        /// Tuning result file
        #[arg(short = 'o', long, default_value = "tuning_result.txt")]
        out: PathBuf,
    },
}

fn load_config(args: &Args) -> anyhow::Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(raw) = &args.sampling_interval {
        config.analyzer.sampling_interval = input::parse_sampling_interval(raw)?;
    }
    Ok(config)
}

fn load_table(path: &Path) -> anyhow::Result<Vec<ExperimentResult>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    storage::read_experiments_parquet(path)
        .with_context(|| format!("reading experiment table {}", path.display()))
}

/// Session over the records already in `table`
fn session_with_table(config: TunerConfig, table: &Path) -> anyhow::Result<TuningSession> {
    let mut session = TuningSession::builder().config(config).build()?;
    session.dataset_mut().extend(load_table(table)?);
    tracing::debug!(
        records = session.dataset().len(),
        table = %table.display(),
        "loaded experiment table"
    );
    Ok(session)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = load_config(&args)?;

    match args.command {
        Command::Extract {
            log,
            mode,
            setpoint,
            out_dir,
            counter,
        } => {
            let mode: OperatingMode = mode.parse()?;
            let setpoint = input::parse_scalar("setpoint", &setpoint)?;
            let counter = counter.unwrap_or_else(|| out_dir.join("log_counter.txt"));

            let mut session = TuningSession::builder()
                .config(config)
                .sequence(FileSequence::new(counter))
                .build()?;

            let text = std::fs::read(&log)
                .with_context(|| format!("reading log {}", log.display()))?;
            let extraction = session.extract(&String::from_utf8_lossy(&text), mode, setpoint)?;
            let path = session.export_samples(&out_dir, extraction.samples())?;

            println!(
                "{} samples ({mode}) from {} lines -> {}",
                extraction.samples().len(),
                extraction.lines_scanned(),
                path.display()
            );
        }

        Command::Analyze {
            samples,
            kp,
            ki,
            kd,
            table,
        } => {
            let gains = Gains::parse(&kp, &ki, &kd)?;
            let samples = storage::read_samples_parquet(&samples)
                .with_context(|| format!("reading samples {}", samples.display()))?;

            let mut session = session_with_table(config, &table)?;
            let result = session.record(&samples, gains)?;
            storage::write_experiments_parquet(&table, session.dataset().snapshot())?;

            let metrics = result.metrics();
            println!("Rise time:          {:.3}", metrics.rise_time);
            println!("Settling time:      {:.3}", metrics.settling_time);
            println!("Overshoot:          {:.3}%", metrics.overshoot);
            println!("Steady-state error: {:.3}", metrics.steady_state_error);
            println!(
                "Recorded experiment #{} in {}",
                session.dataset().len(),
                table.display()
            );
        }

        Command::Remove { table, index } => {
            let mut session = session_with_table(config, &table)?;
            let removed = session.remove_at(index)?;
            storage::write_experiments_parquet(&table, session.dataset().snapshot())?;

            tracing::info!(index, remaining = session.dataset().len(), "removed record");
            println!(
                "Removed record {index} (Kp {}, Ki {}, Kd {})",
                removed.kp(),
                removed.ki(),
                removed.kd()
            );
        }

        Command::Tune { table, out } => {
            let session = session_with_table(config, &table)?;
            let recommendation = session.recommend()?;
            storage::write_tuning_result(&out, &recommendation)?;

            print!("{recommendation}");
        }
    }

    Ok(())
}
