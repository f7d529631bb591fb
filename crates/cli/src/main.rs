//! # demandlens
//!
//! One-shot command line runs of the demand pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use demandlens_infra::{run_forecast_pipeline, PipelineConfig};
use demandlens_observability::LogFormat;

#[derive(Parser)]
#[command(name = "demandlens")]
#[command(about = "Demand spike detection, forecasting and replenishment", long_about = None)]
struct Cli {
    /// Log line format (json, pretty)
    #[arg(long, global = true, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a sales and an inventory table
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Sales table (CSV)
    #[arg(short, long)]
    sales: PathBuf,

    /// Inventory parameter table (CSV)
    #[arg(short, long)]
    inventory: PathBuf,

    /// Directory the four output tables are written to
    #[arg(short, long, default_value = "ml_outputs")]
    output_dir: PathBuf,

    /// Residual z-score above which a bucket is a spike candidate
    #[arg(long)]
    z_threshold: Option<f64>,

    /// Multiplier from forecast demand to suggested stock
    #[arg(long)]
    safety_factor: Option<f64>,

    /// Service level for inventory rows that leave it blank
    #[arg(long)]
    service_level: Option<f64>,

    /// Forecast horizon in hours
    #[arg(long)]
    horizon: Option<usize>,

    /// Worker threads for per-group analysis
    #[arg(long)]
    workers: Option<usize>,
}

impl RunArgs {
    /// Environment/defaults first, then any flag given on the command line.
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env().context("invalid DEMANDLENS_* setting")?;
        if let Some(z) = self.z_threshold {
            config = config.with_z_threshold(z);
        }
        if let Some(f) = self.safety_factor {
            config = config.with_safety_factor(f);
        }
        if let Some(s) = self.service_level {
            config = config.with_default_service_level(s);
        }
        if let Some(h) = self.horizon {
            config = config.with_forecast_horizon(h);
        }
        if let Some(w) = self.workers {
            config = config.with_workers(w);
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.pipeline_config()?;
    let result = run_forecast_pipeline(&args.sales, &args.inventory, &args.output_dir, &config)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    demandlens_observability::init_with(cli.log_format);

    let outcome = match &cli.command {
        Commands::Run(args) => run(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
