use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use ganglioside_analyzer::{
    AnalysisConfig, AnalysisResult, DataType, Error, analyze_dataframe, result_to_dataframe,
};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Classifies the gangliosides of an LC-MS/MS run as valid, outliers, or undetermined
///
/// Settings are layered: built-in defaults, then `--config`, then `GANGLIOSIDE_*` environment variables, then the flags
/// below.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// A CSV file with the columns: Name, RT, Volume, Log P, and Anchor
    input: PathBuf,
    /// Where to write the classified compounds as CSV (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Where to write the run statistics and regression models as JSON
    #[arg(short, long)]
    summary: Option<PathBuf>,
    /// A TOML file of analysis settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
    /// Log every model and comparison that's made
    #[arg(short, long)]
    verbose: bool,
    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(clap::Args, Serialize, Debug)]
struct ConfigOverrides {
    /// The R² a retention model must reach to be accepted
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    r2_threshold: Option<f64>,
    /// The |standardized residual| above which a compound is an outlier
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    outlier_threshold: Option<f64>,
    /// The largest retention time gap (in minutes) within a cluster of fragments
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    rt_tolerance: Option<f64>,
    /// The fewest anchors a model can be cross-validated with
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_anchors_for_cv: Option<usize>,
    /// A floor on the residual standard deviation of every model
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_residual_std: Option<f64>,
    /// The organism the sample came from: porcine, human, mouse, or bovine
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<DataType>,
}

#[derive(Serialize, Debug)]
struct Summary<'a> {
    statistics: &'a ganglioside_analyzer::Statistics,
    models: &'a [retention::RegressionModel],
    groups: &'a [retention::GroupCalibration],
    fragments: &'a [ganglioside_analyzer::MergedFragment],
    config: &'a AnalysisConfig,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast::<Error>() {
                Ok(error) => eprintln!("{:?}", miette::Report::new(error)),
                Err(error) => eprintln!("Error: {error:?}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    init_tracing(args.quiet, args.verbose)?;
    let config = load_config(args)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(args.input.clone()))?
        .finish()
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    info!(rows = df.height(), input = %args.input.display(), "loaded compounds");

    let result = analyze_dataframe(&df, &config)?;

    let mut table = result_to_dataframe(&result)?;
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    CsvWriter::new(output).finish(&mut table)?;

    if let Some(path) = &args.summary {
        write_summary(path, &result)?;
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut figment = Figment::from(Serialized::defaults(AnalysisConfig::default()));
    if let Some(path) = &args.config {
        figment = figment.merge(Toml::file(path));
    }
    let config: AnalysisConfig = figment
        .merge(Env::prefixed("GANGLIOSIDE_"))
        .merge(Serialized::defaults(&args.overrides))
        .extract()
        .context("failed to load the analysis settings")?;

    config.validate().map_err(Error::from)?;
    Ok(config)
}

fn write_summary(path: &Path, result: &AnalysisResult) -> Result<()> {
    let summary = Summary {
        statistics: &result.statistics,
        models: &result.models,
        groups: &result.groups,
        fragments: &result.fragments,
        config: &result.config,
    };
    let mut writer = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(&mut writer, &summary)?;
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
