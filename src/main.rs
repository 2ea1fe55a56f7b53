//! expreccs command-line interface.
//!
//! `run` drives a study from a TOML configuration; `given` projects regional
//! pressures onto an existing site deck.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use expreccs::config::ExpreccsConfig;
use expreccs::given::{GivenOptions, project_given_decks};
use expreccs::io::RestartLayout;
use expreccs::simulation::FlowSimulator;
use expreccs::time::{PerStep, TimeInterpolation};
use expreccs::workflow::{RunMode, backcoupling};

#[derive(Parser)]
#[command(name = "expreccs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Site boundary conditions from regional CO2 storage models", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and run the reference, regional and site models
    Run(RunArgs),
    /// Add projected boundary pressures to an existing site deck
    Given(GivenArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Study configuration
    #[arg(short, long)]
    input: PathBuf,

    /// Output root
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Models to run: all, reference, regional, site, noreference, none
    #[arg(short, long, default_value = "all")]
    mode: RunMode,
}

#[derive(Clone, Copy, ValueEnum)]
enum InterpArg {
    Interp,
    Step,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Unified,
    Separate,
}

#[derive(Args)]
struct GivenArgs {
    /// Regional case path without extension
    #[arg(long)]
    regional: PathBuf,

    /// Site case path without extension; its deck is `<site>.DATA`
    #[arg(long)]
    site: PathBuf,

    /// Folder for the rewritten site deck
    #[arg(short, long)]
    output: PathBuf,

    /// Only match faces and cells with equal region tags
    #[arg(long)]
    zones: bool,

    /// Add pressure changes to the site's initial pressure
    #[arg(long)]
    incremental: bool,

    /// Site steps per regional report step (default: the site deck's TSTEP)
    #[arg(long)]
    frequency: Option<usize>,

    /// Telescoping coefficient of the site steps
    #[arg(long, default_value = "0")]
    telescoping: f64,

    /// Transfer of regional values to site times
    #[arg(long, value_enum, default_value = "interp")]
    time_interp: InterpArg,

    /// INIT keyword with the region tags
    #[arg(long, default_value = "OPERNUM")]
    zone_keyword: String,

    /// Restart file layout of both cases
    #[arg(long, value_enum, default_value = "unified")]
    layout: LayoutArg,
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = ExpreccsConfig::from_file(&args.input)
        .map_err(expreccs::Error::from)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let simulator = FlowSimulator::from_config(&config.simulator);
    let field = backcoupling(&config, &args.output, args.mode, &simulator)?;
    tracing::info!(
        mode = %args.mode,
        output = %args.output.display(),
        corrected = !field.is_identity(),
        "study finished"
    );
    Ok(())
}

fn given(args: GivenArgs) -> anyhow::Result<()> {
    let options = GivenOptions {
        zones: args.zones,
        zone_keyword: args.zone_keyword,
        incremental: args.incremental,
        frequency: args.frequency.map(PerStep::Scalar),
        telescoping: PerStep::Scalar(args.telescoping),
        time_interp: match args.time_interp {
            InterpArg::Interp => TimeInterpolation::Interp,
            InterpArg::Step => TimeInterpolation::Step,
        },
        ..GivenOptions::default()
    };
    let layout = match args.layout {
        LayoutArg::Unified => RestartLayout::Unified,
        LayoutArg::Separate => RestartLayout::Separate,
    };
    let summary = project_given_decks(&args.regional, &args.site, &args.output, layout, &options)?;
    tracing::info!(
        faces = summary.faces,
        steps = summary.steps,
        deck = %summary.deck.display(),
        "given-deck projection finished"
    );
    Ok(())
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("expreccs: cannot install logger: {e}");
    }

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Given(args) => given(args),
    };
    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            let kind = e
                .downcast_ref::<expreccs::Error>()
                .map(|e| format!("{:?}", e.kind()))
                .unwrap_or_else(|| "Error".to_string());
            eprintln!("expreccs: {kind}: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
