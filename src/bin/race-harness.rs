use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use race_harness::report::{ReportFormat, render_calibration, render_scenario};
use race_harness::{
    ContentionWindow, GuardMode, ScenarioConfig, ScenarioKind, calibrate_until, run_scenario,
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Parser)]
#[command(name = "race-harness")]
#[command(about = "Reproduce concurrency races and verify the guards that remove them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one trial of a scenario.
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Print every journal record.
        #[arg(long)]
        journal: bool,
    },
    /// Run a scenario repeatedly on fresh state and report any violation.
    Calibrate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Number of trials.
        #[arg(long)]
        trials: Option<usize>,
    },
    /// List available scenarios.
    List,
}

#[derive(Debug, Args)]
struct ScenarioArgs {
    /// Scenario name (order, lazy, collection, uploader, wakeup).
    #[arg(long)]
    scenario: Option<ScenarioKind>,
    /// Number of concurrent units.
    #[arg(long)]
    units: Option<usize>,
    /// Guard placement (none, entity, caller).
    #[arg(long)]
    guard: Option<GuardMode>,
    /// Operations per unit.
    #[arg(long)]
    ops: Option<usize>,
    /// Pause between check and act: none, yield, spin:<n>, sleep:<micros>.
    #[arg(long)]
    window: Option<ContentionWindow>,
    /// JSON config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn make_config(args: &ScenarioArgs) -> Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScenarioConfig::default(),
    };
    if let Some(scenario) = args.scenario {
        config.scenario = scenario;
    }
    if let Some(units) = args.units {
        config = config.with_units(units);
    }
    if let Some(guard) = args.guard {
        config = config.with_guard(guard);
    }
    if let Some(ops) = args.ops {
        config = config.with_ops_per_unit(ops);
    }
    if let Some(window) = args.window {
        config = config.with_window(window);
    }
    Ok(config)
}

fn install_signal_handler_once() -> Result<()> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let result = INIT.get_or_init(|| {
        ctrlc::set_handler(|| {
            INTERRUPTED.store(true, Ordering::SeqCst);
        })
        .map_err(|e| e.to_string())
    });

    match result {
        Ok(()) => Ok(()),
        Err(msg) => Err(anyhow::anyhow!("signal handler installation failed: {msg}")),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { scenario, journal } => {
            let config = make_config(&scenario)?.with_journal(journal);
            let report = run_scenario(&config)?;
            println!("{}", render_scenario(&report, scenario.format.into())?);
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Command::Calibrate { scenario, trials } => {
            let mut config = make_config(&scenario)?;
            if let Some(trials) = trials {
                config = config.with_trials(trials);
            }
            install_signal_handler_once()?;
            let report = calibrate_until(&config, || INTERRUPTED.load(Ordering::SeqCst))?;
            println!("{}", render_calibration(&report, scenario.format.into())?);
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Command::List => {
            for kind in ScenarioKind::ALL {
                println!("{kind}");
            }
        }
    }

    Ok(())
}
