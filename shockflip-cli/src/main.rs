//! ShockFlip CLI — run, sweep and parity commands.
//!
//! Commands:
//! - `run` — detect events and simulate trades, then write the run artifacts
//! - `sweep` — evaluate the detector micro-grid and write `sweep.csv`
//! - `parity` — replay bars through the batch and streaming engines and compare
//! - `event-study` — forward returns and excursions after each event vs random entries
//!
//! Every command takes its strategy from an optional TOML file; `--bars` or
//! `--synthetic` override the file's data source.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use shockflip_runner::export::{
    save_event_study_artifacts, save_parity_report, save_run_artifacts, save_sweep_artifacts,
};
use shockflip_runner::{
    load_bars, run_event_study_from_config, run_from_config, run_parity, DataSource, EventStudy,
    ParamGrid, ParamSweep, RunConfig, RunReport, Sample, SweepRow, SyntheticSpec,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "shockflip",
    about = "ShockFlip CLI — order-flow shock detection and barrier backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Path to a TOML run file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bar CSV to run on, overriding the config's data source.
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Generate this many synthetic bars instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for `--synthetic`.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and write events, trades and summary.
    Run {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Sweep z band × jump band × persistence over one dataset.
    Sweep {
        #[command(flatten)]
        input: InputArgs,

        /// z bands (static band, or the floor of a dynamic threshold).
        #[arg(long, value_delimiter = ',', default_values_t = [2.0, 2.5, 3.0])]
        z_bands: Vec<f64>,

        #[arg(long, value_delimiter = ',', default_values_t = [2.0, 2.5, 3.0])]
        jump_bands: Vec<f64>,

        #[arg(long, value_delimiter = ',', default_values_t = [3, 6, 8])]
        persistence: Vec<usize>,

        /// Run grid points one after another.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Rows to print, best total R first.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Check that batch and streaming runs produce identical trade logs.
    Parity {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Measure forward returns after each event against random entries.
    EventStudy {
        #[command(flatten)]
        input: InputArgs,

        /// Random baseline anchors, overriding the config.
        #[arg(long)]
        baseline_samples: Option<usize>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input } => run_cmd(&input),
        Commands::Sweep {
            input,
            z_bands,
            jump_bands,
            persistence,
            sequential,
            top,
        } => {
            let grid = ParamGrid {
                z_bands,
                jump_bands,
                persistence_bars: persistence,
            };
            sweep_cmd(&input, &grid, sequential, top)
        }
        Commands::Parity { input } => parity_cmd(&input),
        Commands::EventStudy {
            input,
            baseline_samples,
        } => event_study_cmd(&input, baseline_samples),
    }
}

/// `RUST_LOG` wins; otherwise info for the shockflip crates.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shockflip=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_config(input: &InputArgs) -> Result<RunConfig> {
    if input.bars.is_some() && input.synthetic.is_some() {
        bail!("--bars and --synthetic are mutually exclusive");
    }

    let mut config = match &input.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(path) = &input.bars {
        config.data = DataSource::Csv { path: path.clone() };
    } else if let Some(bars) = input.synthetic {
        if bars == 0 {
            bail!("--synthetic needs at least one bar");
        }
        config.data = DataSource::Synthetic(SyntheticSpec {
            bars,
            seed: input.seed,
            ..SyntheticSpec::default()
        });
    }
    Ok(config)
}

fn run_cmd(input: &InputArgs) -> Result<()> {
    let config = resolve_config(input)?;
    let run_id = config.run_id()?;
    let report = run_from_config(&config)?;
    print_summary(&report, &run_id);

    let dir = input.out_dir.join(run_id.get(..12).unwrap_or(&run_id));
    save_run_artifacts(&report, &dir)?;
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn sweep_cmd(input: &InputArgs, grid: &ParamGrid, sequential: bool, top: usize) -> Result<()> {
    if grid.size() == 0 {
        bail!("sweep grid is empty");
    }
    let config = resolve_config(input)?;
    let loaded = load_bars(&config.data)?;
    info!(points = grid.size(), bars = loaded.bars.len(), "sweeping");

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(grid, &config.strategy, &loaded.bars)?;

    println!();
    println!("=== Sweep: {} points over {} bars ===", results.len(), loaded.bars.len());
    print_sweep_header();
    for row in results.top_n(top) {
        print_sweep_row(row);
    }
    if results.best().is_none() {
        println!("No grid point produced a trade.");
    }

    save_sweep_artifacts(results.rows(), &input.out_dir)?;
    println!("Sweep saved to: {}", input.out_dir.join("sweep.csv").display());
    Ok(())
}

fn parity_cmd(input: &InputArgs) -> Result<()> {
    let config = resolve_config(input)?;
    let loaded = load_bars(&config.data)?;
    let report = run_parity(&loaded.bars, &config.strategy)?;
    save_parity_report(&report, &input.out_dir)?;

    println!();
    println!("=== Parity ===");
    println!("Bars:             {}", report.bars);
    println!(
        "Events:           {} batch / {} streaming",
        report.batch_events, report.streaming_events
    );
    println!(
        "Trades:           {} batch / {} streaming",
        report.batch_trades, report.streaming_trades
    );
    println!("Batch digest:     {}", report.batch_digest);
    println!("Streaming digest: {}", report.streaming_digest);
    println!(
        "Report saved to:  {}",
        input.out_dir.join("parity.json").display()
    );

    if !report.is_match() {
        match report.first_mismatch {
            Some(i) => bail!("batch and streaming trade logs differ at trade {i}"),
            None => bail!("batch and streaming event logs differ"),
        }
    }
    println!("OK: trade logs are byte-identical");
    Ok(())
}

fn event_study_cmd(input: &InputArgs, baseline_samples: Option<usize>) -> Result<()> {
    let mut config = resolve_config(input)?;
    if let Some(n) = baseline_samples {
        config.event_study.baseline_samples = n;
    }
    let study = run_event_study_from_config(&config)?;
    let dir = input.out_dir.join("event_study");
    save_event_study_artifacts(&study, &dir)?;

    print_event_study(&study);
    println!("Event study saved to: {}", dir.display());
    Ok(())
}

fn print_summary(report: &RunReport, run_id: &str) {
    let s = &report.summary;
    let t = &s.trades;
    println!();
    println!("=== ShockFlip Run: {} ===", s.name);
    println!("Run id:         {run_id}");
    println!("Bars:           {}", s.bars);
    println!(
        "Events:         {} ({} long / {} short)",
        s.events.total, s.events.long, s.events.short
    );
    println!("Rejected:       {}", s.rejected);
    println!("Unfilled:       {}", s.unfilled);
    println!("Trades:         {}", t.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Win Rate:       {:.1}%", t.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", t.profit_factor);
    println!("Mean R:         {:.3}", t.mean_r);
    println!("Total R:        {:.2}", t.total_r);
    println!("Net Return:     {:.2}%", t.total_net_return * 100.0);
    println!("Mean MFE R:     {:.2}", t.mean_mfe_r);
    println!("Mean MAE R:     {:.2}", t.mean_mae_r);
    println!("Avg Hold Bars:  {:.1}", t.mean_holding_bars);
    println!("Max Consec Loss:{}", t.max_consecutive_losses);
    println!("Zombie Losers:  {}", t.zombie_losers);
    let labels: Vec<String> = t
        .label_counts
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(label, n)| format!("{label}={n}"))
        .collect();
    println!("Exits:          {}", labels.join(" "));
    if s.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_event_study(study: &EventStudy) {
    println!();
    println!("=== Event Study ===");
    println!("Events:           {}", study.events);
    println!("Truncated:        {}", study.truncated);
    println!("Baseline anchors: {}", study.baseline_anchors);
    println!();
    println!(
        "{:>6} {:>4} {:>6} {:>10} {:>10} {:>7} {:>7} {:>10}",
        "side", "h", "n", "mean ret", "rand ret", "hit%", "MFE R", "lift"
    );
    println!("{}", "-".repeat(68));
    for cell in study.summary.iter().filter(|c| c.sample == Sample::Event) {
        let baseline = study.cell(Sample::Baseline, cell.side, cell.horizon);
        let lift = study
            .lift(cell.side, cell.horizon)
            .map_or_else(|| "-".to_string(), |l| format!("{:.4}%", l * 100.0));
        println!(
            "{:>6} {:>4} {:>6} {:>9.4}% {:>9.4}% {:>7.1} {:>7.2} {:>10}",
            cell.side.to_string(),
            cell.horizon,
            cell.count,
            cell.mean_return * 100.0,
            baseline.map_or(0.0, |b| b.mean_return) * 100.0,
            cell.hit_rate * 100.0,
            cell.mean_mfe_r,
            lift
        );
    }
    println!();
}

fn print_sweep_header() {
    println!(
        "{:>6} {:>6} {:>5} {:>7} {:>7} {:>7} {:>7} {:>9}",
        "z", "jump", "n", "events", "trades", "win%", "PF", "total R"
    );
    println!("{}", "-".repeat(62));
}

fn print_sweep_row(row: &SweepRow) {
    println!(
        "{:>6.2} {:>6.2} {:>5} {:>7} {:>7} {:>7.1} {:>7.2} {:>9.2}",
        row.z_band,
        row.jump_band,
        row.persistence_bars,
        row.events,
        row.trades,
        row.win_rate * 100.0,
        row.profit_factor,
        row.total_r
    );
}
