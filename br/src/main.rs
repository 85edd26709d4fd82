//! Barrage - frame-stepped bullet pattern runner
//!
//! CLI entry point for running and checking pattern scripts.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use barrage::cli::{Cli, Command, OutputFormat};
use barrage::config::BarrageConfig;
use barrage::context::CommonHandoff;
use barrage::emit::{Emission, EmissionLog};
use barrage::scheduler::{RunReport, Scheduler};
use barrage::script::Script;
use barrage::world::{SfxLog, World};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("barrage")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("barrage.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = BarrageConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Barrage loaded config: frame-rate={}, max-ticks={}, seed={}",
        config.simulation.frame_rate, config.simulation.max_ticks, config.rng.seed
    );

    match cli.command {
        Command::Run {
            script,
            ticks,
            seed,
            format,
        } => cmd_run(&config, &script, ticks, seed, format),
        Command::Check { script } => cmd_check(&config, &script),
    }
}

fn load_script(path: &Path) -> Result<Script> {
    let text = fs::read_to_string(path).context(format!("Failed to read script {}", path.display()))?;
    let script = Script::from_yaml(&text).context(format!("Failed to parse script {}", path.display()))?;
    info!(path = %path.display(), nodes = script.node_count(), "Loaded script");
    Ok(script)
}

/// Build every node of a script without running it
fn cmd_check(config: &BarrageConfig, path: &Path) -> Result<()> {
    let script = load_script(path)?;
    let world = World::new(config.rng.seed, config.simulation.frame_rate);
    script
        .build(&world)
        .context(format!("Invalid pattern in {}", path.display()))?;
    println!("{} {} ({} nodes)", "OK".green().bold(), path.display(), script.node_count());
    Ok(())
}

/// Everything a run produced, in print order
struct RunOutput {
    report: RunReport,
    emissions: Vec<Emission>,
    sounds: Vec<String>,
    outcome: Option<bool>,
}

fn cmd_run(
    config: &BarrageConfig,
    path: &Path,
    ticks: Option<u64>,
    seed: Option<u64>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let script = load_script(path)?;
    let seed = seed.unwrap_or(config.rng.seed);
    let max_ticks = ticks.unwrap_or(config.simulation.max_ticks);
    let format = format.unwrap_or(config.output.format);

    let sounds = Rc::new(RefCell::new(SfxLog::default()));
    let world = World::new(seed, config.simulation.frame_rate).with_sfx(sounds.clone());
    let pattern = script
        .build(&world)
        .context(format!("Invalid pattern in {}", path.display()))?;

    let log = Rc::new(RefCell::new(EmissionLog::new()));
    let ch = CommonHandoff::root(Rc::new(script.emitter()), log.clone(), world.clone());
    let mut scheduler = Scheduler::new(world);
    let completion = scheduler.run(&pattern, ch);
    let report = scheduler.run_until_idle(max_ticks);
    info!(ticks = report.ticks, idle = report.idle, errors = report.errors.len(), "Run finished");

    let output = RunOutput {
        report,
        emissions: std::mem::take(&mut log.borrow_mut().emissions),
        sounds: std::mem::take(&mut sounds.borrow_mut().cues),
        outcome: completion.outcome(),
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Table => print_table(&output),
        OutputFormat::Text => print_text(&output),
    }

    if !output.report.errors.is_empty() {
        return Err(eyre::eyre!("{} pattern error(s) during run", output.report.errors.len()));
    }
    Ok(())
}

fn outcome_label(outcome: Option<bool>) -> &'static str {
    match outcome {
        Some(true) => "completed",
        Some(false) => "cancelled",
        None => "running",
    }
}

fn print_json(output: &RunOutput) -> Result<()> {
    let errors: Vec<String> = output.report.errors.iter().map(ToString::to_string).collect();
    let doc = serde_json::json!({
        "ticks": output.report.ticks,
        "idle": output.report.idle,
        "outcome": outcome_label(output.outcome),
        "emissions": output.emissions,
        "sfx": output.sounds,
        "errors": errors,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn print_text(output: &RunOutput) {
    let mut current = None;
    for e in &output.emissions {
        if current != Some(e.frame) {
            println!("{}", format!("frame {}", e.frame).bright_cyan().bold());
            current = Some(e.frame);
        }
        let style = if e.style.is_empty() { "-" } else { e.style.as_str() };
        println!(
            "  #{:<4} index={:<6} pos=({:.3}, {:.3}) angle={:.3} style={} dt={:.4}",
            e.id, e.index, e.position.x, e.position.y, e.offset.angle, style, e.time_offset
        );
    }
    for cue in &output.sounds {
        println!("{} {}", "sfx".yellow(), cue);
    }
    for err in &output.report.errors {
        eprintln!("{} {}", "Error:".red(), err);
    }
    println!();
    println!(
        "{} ticks, {} emissions, root {}{}",
        output.report.ticks,
        output.emissions.len(),
        outcome_label(output.outcome),
        if output.report.idle { "" } else { " (tick limit reached)" }
    );
}

fn print_table(output: &RunOutput) {
    println!(
        "{:<6} {:<6} {:<8} {:>10} {:>10} {:>9} {:<12} {:>8}",
        "FRAME", "ID", "INDEX", "X", "Y", "ANGLE", "STYLE", "DT"
    );
    println!("{}", "-".repeat(76));
    for e in &output.emissions {
        println!(
            "{:<6} {:<6} {:<8} {:>10.3} {:>10.3} {:>9.3} {:<12} {:>8.4}",
            e.frame, e.id, e.index, e.position.x, e.position.y, e.offset.angle, e.style, e.time_offset
        );
    }
    for err in &output.report.errors {
        eprintln!("{} {}", "Error:".red(), err);
    }
    println!();
    println!("Ticks:     {}", output.report.ticks);
    println!("Emissions: {}", output.emissions.len());
    println!("Sounds:    {}", output.sounds.len());
    println!("Root:      {}", outcome_label(output.outcome));
}
