//! Headless biosim runner.

mod output;
mod telemetry;

use anyhow::{Context, Result};
use biosim_core::SimulationConfig;
use biosim_genome::{Compiler, CompilerConfig, Genome};
use biosim_world::{FileParameterSource, RunControl, Simulation};
use clap::Parser;
use output::ChannelObserver;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Genomes printed at the end of a run.
const SAMPLE_GENOMES: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "biosim")]
#[command(about = "Evolve a population of neural-net agents")]
struct Cli {
    /// JSON configuration; watched for tunable changes between generations
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override run.max_generations
    #[arg(long)]
    generations: Option<u32>,
    /// Override run.seed
    #[arg(long)]
    seed: Option<u64>,
    /// Write step snapshots here as JSON lines
    #[arg(long)]
    snapshots: Option<PathBuf>,
    /// Write one JSON line of statistics per generation here
    #[arg(long)]
    epoch_log: Option<PathBuf>,
    /// Save the final population's genomes (bincode)
    #[arg(long)]
    save_genomes: Option<PathBuf>,
    /// Log as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(generations) = cli.generations {
        config.run.max_generations = generations;
    }
    if let Some(seed) = cli.seed {
        config.run.seed = seed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.json_logs)?;

    let config = load_config(&cli)?;
    let mut sim = Simulation::new(config).context("creating simulation")?;
    if let Some(path) = &cli.config {
        sim.set_parameter_source(FileParameterSource::new(path));
    }

    let (tx, rx) = mpsc::unbounded_channel();
    if cli.snapshots.is_some() || cli.epoch_log.is_some() {
        sim.add_observer(ChannelObserver::new(
            tx,
            cli.snapshots.is_some(),
            cli.epoch_log.is_some(),
        ));
    } else {
        drop(tx);
    }
    let writer = tokio::spawn(output::write_records(
        rx,
        cli.snapshots.clone(),
        cli.epoch_log.clone(),
    ));

    tokio::spawn(stop_on_signal(sim.control()));

    let save_path = cli.save_genomes.clone();
    let summary = tokio::task::spawn_blocking(move || -> Result<_> {
        sim.run()?;
        report_samples(&sim);
        if let Some(path) = save_path {
            save_genomes(&sim, &path)?;
        }
        Ok(sim.shutdown())
    })
    .await??;

    writer.await?.context("writing output")?;

    info!(
        event = "run_summary",
        run_id = %summary.run_id,
        generations_completed = summary.generations_completed,
        restarts = summary.restarts,
        final_survivors = summary.final_stats.as_ref().map(|s| s.survivors),
        duration_s = summary.duration().num_seconds(),
        "Run complete"
    );
    Ok(())
}

fn report_samples(sim: &Simulation) {
    let compiler = Compiler::new(CompilerConfig {
        max_neurons: sim.config().genome.max_neurons,
    });
    for (i, genome) in sim.sample_genomes(SAMPLE_GENOMES).iter().enumerate() {
        let edges: Vec<String> = compiler
            .compile(genome)
            .edge_list()
            .iter()
            .map(|e| format!("{} {} {:.3}", e.source, e.sink, e.weight))
            .collect();
        info!(
            event = "sample_genome",
            sample = i,
            genes = genome.len(),
            hex = %genome.to_hex(),
            edges = ?edges,
            "Sample genome"
        );
    }
}

fn save_genomes(sim: &Simulation, path: &Path) -> Result<()> {
    let genomes: Vec<Genome> = sim
        .peeps()
        .iter()
        .filter(|a| a.alive)
        .map(|a| a.genome.as_ref().clone())
        .collect();
    let bytes = bincode::serialize(&genomes)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    info!(count = genomes.len(), path = %path.display(), "Saved genomes");
    Ok(())
}

async fn stop_on_signal(control: RunControl) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping after the current step");
    control.stop();
}
