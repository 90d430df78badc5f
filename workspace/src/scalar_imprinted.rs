use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use log::info;
use qturb::{
    config::Params,
    evolve::{ LogProgress, Simulation },
    imprint::PairImprinter,
};

/// Quantum turbulence in a 2D scalar condensate seeded by phase-imprinted
/// vortex pairs.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML parameter file; built-in defaults are used if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Continue from the checkpoint instead of starting a fresh run
    #[arg(long = "continue")]
    cont: bool,

    /// Seed for vortex placement
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    let cli = Cli::parse();

    let mut params
        = match &cli.config {
            Some(path) => Params::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Params::default(),
        };
    if cli.cont { params.fresh = false; }
    if cli.seed.is_some() { params.seed = cli.seed; }
    info!(
        "{} run on {}x{} grid; Nt = {}, dt = {:e}, Nframe = {}",
        if params.fresh { "fresh" } else { "continued" },
        params.grid.nx, params.grid.ny,
        params.time.nt, params.time.dt, params.time.nframe,
    );

    let mut imprinter = PairImprinter::new(params.seed);
    let mut sim = Simulation::start(params, &mut imprinter)?;
    sim.run(&mut LogProgress)?;
    Ok(())
}
