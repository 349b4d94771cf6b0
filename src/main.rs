use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};

use grid_traffic::simulation::{SimConfig, SimWorld, SpawnOutcome};

#[derive(Parser)]
#[command(name = "grid_traffic")]
#[command(about = "Headless grid road network and traffic simulation")]
struct Cli {
    /// Grid width in cells
    #[arg(long, default_value = "15")]
    width: usize,

    /// Grid length in cells
    #[arg(long, default_value = "11")]
    length: usize,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "2000")]
    ticks: u32,

    /// Vehicle capacity
    #[arg(long, default_value = "32")]
    vehicles: usize,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks between random vehicle spawns
    #[arg(long, default_value = "20")]
    spawn_interval: u32,

    /// Ticks between progress reports
    #[arg(long, default_value = "500")]
    report_every: u32,

    /// Skip printing the text map in reports
    #[arg(long)]
    quiet_map: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,grid_traffic=info"),
    )
    .init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    let config = SimConfig {
        grid_width: cli.width,
        grid_length: cli.length,
        vehicle_capacity: cli.vehicles,
        seed: cli.seed,
        ..SimConfig::default()
    };

    info!(
        "Running grid traffic simulation: {}x{} grid, {} ticks, {} vehicle slots",
        cli.width, cli.length, cli.ticks, cli.vehicles
    );

    let mut world = SimWorld::create_test_world(config)?;

    println!("Initial state:");
    world.print_summary();
    if !cli.quiet_map {
        world.draw_map();
        println!();
    }

    let spawn_interval = cli.spawn_interval.max(1);
    let report_every = cli.report_every.max(1);

    for tick in 1..=cli.ticks {
        if tick % spawn_interval == 1 || spawn_interval == 1 {
            match world.spawn_random_vehicle() {
                SpawnOutcome::AssetUnavailable => warn!("Vehicle model unavailable, spawn skipped"),
                outcome => debug!("Spawn at tick {}: {:?}", tick, outcome),
            }
        }

        world.tick();

        if tick % report_every == 0 {
            println!("--- After tick {} ---", tick);
            world.print_summary();
            if !cli.quiet_map {
                world.draw_map();
                println!();
            }
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    if !cli.quiet_map {
        world.draw_map();
    }

    world.stats().log_summary();
    Ok(())
}
