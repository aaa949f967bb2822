use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use world_tiler::config::{CliArgs, WorldConfig};
use world_tiler::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("world_tiler=debug")
    } else {
        EnvFilter::new("world_tiler=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config: WorldConfig = args.into();

    // Configure rayon thread pool
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    match Pipeline::run(&config) {
        Ok(result) => {
            println!(
                "Done: {}x{}x{} m world in {:.2}s -> {}",
                result.frame.size_x,
                result.frame.size_y,
                result.frame.size_z,
                result.duration.as_secs_f64(),
                result.model_dir.display()
            );
            if result.building_count > 0 {
                println!("  {} buildings extruded", result.building_count);
            }
            Ok(())
        }
        Err(e) => {
            error!(%e, "Pipeline failed");
            Err(anyhow::anyhow!(e)).context("world-tiler pipeline failed")
        }
    }
}
