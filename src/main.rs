use clap::Parser;
use std::path::PathBuf;

mod runner;

/// Decode detection tensors frame by frame and fire the configured reactions.
#[derive(Parser, Debug)]
#[command(name = "sightline", version)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Without a config file, alert on this class of the built-in catalog
    #[arg(long, default_value = "person")]
    alert: String,

    /// Number of cycles to run
    #[arg(short = 'n', long, default_value_t = 30)]
    cycles: u64,

    /// Confidence threshold, overrides the configuration
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Write every cycle report to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save annotated frames into this directory
    #[arg(long)]
    overlay_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match runner::run(&args) {
        Ok(summary) => {
            println!("Run completed:");
            println!("  - Cycles: {} ({} failed)", summary.cycles, summary.failed_cycles);
            println!("  - Decode failures: {}", summary.decode_failures);
            println!("  - Detections: {}", summary.total_detections);
            println!("  - Spawns: {}", summary.spawns);
        }
        Err(e) => {
            eprintln!("Run failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
