use crate::config::Config;
use crate::display::{display_details, display_fill, display_stats, display_summary};
use crate::loaders::Loader;
use crate::matcher::Matcher;
use crate::report::Report;
use clap::{ArgAction, Parser};
use eyre::WrapErr;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod checks;
mod config;
mod display;
mod loaders;
mod matcher;
mod model;
mod remap;
mod report;
mod stats;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Use FILE instead of matcher.toml
    #[arg(short, long, value_name = "FILE", default_value = "matcher.toml")]
    config: PathBuf,
    /// Do not write back the schedule
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Set verbosity level
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
    /// Seed the random generator, overriding the configuration file
    #[arg(long)]
    seed: Option<u64>,
    /// Display the attendees of every workshop
    #[arg(long)]
    details: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("workshop_matcher={level}"))),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.verbose);
    let mut config = Config::load(&args.config)?;
    if args.seed.is_some() {
        config.matcher.seed = args.seed;
    }
    let mut loader = Loader::new(&config.loader).await?;
    let roster = loader.load().await?;
    let rng = match config.matcher.seed {
        Some(seed) => {
            info!(seed, "Using fixed random seed");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };
    let mut matcher = Matcher::new(config.matcher, rng);
    let remapping = remap::register(&roster, &mut matcher)?;
    matcher.run().wrap_err("cannot match students to workshops")?;
    checks::ensure_consistent(&matcher)?;
    checks::check_session_balance(&matcher);
    let report = Report::new(&matcher, &remapping);
    if args.dry_run {
        info!("Dry run, schedule not saved");
    } else {
        loader.save(&report).await?;
    }
    if args.details {
        display_details(&matcher);
    }
    display_fill(&matcher);
    display_stats(&matcher);
    display_summary(&report);
    Ok(())
}
