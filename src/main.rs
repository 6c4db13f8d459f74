use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use bloomsignal::config::AnalysisConfig;
use bloomsignal::pipeline::{self, RunOptions};

/// Batch bloom-detection analysis across sampling resolutions.
#[derive(Debug, Parser)]
#[command(name = "bloomsignal", version)]
struct Cli {
    /// Path to the TOML run configuration.
    config: PathBuf,

    /// Override the configured output directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip figure rendering, producing only the summary tables.
    #[arg(long)]
    no_plot: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = AnalysisConfig::from_path(&cli.config)?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    let options = RunOptions {
        render_figures: !cli.no_plot,
    };

    let rows = pipeline::run(&config, &options)?;
    info!("analysis complete, outputs in {}", config.output_dir.display());
    for row in &rows {
        println!(
            "{} @ {}: {}/{} reference blooms matched, precision {:.2}, recall {:.2}",
            row.taxon, row.resolution, row.true_positives, row.n_reference, row.precision, row.recall
        );
    }
    Ok(())
}
