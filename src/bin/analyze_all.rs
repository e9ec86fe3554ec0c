use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn};
use prettytable::{row, Table};
use query_bench_analysis::analysis::{self, write_image};
use query_bench_analysis::dataset::find_datasets;
use query_bench_analysis::{AnalysisConfig, Dataset, Result};

#[derive(Parser)]
#[command(name = "analyze_all")]
#[command(about = "Runs every applicable analysis on one CSV or on every CSV of a directory")]
#[command(version)]
struct Cli {
    /// Benchmark CSV, or a directory of them
    input: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the chart images
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

/// One executed analysis, for the closing summary table.
struct RunSummary {
    dataset: String,
    variant: &'static str,
    image: PathBuf,
}

fn analyze_file(path: &Path, config: &AnalysisConfig, summaries: &mut Vec<RunSummary>) -> Result<()> {
    let dataset = Dataset::load(path)?;
    let dataset_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    // Images of different datasets must not overwrite each other
    let config = AnalysisConfig {
        output_dir: config.output_dir.join(&dataset_name),
        ..config.clone()
    };

    for variant in analysis::all() {
        if let Err(e) = dataset.require(variant.required_columns()) {
            warn!("Skipping {} analysis of {}: {}", variant.name(), path.display(), e);
            continue;
        }

        let output = analysis::run(variant.as_ref(), &dataset, &config)?;
        let image = write_image(variant.as_ref(), &output, &config, None)?;
        print!("{}", output.report);
        println!();

        summaries.push(RunSummary {
            dataset: dataset_name.clone(),
            variant: variant.name(),
            image,
        });
    }
    Ok(())
}

fn print_run_summaries(summaries: &[RunSummary]) {
    let mut table = Table::new();
    table.add_row(row!["Dataset", "Analysis", "Chart"]);
    for s in summaries {
        table.add_row(row![s.dataset, s.variant, s.image.display()]);
    }
    table.printstd();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }

    let files = if cli.input.is_dir() {
        find_datasets(&cli.input)?
    } else {
        vec![cli.input.clone()]
    };
    info!("Analyzing {} dataset(s)", files.len());

    let mut summaries = Vec::new();
    for file in &files {
        analyze_file(file, &config, &mut summaries)?;
    }

    if summaries.is_empty() {
        warn!("No analysis matched the columns of the input");
    } else {
        print_run_summaries(&summaries);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
