use std::path::PathBuf;

use clap::Parser;
use log::info;
use prettytable::{row, Table};
use query_bench_analysis::analysis::{self, write_image, write_json};
use query_bench_analysis::report::format_cv;
use query_bench_analysis::{load_dataset, AnalysisConfig, Result, Summary};

#[derive(Parser)]
#[command(name = "analyze")]
#[command(about = "Statistics, charts and a report for one query benchmark CSV")]
#[command(version)]
struct Cli {
    /// Benchmark CSV with one row per iteration
    input: PathBuf,

    /// Analysis to run (basic, cpu, memory, comprehensive, realistic, resource, performance)
    #[arg(short, long, default_value = "comprehensive")]
    variant: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the chart image
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Chart image path, overriding the analysis default
    #[arg(long)]
    image: Option<PathBuf>,

    /// Histogram bin count
    #[arg(long)]
    bins: Option<usize>,

    /// Quantile below which parallel memory readings are dropped
    #[arg(long)]
    outlier_percentile: Option<f64>,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Write the full analysis output as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the chart specification as JSON
    #[arg(long)]
    chart_spec: Option<PathBuf>,
}

impl Cli {
    /// Configuration file (or defaults) with the command-line overrides applied.
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(bins) = self.bins {
            config.histogram_bins = bins;
        }
        if let Some(p) = self.outlier_percentile {
            config.outlier_percentile = p;
        }
        if let Some(width) = self.width {
            config.image_width = width;
        }
        if let Some(height) = self.height {
            config.image_height = height;
        }

        config.validate(self.config.as_deref().unwrap_or(self.input.as_path()))?;
        Ok(config)
    }
}

fn print_summaries(summaries: &[Summary]) {
    let mut table = Table::new();
    table.add_row(row!["Series", "N", "Mean", "Std Dev", "Median", "Min", "Max", "CV (%)"]);
    for s in summaries {
        let m = s.metric;
        table.add_row(row![
            s.label,
            s.n,
            m.format(s.mean),
            m.format(s.std),
            m.format(s.median),
            m.format(s.min),
            m.format(s.max),
            format_cv(s)
        ]);
    }
    table.printstd();
}

fn run(cli: &Cli) -> Result<()> {
    let Some(variant) = analysis::by_name(&cli.variant) else {
        eprintln!(
            "Unknown variant: {} (expected one of: {})",
            cli.variant,
            analysis::names().join(", ")
        );
        std::process::exit(1);
    };

    let config = cli.resolve_config()?;
    let dataset = load_dataset(&cli.input, variant.required_columns())?;
    let output = analysis::run(variant.as_ref(), &dataset, &config)?;

    // Only print once every artifact has been written
    let image = write_image(variant.as_ref(), &output, &config, cli.image.as_deref())?;
    if let Some(path) = &cli.json {
        write_json(&output, path)?;
    }
    if let Some(path) = &cli.chart_spec {
        write_json(&output.charts, path)?;
    }

    print!("{}", output.report);
    if !output.summaries.is_empty() {
        print_summaries(&output.summaries);
    }
    info!("Chart written to {}", image.display());
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
