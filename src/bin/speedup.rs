//! Render the IPC speedup of one cache configuration over a baseline
use anyhow::bail;
use champsim_reports::{
    Discovery, Extractor, Metric, MetricTable, Renderer, TraceResult, discover,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory with baseline results
    #[arg(long, default_value = "outputs/exclusive_no")]
    baseline_dir: PathBuf,

    /// Baseline policy label
    #[arg(long, default_value = "baseline")]
    baseline_label: String,

    /// Directory with comparison results
    #[arg(long, default_value = "outputs/exclusive_offset_prefetcher")]
    comparison_dir: PathBuf,

    /// Comparison policy label
    #[arg(long, default_value = "prefetcher")]
    comparison_label: String,

    /// Output directory for the chart
    #[arg(short, long, default_value = "outputs/plots")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let baseline_sources = discover(&args.baseline_dir, &Discovery::Glob)?;
    let comparison_sources = discover(&args.comparison_dir, &Discovery::Glob)?;
    if baseline_sources.is_empty() {
        bail!(
            "No trace files found in {}. Make sure your simulation outputs are there.",
            args.baseline_dir.display()
        );
    }

    let extractor = Extractor::new();
    let baseline: Vec<TraceResult> = baseline_sources
        .iter()
        .map(|source| extractor.parse_trace_file(source.trace, &source.path))
        .collect();
    let comparison: Vec<TraceResult> = comparison_sources
        .iter()
        .map(|source| extractor.parse_trace_file(source.trace, &source.path))
        .collect();

    // join by trace number; directories may cover different trace sets
    let table = MetricTable::from_runs(vec![
        (args.comparison_label.clone(), comparison),
        (args.baseline_label.clone(), baseline),
    ]);

    let ratios = table.ratio(Metric::Ipc, &args.comparison_label, &args.baseline_label);
    let mut valid = 0;
    for (trace, ratio) in &ratios {
        let num = table.get(*trace, &args.comparison_label, Metric::Ipc);
        let den = table.get(*trace, &args.baseline_label, Metric::Ipc);
        match (num, den) {
            (Some(num), Some(den)) => match ratio {
                Some(value) => {
                    println!(
                        "Processed trace{}: {} IPC={:.3}, {} IPC={:.3}, speedup={:.3}",
                        trace, args.baseline_label, den, args.comparison_label, num, value
                    );
                    valid += 1;
                }
                None => println!(
                    "Warning: {} IPC for trace{} is 0, cannot calculate speedup",
                    args.baseline_label, trace
                ),
            },
            _ => println!(
                "Warning: skipping trace{} due to missing data in one of the files",
                trace
            ),
        }
    }

    if valid == 0 {
        bail!("Could not generate plot because no valid result pairs were found.");
    }

    let renderer = Renderer::new(&args.output_dir)?;
    renderer.speedup_chart(&table, &args.comparison_label, &args.baseline_label);

    Ok(())
}
