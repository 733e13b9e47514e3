//! Compare cache hierarchy simulation results between two policies
use anyhow::bail;
use champsim_reports::{
    Extractor, Metric, MetricTable, Renderer, TraceResult, format_value, get_tqdm_style,
    locate_traces,
};
use clap::Parser;
use cli_table::{Cell, Table, print_stdout};
use log::{error, warn};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory with baseline policy results
    #[arg(long, default_value = "outputs/no_prefetcher")]
    baseline_dir: PathBuf,

    /// Baseline policy label
    #[arg(long, default_value = "noninclusive")]
    baseline_label: String,

    /// Directory with comparison policy results
    #[arg(long, default_value = "outputs_latest/exclusive_no")]
    comparison_dir: PathBuf,

    /// Comparison policy label
    #[arg(long, default_value = "exclusive")]
    comparison_label: String,

    /// Output directory for rendered artifacts
    #[arg(short, long, default_value = "outputs_latest/plots_task2")]
    output_dir: PathBuf,

    /// Expected number of trace result files (trace1.txt..traceN.txt)
    #[arg(short, long, default_value = "4")]
    traces: u32,
}

/// Locate and parse one policy's result files. A failed side is reported and
/// degrades to an empty run so the other side can still be rendered.
fn collect_policy(dir: &Path, label: &str, count: u32, extractor: &Extractor) -> Vec<TraceResult> {
    let sources = match locate_traces(dir, count) {
        Ok(sources) => sources,
        Err(err) => {
            error!("{}: {}", label, err);
            return vec![];
        }
    };

    println!(
        "Parsing {} trace files from {}",
        sources.len(),
        dir.display()
    );
    let pbar = indicatif::ProgressBar::new(sources.len() as u64);
    pbar.set_style(get_tqdm_style());
    let mut results = vec![];
    for source in &sources {
        results.push(extractor.parse_trace_file(source.trace, &source.path));
        pbar.inc(1);
    }
    pbar.finish();
    results
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let extractor = Extractor::new();
    let comparison = collect_policy(
        &args.comparison_dir,
        &args.comparison_label,
        args.traces,
        &extractor,
    );
    let baseline = collect_policy(
        &args.baseline_dir,
        &args.baseline_label,
        args.traces,
        &extractor,
    );

    if comparison.is_empty() && baseline.is_empty() {
        bail!("No trace files found in either directory. Please check paths.");
    }
    let have_both = !comparison.is_empty() && !baseline.is_empty();

    let table = MetricTable::from_runs(vec![
        (args.comparison_label.clone(), comparison),
        (args.baseline_label.clone(), baseline),
    ]);

    // one row per trace, formatted for display; shared by the stdout table
    // and the rendered table image
    let columns = table.summary_columns();
    let summary = table.summary_rows(&args.comparison_label, &args.baseline_label);
    let display_rows: Vec<Vec<String>> = summary
        .iter()
        .map(|row| {
            let mut cells = vec![row.trace.to_string()];
            for (name, precision) in &columns {
                cells.push(format_value(
                    row.values.get(name).copied().flatten(),
                    *precision,
                ));
            }
            cells
        })
        .collect();
    let mut display_columns = vec!["Trace".to_string()];
    display_columns.extend(columns.iter().map(|(name, _)| name.clone()));

    println!("Summary:");
    let mut stdout_rows = vec![];
    for row in &display_rows {
        stdout_rows.push(row.iter().map(|cell| cell.as_str().cell()).collect::<Vec<_>>());
    }
    let stdout_table = stdout_rows.table().title(
        display_columns
            .iter()
            .map(|name| name.as_str().cell())
            .collect::<Vec<_>>(),
    );
    print_stdout(stdout_table)?;

    let renderer = Renderer::new(&args.output_dir)?;

    let json_path = renderer.out_dir().join("summary.json");
    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?)?;
    println!("Summary written to {}", json_path.display());

    for metric in Metric::ALL {
        renderer.metric_chart(&table, metric);
    }

    if have_both {
        renderer.speedup_chart(&table, &args.comparison_label, &args.baseline_label);
    } else {
        warn!("Traces missing on one side, skipping speedup chart");
    }

    let title = format!(
        "Per-trace metrics: {} vs {} (speedup = {} / {})",
        args.comparison_label, args.baseline_label, args.comparison_label, args.baseline_label
    );
    renderer.summary_table(&title, &display_columns, &display_rows);

    println!("Done. Files saved to: {}", args.output_dir.display());

    Ok(())
}
