//! Chart rendering through matplotlib
use crate::{Metric, MetricTable};
use log::warn;
use matplotlib::{Matplotlib, Mpl, Run, serde_json::Value};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AggPrelude;

impl Matplotlib for AggPrelude {
    fn is_prelude(&self) -> bool {
        true
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        "\
import matplotlib
matplotlib.use(\"Agg\")
import matplotlib.pyplot as plt
import numpy as np
plt.rcParams.update({
    \"font.size\": 11,
    \"axes.titlesize\": 14,
    \"axes.labelsize\": 11,
    \"legend.fontsize\": 10,
    \"xtick.labelsize\": 10,
    \"ytick.labelsize\": 10,
    \"figure.dpi\": 150,
    \"savefig.dpi\": 300,
    \"savefig.bbox\": \"tight\",
})
"
        .into()
    }
}

/// fig, ax = plt.subplots with an explicit figure size
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FigInit {
    pub width: f64,
    pub height: f64,
}

impl Matplotlib for FigInit {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        format!(
            "fig, ax = plt.subplots(figsize=({}, {}))",
            self.width, self.height
        )
    }
}

fn py_float(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{}", value),
        None => "float(\"nan\")".to_string(),
    }
}

fn py_float_list(values: &[Option<f64>]) -> String {
    let items: Vec<String> = values.iter().map(|value| py_float(*value)).collect();
    format!("[{}]", items.join(", "))
}

fn py_str(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn py_str_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<String> = items.iter().map(|item| py_str(item.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

fn py_tick_labels(traces: &[u32]) -> String {
    let labels: Vec<String> = traces.iter().map(|trace| trace.to_string()).collect();
    py_str_list(&labels)
}

/// One bar group per trace, one bar per policy, each bar annotated with its
/// value ("-" when undefined)
#[derive(Clone, Debug)]
pub struct GroupedBars {
    pub traces: Vec<u32>,
    pub series: Vec<(String, Vec<Option<f64>>)>,
    pub precision: usize,
}

impl Matplotlib for GroupedBars {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        let labels: Vec<&str> = self
            .series
            .iter()
            .map(|(label, _)| label.as_str())
            .collect();
        let values: Vec<String> = self
            .series
            .iter()
            .map(|(_, values)| py_float_list(values))
            .collect();
        format!(
            "\
xs = np.arange({n})
width = {width}
series = [{values}]
labels = {labels}
for k, (vals, lab) in enumerate(zip(series, labels)):
    offset = (2 * k - len(series) + 1) / 2 * width
    bars = ax.bar(xs + offset, vals, width, label=lab, edgecolor=\"k\", linewidth=0.4)
    for b, v in zip(bars, vals):
        if np.isnan(v):
            ax.text(b.get_x() + b.get_width() / 2, 0.0, \"-\", ha=\"center\", va=\"bottom\", fontsize=9)
        else:
            ax.text(b.get_x() + b.get_width() / 2, v + 0.015 * max(1.0, v), \"%.{precision}f\" % v, ha=\"center\", va=\"bottom\", fontsize=9)
ax.set_xticks(xs)
ax.set_xticklabels({ticks})
ax.grid(axis=\"y\", linestyle=\"--\", linewidth=0.6, alpha=0.6)
ax.set_axisbelow(True)",
            n = self.traces.len(),
            width = 0.8 / self.series.len().max(1) as f64,
            values = values.join(", "),
            labels = py_str_list(&labels),
            precision = self.precision,
            ticks = py_tick_labels(&self.traces),
        )
    }
}

/// A single annotated bar series for ratio charts
#[derive(Clone, Debug)]
pub struct LabeledBars {
    pub traces: Vec<u32>,
    pub values: Vec<Option<f64>>,
    pub precision: usize,
}

impl Matplotlib for LabeledBars {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        format!(
            "\
xs = np.arange({n})
vals = {values}
bars = ax.bar(xs, vals, width=0.6, color=\"tab:purple\", edgecolor=\"k\", linewidth=0.6)
top = np.nanmax(vals) if np.any(~np.isnan(vals)) else 1.0
for b, v in zip(bars, vals):
    if np.isnan(v):
        ax.text(b.get_x() + b.get_width() / 2, 0.0, \"-\", ha=\"center\", va=\"bottom\", fontsize=10, fontweight=\"bold\")
    else:
        ax.text(b.get_x() + b.get_width() / 2, v + 0.02 * max(1.0, top), \"%.{precision}f\" % v, ha=\"center\", va=\"bottom\", fontsize=10, fontweight=\"bold\")
ax.set_xticks(xs)
ax.set_xticklabels({ticks})
ax.grid(axis=\"y\", linestyle=\"--\", linewidth=0.6, alpha=0.6)
ax.set_axisbelow(True)",
            n = self.traces.len(),
            values = py_float_list(&self.values),
            precision = self.precision,
            ticks = py_tick_labels(&self.traces),
        )
    }
}

/// Dashed horizontal reference line with a right-aligned caption
#[derive(Clone, Debug)]
pub struct RefLine {
    pub y: f64,
    pub caption: String,
}

impl Matplotlib for RefLine {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        format!(
            "\
ax.axhline({y}, linestyle=\"--\", linewidth=1.0, color=\"#333333\", alpha=0.7)
ax.text(0.98, {y} + 0.02, {caption}, ha=\"right\", va=\"bottom\", transform=ax.get_yaxis_transform(), fontsize=9, color=\"#333333\")",
            y = self.y,
            caption = py_str(&self.caption),
        )
    }
}

/// Axis labels, title, optional legend
#[derive(Clone, Debug, Default)]
pub struct Decor {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub legend: bool,
}

impl Matplotlib for Decor {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        let mut lines = vec![
            format!("ax.set_xlabel({})", py_str(&self.xlabel)),
            format!("ax.set_ylabel({})", py_str(&self.ylabel)),
            format!("ax.set_title({}, pad=14)", py_str(&self.title)),
        ];
        if self.legend {
            lines.push("ax.legend(frameon=True, edgecolor=\"#444444\")".to_string());
        }
        lines.push("fig.tight_layout()".to_string());
        lines.join("\n")
    }
}

/// The summary table rendered as an image: bold header row, alternating row
/// shading, cells already formatted as text
#[derive(Clone, Debug)]
pub struct TableImage {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Matplotlib for TableImage {
    fn is_prelude(&self) -> bool {
        false
    }

    fn data(&self) -> Option<Value> {
        None
    }

    fn py_cmd(&self) -> String {
        let rows: Vec<String> = self.rows.iter().map(|row| py_str_list(row)).collect();
        format!(
            "\
ax.axis(\"off\")
cols = {cols}
cells = [{cells}]
tab = ax.table(cellText=cells, colLabels=cols, loc=\"center\", cellLoc=\"center\", colWidths=[1.0 / max(1, len(cols))] * len(cols))
tab.auto_set_font_size(False)
tab.set_fontsize(max(8, min(12, int(180 / max(6, len(cols))))))
for (row, col), cell in tab.get_celld().items():
    if row == 0:
        cell.set_facecolor(\"#2E4053\")
        cell.set_text_props(weight=\"bold\", color=\"white\")
    else:
        cell.set_facecolor([\"#ffffff\", \"#f7fbfc\"][(row - 1) % 2])
        if col == 0:
            cell.set_text_props(weight=\"bold\")
tab.scale(1, 1.15)
ax.text(0.5, 0.98, {title}, fontsize=14, fontweight=\"bold\", ha=\"center\", va=\"top\", transform=fig.transFigure)",
            cols = py_str_list(&self.columns),
            cells = rows.join(", "),
            title = py_str(&self.title),
        )
    }
}

/// Writes chart artifacts into one output directory, overwriting previous
/// runs idempotently
#[derive(Debug)]
pub struct Renderer {
    out_dir: PathBuf,
}

impl Renderer {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> anyhow::Result<Renderer> {
        std::fs::create_dir_all(&out_dir)?;
        Ok(Renderer {
            out_dir: out_dir.as_ref().to_path_buf(),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn fig_width(groups: usize) -> f64 {
        (groups as f64 * 1.4).max(7.0)
    }

    /// Grouped bar chart for one metric. Returns the artifact path, or None
    /// when there is nothing to draw.
    pub fn metric_chart(&self, table: &MetricTable, metric: Metric) -> Option<PathBuf> {
        let pivot = table.pivot(metric);
        let defined = pivot
            .values()
            .flat_map(|values| values.iter())
            .any(|value| value.is_some());
        if pivot.is_empty() || !defined {
            warn!("No data for {}, skipping chart", metric.label());
            return None;
        }

        let traces: Vec<u32> = pivot.keys().copied().collect();
        let series: Vec<(String, Vec<Option<f64>>)> = table
            .policies()
            .iter()
            .enumerate()
            .map(|(k, policy)| {
                let values = pivot.values().map(|row| row[k]).collect();
                (policy.clone(), values)
            })
            .collect();

        let path = self.out_dir.join(format!("{}.png", metric.key()));
        Mpl::new()
            & AggPrelude
            & FigInit {
                width: Self::fig_width(traces.len()),
                height: 5.0,
            }
            & GroupedBars {
                traces,
                series,
                precision: metric.precision(),
            }
            & Decor {
                title: format!("{}: {}", metric.label(), table.policies().join(" vs ")),
                xlabel: "Trace number".to_string(),
                ylabel: metric.label().to_string(),
                legend: true,
            }
            | Run::Save(path.clone());
        println!("Saved plot: {}", path.display());
        Some(path)
    }

    /// IPC speedup chart of `numerator` over `denominator`, anchored by a
    /// reference line at 1.0. Returns None when no ratio is defined.
    pub fn speedup_chart(
        &self,
        table: &MetricTable,
        numerator: &str,
        denominator: &str,
    ) -> Option<PathBuf> {
        let ratios = table.ratio(Metric::Ipc, numerator, denominator);
        if ratios.is_empty() || ratios.values().all(|ratio| ratio.is_none()) {
            warn!("No defined speedup values, skipping speedup chart");
            return None;
        }

        let traces: Vec<u32> = ratios.keys().copied().collect();
        let values: Vec<Option<f64>> = ratios.values().copied().collect();

        let path = self.out_dir.join("ipc_speedup.png");
        Mpl::new()
            & AggPrelude
            & FigInit {
                width: Self::fig_width(traces.len()),
                height: 5.0,
            }
            & LabeledBars {
                traces,
                values,
                precision: Metric::Ipc.precision(),
            }
            & RefLine {
                y: 1.0,
                caption: "baseline = 1.0".to_string(),
            }
            & Decor {
                title: format!("IPC speedup: {} / {} (baseline)", numerator, denominator),
                xlabel: "Trace number".to_string(),
                ylabel: format!("IPC speedup ({} / {})", numerator, denominator),
                legend: false,
            }
            | Run::Save(path.clone());
        println!("Saved speedup plot: {}", path.display());
        Some(path)
    }

    /// Summary table image. Returns None when there are no rows.
    pub fn summary_table(
        &self,
        title: &str,
        columns: &[String],
        rows: &[Vec<String>],
    ) -> Option<PathBuf> {
        if rows.is_empty() {
            warn!("No summary rows, skipping table image");
            return None;
        }

        let width = (columns.len() as f64 * 1.6).max(6.0);
        let height = (rows.len() as f64 * 0.45 + 0.8).max(2.4);
        let path = self.out_dir.join("metrics_summary_table.png");
        Mpl::new()
            & AggPrelude
            & FigInit { width, height }
            & TableImage {
                title: title.to_string(),
                columns: columns.to_vec(),
                rows: rows.to_vec(),
            }
            | Run::Save(path.clone());
        println!("Saved table image: {}", path.display());
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricTable;
    use tempfile::TempDir;

    #[test]
    fn undefined_values_become_nan_literals() {
        assert_eq!(
            py_float_list(&[Some(1.5), None]),
            "[1.5, float(\"nan\")]"
        );
    }

    #[test]
    fn python_strings_are_escaped() {
        assert_eq!(py_str("a \"b\""), "\"a \\\"b\\\"\"");
    }

    #[test]
    fn grouped_bars_annotate_at_metric_precision() {
        let cmd = GroupedBars {
            traces: vec![1, 2],
            series: vec![
                ("exclusive".to_string(), vec![Some(1.8), None]),
                ("noninclusive".to_string(), vec![Some(1.5), Some(0.9)]),
            ],
            precision: 3,
        }
        .py_cmd();
        assert!(cmd.contains("%.3f"));
        assert!(cmd.contains("[\"1\", \"2\"]"));
        assert!(cmd.contains("float(\"nan\")"));
    }

    #[test]
    fn ref_line_draws_at_requested_height() {
        let cmd = RefLine {
            y: 1.0,
            caption: "baseline = 1.0".to_string(),
        }
        .py_cmd();
        assert!(cmd.contains("ax.axhline(1"));
        assert!(cmd.contains("baseline = 1.0"));
    }

    #[test]
    fn renderer_creates_the_output_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("plots");
        let renderer = Renderer::new(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(renderer.out_dir(), out.as_path());
    }

    #[test]
    fn empty_table_skips_rendering() {
        let dir = TempDir::new().unwrap();
        let renderer = Renderer::new(dir.path()).unwrap();
        let table = MetricTable::from_runs(vec![
            ("exclusive".to_string(), vec![]),
            ("noninclusive".to_string(), vec![]),
        ]);
        assert_eq!(renderer.metric_chart(&table, Metric::Ipc), None);
        assert_eq!(
            renderer.speedup_chart(&table, "exclusive", "noninclusive"),
            None
        );
        assert_eq!(renderer.summary_table("title", &[], &[]), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
