//! Per-trace metrics and the joined comparison table
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Column name of the derived IPC ratio in summary output
pub const SPEEDUP_COLUMN: &str = "speedup_ipc";

/// Scalar metrics extracted from a simulator log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Ipc,
    L1dMpki,
    L2Mpki,
    LlcMpki,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Ipc,
        Metric::L1dMpki,
        Metric::L2Mpki,
        Metric::LlcMpki,
    ];

    /// Stable key used in column names and artifact file names
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Ipc => "ipc",
            Metric::L1dMpki => "l1d_mpki",
            Metric::L2Mpki => "l2_mpki",
            Metric::LlcMpki => "llc_mpki",
        }
    }

    /// Human readable axis/table label
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Ipc => "Cumulative IPC",
            Metric::L1dMpki => "L1D MPKI",
            Metric::L2Mpki => "L2 (L2C) MPKI",
            Metric::LlcMpki => "LLC MPKI",
        }
    }

    /// Decimal places for display: 3 for IPC, 2 for miss rates
    pub fn precision(&self) -> usize {
        match self {
            Metric::Ipc => 3,
            _ => 2,
        }
    }
}

/// Metrics parsed from a single trace result file.
///
/// A metric that was not found in the log text stays `None` and is carried
/// through joins, serialization and rendering as an explicit undefined value.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceResult {
    pub trace: u32,
    pub path: PathBuf,
    pub metrics: BTreeMap<Metric, Option<f64>>,
}

impl TraceResult {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied().flatten()
    }
}

/// IPC ratio of two policies. Undefined when either side is missing or the
/// denominator is zero, never infinite.
pub fn speedup(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// One row of the flattened per-trace summary, serialized to summary.json.
/// Undefined cells serialize as null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub trace: u32,
    pub values: BTreeMap<String, Option<f64>>,
}

/// Outer join of per-policy trace results, keyed by trace number.
///
/// Traces present in only one policy still get a row; the other policy's
/// cells stay undefined. Rows iterate in ascending trace order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    policies: Vec<String>,
    rows: BTreeMap<u32, Vec<Option<BTreeMap<Metric, Option<f64>>>>>,
}

impl MetricTable {
    pub fn from_runs(runs: Vec<(String, Vec<TraceResult>)>) -> MetricTable {
        let policies: Vec<String> = runs.iter().map(|(policy, _)| policy.clone()).collect();
        let mut rows: BTreeMap<u32, Vec<Option<BTreeMap<Metric, Option<f64>>>>> = BTreeMap::new();
        for (index, (policy, results)) in runs.into_iter().enumerate() {
            for result in results {
                let row = rows
                    .entry(result.trace)
                    .or_insert_with(|| vec![None; policies.len()]);
                if row[index].is_some() {
                    warn!(
                        "Duplicate trace {} for policy {}, keeping the first result",
                        result.trace, policy
                    );
                    continue;
                }
                row[index] = Some(result.metrics);
            }
        }
        MetricTable { policies, rows }
    }

    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    pub fn traces(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn policy_index(&self, policy: &str) -> Option<usize> {
        self.policies.iter().position(|p| p == policy)
    }

    pub fn get(&self, trace: u32, policy: &str, metric: Metric) -> Option<f64> {
        let index = self.policy_index(policy)?;
        self.rows
            .get(&trace)?
            .get(index)?
            .as_ref()
            .and_then(|metrics| metrics.get(&metric).copied().flatten())
    }

    /// For one metric, the per-policy values of every trace, in policy
    /// declaration order
    pub fn pivot(&self, metric: Metric) -> BTreeMap<u32, Vec<Option<f64>>> {
        self.rows
            .iter()
            .map(|(&trace, cells)| {
                let values = cells
                    .iter()
                    .map(|cell| {
                        cell.as_ref()
                            .and_then(|metrics| metrics.get(&metric).copied().flatten())
                    })
                    .collect();
                (trace, values)
            })
            .collect()
    }

    /// Per-trace ratio of one policy's metric over another's
    pub fn ratio(
        &self,
        metric: Metric,
        numerator: &str,
        denominator: &str,
    ) -> BTreeMap<u32, Option<f64>> {
        self.traces()
            .map(|trace| {
                (
                    trace,
                    speedup(
                        self.get(trace, numerator, metric),
                        self.get(trace, denominator, metric),
                    ),
                )
            })
            .collect()
    }

    /// Ordered summary columns with their display precision: IPC per policy,
    /// the IPC speedup, then the miss-rate metrics per policy
    pub fn summary_columns(&self) -> Vec<(String, usize)> {
        let mut columns = vec![];
        for policy in &self.policies {
            columns.push((
                format!("{}_{}", policy, Metric::Ipc.key()),
                Metric::Ipc.precision(),
            ));
        }
        columns.push((SPEEDUP_COLUMN.to_string(), Metric::Ipc.precision()));
        for metric in [Metric::L1dMpki, Metric::L2Mpki, Metric::LlcMpki] {
            for policy in &self.policies {
                columns.push((format!("{}_{}", policy, metric.key()), metric.precision()));
            }
        }
        columns
    }

    /// Flatten the table into serializable rows, including the IPC speedup of
    /// `numerator` over `denominator`
    pub fn summary_rows(&self, numerator: &str, denominator: &str) -> Vec<SummaryRow> {
        self.traces()
            .map(|trace| {
                let mut values = BTreeMap::new();
                for policy in &self.policies {
                    for metric in Metric::ALL {
                        values.insert(
                            format!("{}_{}", policy, metric.key()),
                            self.get(trace, policy, metric),
                        );
                    }
                }
                values.insert(
                    SPEEDUP_COLUMN.to_string(),
                    speedup(
                        self.get(trace, numerator, Metric::Ipc),
                        self.get(trace, denominator, Metric::Ipc),
                    ),
                );
                SummaryRow { trace, values }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_value;
    use std::path::PathBuf;

    fn result(trace: u32, ipc: Option<f64>) -> TraceResult {
        let mut metrics: BTreeMap<Metric, Option<f64>> =
            Metric::ALL.iter().map(|m| (*m, None)).collect();
        metrics.insert(Metric::Ipc, ipc);
        TraceResult {
            trace,
            path: PathBuf::from(format!("trace{}.txt", trace)),
            metrics,
        }
    }

    #[test]
    fn speedup_of_defined_values_is_plain_division() {
        assert_eq!(speedup(Some(1.8), Some(1.5)), Some(1.2));
        assert_eq!(format_value(speedup(Some(1.8), Some(1.5)), 3), "1.200");
    }

    #[test]
    fn speedup_with_zero_or_missing_denominator_is_undefined() {
        assert_eq!(speedup(Some(1.8), Some(0.0)), None);
        assert_eq!(speedup(Some(1.8), None), None);
        assert_eq!(speedup(None, Some(1.5)), None);
    }

    #[test]
    fn outer_join_keeps_one_sided_traces() {
        let table = MetricTable::from_runs(vec![
            ("exclusive".to_string(), vec![result(1, Some(1.8)), result(2, Some(2.0))]),
            ("noninclusive".to_string(), vec![result(1, Some(1.5))]),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(2, "exclusive", Metric::Ipc), Some(2.0));
        assert_eq!(table.get(2, "noninclusive", Metric::Ipc), None);

        let ratios = table.ratio(Metric::Ipc, "exclusive", "noninclusive");
        assert_eq!(ratios[&1], Some(1.2));
        assert_eq!(ratios[&2], None);
    }

    #[test]
    fn rows_are_sorted_by_trace_number() {
        let table = MetricTable::from_runs(vec![(
            "exclusive".to_string(),
            vec![result(3, Some(1.0)), result(1, Some(1.0)), result(2, Some(1.0))],
        )]);
        let traces: Vec<u32> = table.traces().collect();
        assert_eq!(traces, vec![1, 2, 3]);
    }

    #[test]
    fn join_is_idempotent() {
        let runs = || {
            vec![
                ("exclusive".to_string(), vec![result(1, Some(1.8)), result(3, None)]),
                ("noninclusive".to_string(), vec![result(1, Some(1.5)), result(2, Some(0.9))]),
            ]
        };
        assert_eq!(MetricTable::from_runs(runs()), MetricTable::from_runs(runs()));
    }

    #[test]
    fn duplicate_traces_within_a_policy_keep_the_first() {
        let table = MetricTable::from_runs(vec![(
            "exclusive".to_string(),
            vec![result(1, Some(1.0)), result(1, Some(9.0))],
        )]);
        assert_eq!(table.get(1, "exclusive", Metric::Ipc), Some(1.0));
    }

    #[test]
    fn pivot_lists_values_in_policy_order() {
        let table = MetricTable::from_runs(vec![
            ("exclusive".to_string(), vec![result(1, Some(1.8))]),
            ("noninclusive".to_string(), vec![result(1, Some(1.5))]),
        ]);
        let pivot = table.pivot(Metric::Ipc);
        assert_eq!(pivot[&1], vec![Some(1.8), Some(1.5)]);
    }

    #[test]
    fn summary_rows_propagate_undefined_as_none() {
        let table = MetricTable::from_runs(vec![
            ("exclusive".to_string(), vec![result(2, Some(1.8))]),
            ("noninclusive".to_string(), vec![]),
        ]);
        let rows = table.summary_rows("exclusive", "noninclusive");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trace, 2);
        assert_eq!(rows[0].values["exclusive_ipc"], Some(1.8));
        assert_eq!(rows[0].values["noninclusive_ipc"], None);
        assert_eq!(rows[0].values[SPEEDUP_COLUMN], None);

        let json = serde_json::to_string(&rows[0]).unwrap();
        assert!(json.contains("\"noninclusive_ipc\":null"));
    }

    #[test]
    fn summary_columns_start_with_ipc_and_speedup() {
        let table = MetricTable::from_runs(vec![
            ("exclusive".to_string(), vec![]),
            ("noninclusive".to_string(), vec![]),
        ]);
        let columns = table.summary_columns();
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            &names[..3],
            &["exclusive_ipc", "noninclusive_ipc", SPEEDUP_COLUMN]
        );
        assert_eq!(columns[0].1, 3);
        assert_eq!(names.len(), 3 + 3 * 2);
    }
}
