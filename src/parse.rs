//! Extraction of scalar metrics from simulator log text
use crate::{Metric, TraceResult};
use log::warn;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Which match of a pattern is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    First,
    /// Logs contain periodic progress snapshots; the final record wins
    Last,
}

/// A named extraction rule: ordered patterns tried until one matches, with
/// the first capture group parsed as the metric value
#[derive(Debug)]
pub struct ExtractRule {
    pub metric: Metric,
    pub occurrence: Occurrence,
    patterns: Vec<Regex>,
}

impl ExtractRule {
    fn new(metric: Metric, occurrence: Occurrence, patterns: &[&str]) -> ExtractRule {
        ExtractRule {
            metric,
            occurrence,
            patterns: patterns
                .iter()
                .map(|pattern| Regex::new(pattern).unwrap())
                .collect(),
        }
    }

    /// Run the rule over raw log text. Returns None when no pattern matches
    /// or the captured text is not a float.
    pub fn extract(&self, text: &str) -> Option<f64> {
        for pattern in &self.patterns {
            let captures = match self.occurrence {
                Occurrence::First => pattern.captures(text),
                Occurrence::Last => pattern.captures_iter(text).last(),
            };
            if let Some(captures) = captures {
                return captures
                    .get(1)
                    .and_then(|value| value.as_str().parse::<f64>().ok());
            }
        }
        None
    }
}

/// The rule table driving one pass over each result file.
///
/// Cache level labels may be separated from their "MPKI:" figure by other
/// statistics lines, so those rules allow up to 200 characters of noise
/// between the label and the value.
#[derive(Debug)]
pub struct Extractor {
    rules: Vec<ExtractRule>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Extractor {
        Extractor {
            rules: vec![
                ExtractRule::new(
                    Metric::Ipc,
                    Occurrence::Last,
                    &[
                        r"CPU\s*0\s+cumulative\s+IPC:\s*([0-9]*\.?[0-9]+)",
                        r"cumulative\s+IPC:\s*([0-9]*\.?[0-9]+)",
                    ],
                ),
                ExtractRule::new(
                    Metric::L1dMpki,
                    Occurrence::First,
                    &[r"L1D(?:\s+TOTAL)?[\s\S]{0,200}?MPKI:\s*([0-9]*\.?[0-9]+)"],
                ),
                ExtractRule::new(
                    Metric::L2Mpki,
                    Occurrence::First,
                    &[
                        r"L2C(?:\s+TOTAL)?[\s\S]{0,200}?MPKI:\s*([0-9]*\.?[0-9]+)",
                        r"\nL2(?:\s+TOTAL)?[\s\S]{0,200}?MPKI:\s*([0-9]*\.?[0-9]+)",
                    ],
                ),
                ExtractRule::new(
                    Metric::LlcMpki,
                    Occurrence::First,
                    &[r"LLC(?:\s+TOTAL)?[\s\S]{0,200}?MPKI:\s*([0-9]*\.?[0-9]+)"],
                ),
            ],
        }
    }

    pub fn rules(&self) -> &[ExtractRule] {
        &self.rules
    }

    /// Run every rule over one log text
    pub fn extract_all(&self, text: &str) -> BTreeMap<Metric, Option<f64>> {
        self.rules
            .iter()
            .map(|rule| (rule.metric, rule.extract(text)))
            .collect()
    }

    /// Read and parse one result file. An unreadable file degrades to a
    /// result with every metric undefined; the batch carries on.
    pub fn parse_trace_file(&self, trace: u32, path: &Path) -> TraceResult {
        let metrics = match std::fs::read(path) {
            Ok(bytes) => self.extract_all(&String::from_utf8_lossy(&bytes)),
            Err(err) => {
                warn!("Could not read {}: {}", path.display(), err);
                Metric::ALL.iter().map(|metric| (*metric, None)).collect()
            }
        };
        TraceResult {
            trace,
            path: path.to_path_buf(),
            metrics,
        }
    }
}
