//! Discovery of per-trace result files in a results directory
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    /// The configured results directory is absent
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// The directory exists but no recognizable trace file was found
    #[error("no trace files found in {0}")]
    NoTracesFound(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A result file tagged with the trace number parsed from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSource {
    pub trace: u32,
    pub path: PathBuf,
}

/// How result files are discovered inside a directory
#[derive(Debug, Clone)]
pub enum Discovery {
    /// Probe an explicit ordered list of file names
    Expected(Vec<String>),
    /// Scan the directory for any trace<N>.txt file
    Glob,
}

/// The conventional file names trace1.txt..trace<count>.txt
pub fn expected_filenames(count: u32) -> Vec<String> {
    (1..=count).map(|i| format!("trace{}.txt", i)).collect()
}

/// List existing trace files using one discovery strategy, sorted by trace
/// number. File names whose trace number does not parse are logged and
/// skipped; duplicate trace numbers keep the first file seen.
pub fn discover(dir: &Path, mode: &Discovery) -> Result<Vec<TraceSource>, LocateError> {
    if !dir.is_dir() {
        return Err(LocateError::DirectoryNotFound(dir.to_path_buf()));
    }

    let pattern = Regex::new(r"^trace(\d+)\.txt$").unwrap();
    let names: Vec<String> = match mode {
        Discovery::Expected(names) => names.clone(),
        Discovery::Glob => {
            let entries = std::fs::read_dir(dir).map_err(|source| LocateError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let mut names: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect();
            names.sort();
            names
        }
    };

    let mut found: BTreeMap<u32, PathBuf> = BTreeMap::new();
    for name in names {
        let path = dir.join(&name);
        if !path.is_file() {
            continue;
        }
        let trace = pattern
            .captures(&name)
            .and_then(|captures| captures[1].parse::<u32>().ok());
        let Some(trace) = trace else {
            debug!("Ignoring {}: no trace number in file name", path.display());
            continue;
        };
        if let Some(kept) = found.get(&trace) {
            warn!(
                "Duplicate trace number {}: keeping {}, ignoring {}",
                trace,
                kept.display(),
                path.display()
            );
            continue;
        }
        found.insert(trace, path);
    }

    Ok(found
        .into_iter()
        .map(|(trace, path)| TraceSource { trace, path })
        .collect())
}

/// Probe the conventional file names first and fall back to a wildcard scan.
/// Fails with NoTracesFound when both come up empty.
pub fn locate_traces(dir: &Path, count: u32) -> Result<Vec<TraceSource>, LocateError> {
    let mut sources = discover(dir, &Discovery::Expected(expected_filenames(count)))?;
    if sources.is_empty() {
        sources = discover(dir, &Discovery::Glob)?;
    }
    if sources.is_empty() {
        return Err(LocateError::NoTracesFound(dir.to_path_buf()));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "cumulative IPC: 1.000\n").unwrap();
    }

    #[test]
    fn expected_filenames_are_numbered_from_one() {
        assert_eq!(
            expected_filenames(3),
            vec!["trace1.txt", "trace2.txt", "trace3.txt"]
        );
    }

    #[test]
    fn expected_list_returns_files_in_trace_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "trace2.txt");
        touch(dir.path(), "trace1.txt");

        let sources = locate_traces(dir.path(), 4).unwrap();
        let traces: Vec<u32> = sources.iter().map(|s| s.trace).collect();
        assert_eq!(traces, vec![1, 2]);
    }

    #[test]
    fn falls_back_to_wildcard_scan() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "trace7.txt");

        // trace7.txt is outside the expected trace1..trace4 window
        let sources = locate_traces(dir.path(), 4).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].trace, 7);
    }

    #[test]
    fn unparsable_names_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "trace3.txt");
        touch(dir.path(), "tracefinal.txt");
        touch(dir.path(), "notes.txt");

        let sources = discover(dir.path(), &Discovery::Glob).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].trace, 3);
    }

    #[test]
    fn duplicate_trace_numbers_keep_the_first_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "trace07.txt");
        touch(dir.path(), "trace7.txt");

        let sources = discover(dir.path(), &Discovery::Glob).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].trace, 7);
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(matches!(
            locate_traces(&missing, 4),
            Err(LocateError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn empty_directory_reports_no_traces_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            locate_traces(dir.path(), 4),
            Err(LocateError::NoTracesFound(_))
        ));
    }
}
