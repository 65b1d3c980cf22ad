//! Benchmark instance discovery, execution and reporting.
//!
//! Instance files are named `<id>.<length><sign><errors>[.ext]`, for example
//! `10.500-100.txt`: instance 10 of an original string of length 500 with 100
//! negative (missing-fragment) errors. A `+` sign marks positive errors.

use std::path::{Path, PathBuf};
use std::time::Instant;

use bio::alignment::distance::levenshtein;
use log::{info, warn};
use serde::Serialize;

use crate::assembly::{assemble, AssemblyConfig, AssemblyError};
use crate::fragments::{read_fragments, FragmentError};

/// Longest pair of strings still compared by edit distance.
const MAX_DISTANCE_LEN: usize = 20_000;

#[derive(thiserror::Error, Debug)]
pub enum InstanceError {
    #[error("failed to list {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no target length for {0}; name it <id>.<length>-<errors> or pass one explicitly")]
    MissingTarget(PathBuf),
    #[error(transparent)]
    Fragments(#[from] FragmentError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Negative,
    Positive,
}

/// Parameters encoded in an instance file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceName {
    pub id: u32,
    pub length: usize,
    pub error_kind: ErrorKind,
    pub errors: usize,
}

impl InstanceName {
    /// Parse `<id>.<length><sign><errors>`, ignoring any trailing extension.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (id, rest) = file_name.split_once('.')?;
        let sign_at = rest.find(|c: char| c == '-' || c == '+')?;
        let (length, rest) = rest.split_at(sign_at);
        let error_kind = if rest.starts_with('-') {
            ErrorKind::Negative
        } else {
            ErrorKind::Positive
        };
        let errors = rest[1..].split('.').next()?;

        Some(Self {
            id: id.parse().ok()?,
            length: length.parse().ok()?,
            error_kind,
            errors: errors.parse().ok()?,
        })
    }
}

/// One benchmark input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub path: PathBuf,
    pub name: Option<InstanceName>,
}

impl Instance {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(InstanceName::parse);
        Self { path, name }
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Instance files in `dir` whose names parse, sorted by file name.
pub fn scan_instances(dir: &Path) -> Result<Vec<Instance>, InstanceError> {
    let scan_error = |source: std::io::Error| InstanceError::Scan {
        path: dir.to_path_buf(),
        source,
    };
    let mut instances = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_error)? {
        let path = entry.map_err(scan_error)?.path();
        if !path.is_file() {
            continue;
        }
        let instance = Instance::new(path);
        if instance.name.is_some() {
            instances.push(instance);
        } else {
            warn!("Skipping {}: not an instance file name", instance.display_name());
        }
    }
    instances.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    info!("Found {} instances in {}", instances.len(), dir.display());
    Ok(instances)
}

/// Settings shared by every instance of a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the length parsed from the file name.
    pub target_length: Option<usize>,
    pub max_offset: usize,
    pub use_threads: bool,
    pub max_workers: usize,
    /// Original string to score the assembly against.
    pub reference: Option<String>,
}

/// Timing and quality figures for one instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceReport {
    pub instance: String,
    pub fragments: usize,
    pub target_length: usize,
    pub assembled_length: usize,
    pub skipped: usize,
    pub rounds: usize,
    pub chains: usize,
    pub elapsed_ms: f64,
    pub edit_distance: Option<usize>,
    #[serde(skip)]
    pub sequence: String,
}

impl InstanceReport {
    pub fn summary(&self) -> String {
        let distance = self
            .edit_distance
            .map(|d| format!(", edit distance {d}"))
            .unwrap_or_default();
        format!(
            "{}: {}/{} characters ({} skipped) from {} fragments, {} rounds, {} chains left, {:.3} ms{}",
            self.instance,
            self.assembled_length.min(self.target_length),
            self.target_length,
            self.skipped,
            self.fragments,
            self.rounds,
            self.chains,
            self.elapsed_ms,
            distance
        )
    }
}

/// Load, assemble and score one instance.
pub fn run_instance(
    instance: &Instance,
    options: &RunOptions,
) -> Result<InstanceReport, InstanceError> {
    let target_length = options
        .target_length
        .or_else(|| instance.name.as_ref().map(|name| name.length))
        .ok_or_else(|| InstanceError::MissingTarget(instance.path.clone()))?;
    let fragments = read_fragments(&instance.path)?;

    let config = AssemblyConfig {
        target_length,
        max_offset: options.max_offset.max(1),
        use_threads: options.use_threads,
        max_workers: options.max_workers,
    };
    let started = Instant::now();
    let assembly = assemble(&fragments, config)?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let edit_distance = options
        .reference
        .as_deref()
        .and_then(|reference| reference_distance(&assembly.sequence, reference));

    Ok(InstanceReport {
        instance: instance.display_name(),
        fragments: fragments.len(),
        target_length,
        assembled_length: assembly.length,
        skipped: assembly.skipped,
        rounds: assembly.rounds,
        chains: assembly.chains,
        elapsed_ms,
        edit_distance,
        sequence: assembly.sequence,
    })
}

/// Edit distance between an assembly and its reference, skipped for inputs
/// too long for the quadratic comparison.
pub fn reference_distance(assembled: &str, reference: &str) -> Option<usize> {
    if assembled.len() > MAX_DISTANCE_LEN || reference.len() > MAX_DISTANCE_LEN {
        info!(
            "Reference check skipped: assembled length {} or reference length {} exceeds {} threshold.",
            assembled.len(),
            reference.len(),
            MAX_DISTANCE_LEN
        );
        return None;
    }
    Some(levenshtein(assembled.as_bytes(), reference.as_bytes()) as usize)
}
