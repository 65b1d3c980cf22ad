//! Fragment loading from plain-line, FASTA and FASTQ files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;
use log::debug;

/// Errors returned while reading fragment files.
#[derive(thiserror::Error, Debug)]
pub enum FragmentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record in {path}: {message}")]
    Record { path: PathBuf, message: String },
    #[error("non-UTF-8 fragment in {0}")]
    Encoding(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentFormat {
    Fastq,
    Fasta,
    Lines,
}

const GZIP_EXTENSIONS: &[&str] = &["gz", "bgz"];
const FASTQ_EXTENSIONS: &[&str] = &["fastq", "fq"];
const FASTA_EXTENSIONS: &[&str] = &["fasta", "fa", "fna", "fas"];

fn has_extension(path: &Path, known: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| known.iter().any(|k| ext.eq_ignore_ascii_case(k)))
}

/// The path a gzip suffix wraps (`reads.fq.gz` -> `reads.fq`), if any.
fn gzip_inner(path: &Path) -> Option<&Path> {
    if has_extension(path, GZIP_EXTENSIONS) {
        path.file_stem().map(Path::new)
    } else {
        None
    }
}

/// Record format named by the extension. Anything unrecognised, including
/// benchmark instances such as `10.500-100` or `3.200+20.txt`, is one
/// fragment per line.
pub fn infer_format(path: &Path) -> FragmentFormat {
    let inner = gzip_inner(path).unwrap_or(path);
    if has_extension(inner, FASTQ_EXTENSIONS) {
        FragmentFormat::Fastq
    } else if has_extension(inner, FASTA_EXTENSIONS) {
        FragmentFormat::Fasta
    } else {
        FragmentFormat::Lines
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, FragmentError> {
    let file = File::open(path).map_err(|source| FragmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if gzip_inner(path).is_some() {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn record_text(path: &Path, bytes: &[u8]) -> Result<String, FragmentError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| FragmentError::Encoding(path.to_path_buf()))
}

/// Read every fragment in `path`, in file order.
pub fn read_fragments(path: &Path) -> Result<Vec<String>, FragmentError> {
    let format = infer_format(path);
    let reader = open_reader(path)?;
    let record_error = |message: String| FragmentError::Record {
        path: path.to_path_buf(),
        message,
    };

    let fragments = match format {
        FragmentFormat::Fastq => {
            let mut fragments = Vec::new();
            for record in fastq::Reader::new(reader).records() {
                let record = record.map_err(|e| record_error(e.to_string()))?;
                fragments.push(record_text(path, record.seq())?);
            }
            fragments
        }
        FragmentFormat::Fasta => {
            let mut fragments = Vec::new();
            for record in fasta::Reader::new(reader).records() {
                let record = record.map_err(|e| record_error(e.to_string()))?;
                fragments.push(record_text(path, record.seq())?);
            }
            fragments
        }
        FragmentFormat::Lines => {
            let mut fragments = Vec::new();
            for line in reader.lines() {
                let line = line.map_err(|source| FragmentError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    fragments.push(trimmed.to_string());
                }
            }
            fragments
        }
    };

    debug!(
        "Read {} fragments from {} ({:?})",
        fragments.len(),
        path.display(),
        format
    );
    Ok(fragments)
}
