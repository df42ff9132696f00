//src/errors.rs

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A problem confined to one input file. The run skips the file and goes on.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error reading {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("error reading {}: no header row", .path.display())]
    NoHeader { path: PathBuf },
    #[error("error reading {}: line {line} has {found} fields, header has {expected}", .path.display())]
    RaggedRow {
        path: PathBuf,
        line: u64,
        found: usize,
        expected: usize,
    },
    #[error("column '{column}' not found in {}", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("cannot derive a sample name from {}", .path.display())]
    InvalidSampleName { path: PathBuf },
    #[error("sample '{sample}' from {} was already registered by an earlier file", .path.display())]
    DuplicateSample { path: PathBuf, sample: String },
}

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    #[error("no files matching '{pattern}' in {}", .dir.display())]
    NoInputFiles { dir: PathBuf, pattern: String },
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot move finished table into {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
    #[error("cannot configure worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
