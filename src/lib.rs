// src/lib.rs
pub mod aggregate;
pub mod discover;
pub mod errors;
pub mod sample_file;
pub mod tables;
pub mod types;

use std::path::{Path, PathBuf};

pub use crate::aggregate::{aggregate_sample_files, Aggregation, AggregationStats, Aggregator};
pub use crate::discover::{discover_sample_files, sample_name};
pub use crate::errors::{AggregateError, SampleError};
pub use crate::sample_file::read_sample_file;
pub use crate::tables::{AbundanceTable, TaxonomyTable};
pub use crate::types::{Rank, Row, SampleFile, Taxonomy};

pub const DEFAULT_PATTERN: &str = "*.tsv";
pub const DEFAULT_OTU_TABLE: &str = "otu_table.tsv";
pub const DEFAULT_TAX_TABLE: &str = "tax_table.tsv";

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the per-sample classifier outputs.
    pub input_dir: PathBuf,
    /// File-name glob matched inside `input_dir`.
    pub pattern: String,
    pub otu_path: PathBuf,
    pub tax_path: PathBuf,
    /// Worker threads for reading inputs; `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl RunConfig {
    pub fn new<P: Into<PathBuf>>(input_dir: P) -> Self {
        Self {
            input_dir: input_dir.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            otu_path: PathBuf::from(DEFAULT_OTU_TABLE),
            tax_path: PathBuf::from(DEFAULT_TAX_TABLE),
            threads: None,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub otu_path: PathBuf,
    pub tax_path: PathBuf,
    pub samples: usize,
    pub identifiers: usize,
    pub taxonomy_rows: usize,
    pub stats: AggregationStats,
}

impl Aggregation {
    /// Writes both tables. Nothing is written until both are fully built.
    pub fn write(&self, otu_path: &Path, tax_path: &Path) -> Result<(), AggregateError> {
        self.abundance.write_tsv(otu_path)?;
        self.taxonomy.write_tsv(tax_path)?;
        Ok(())
    }
}

/// Lists the input files of a run, failing with `NoInputFiles` when the
/// pattern matches nothing.
pub fn collect_inputs(config: &RunConfig) -> Result<Vec<PathBuf>, AggregateError> {
    let files = discover_sample_files(&config.input_dir, &config.pattern)?;
    if files.is_empty() {
        return Err(AggregateError::NoInputFiles {
            dir: config.input_dir.clone(),
            pattern: config.pattern.clone(),
        });
    }
    Ok(files)
}

/// Aggregates `files` on a pool sized by `config.threads`.
pub fn aggregate_with_config(
    config: &RunConfig,
    files: &[PathBuf],
) -> Result<Aggregation, AggregateError> {
    let aggregation = match config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(|| aggregate_sample_files(files)),
        None => aggregate_sample_files(files),
    };
    Ok(aggregation)
}

/// Discovers the inputs, aggregates them and writes the two tables.
///
/// Returns `AggregateError::NoInputFiles` without touching the outputs when
/// the pattern matches nothing. Problems with individual files are logged and
/// those files skipped.
pub fn make_phyloseq_files(config: &RunConfig) -> Result<RunSummary, AggregateError> {
    let files = collect_inputs(config)?;
    let aggregation = aggregate_with_config(config, &files)?;
    aggregation.write(&config.otu_path, &config.tax_path)?;

    Ok(RunSummary {
        otu_path: config.otu_path.clone(),
        tax_path: config.tax_path.clone(),
        samples: aggregation.abundance.samples().len(),
        identifiers: aggregation.abundance.len(),
        taxonomy_rows: aggregation.taxonomy.len(),
        stats: aggregation.stats,
    })
}
