//src/aggregate.rs

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use std::path::PathBuf;

use crate::errors::SampleError;
use crate::sample_file::read_sample_file;
use crate::tables::{AbundanceTable, TaxonomyTable};
use crate::types::{Rank, SampleFile, Taxonomy};

/// Totals of one identifier within one file.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierSummary {
    pub identifier: String,
    /// Sum of the abundance of every row carrying this identifier.
    pub abundance: f64,
    /// First value seen for each rank, in file line order.
    pub taxonomy: Option<Taxonomy>,
}

/// One file reduced to a single entry per identifier, sorted by identifier.
#[derive(Debug, Clone)]
pub struct SampleSummary {
    pub path: PathBuf,
    pub sample_name: String,
    pub identifiers: Vec<IdentifierSummary>,
    pub missing_ranks: Vec<&'static str>,
    pub rejected_rows: usize,
}

impl SampleSummary {
    pub fn has_taxonomy(&self) -> bool {
        self.missing_ranks.is_empty()
    }
}

/// Groups a file's rows by identifier.
///
/// Abundances are summed. For each rank the first non-empty value in line
/// order is kept; ranks empty in every row stay empty.
pub fn summarize_sample(sample: SampleFile) -> SampleSummary {
    let mut positions: AHashMap<String, usize> = AHashMap::new();
    let mut identifiers: Vec<IdentifierSummary> = Vec::new();

    for row in sample.rows {
        match positions.get(&row.identifier).copied() {
            Some(pos) => {
                let summary = &mut identifiers[pos];
                summary.abundance += row.abundance;
                if let (Some(kept), Some(next)) = (summary.taxonomy.as_mut(), row.taxonomy.as_ref()) {
                    for rank in Rank::ALL {
                        if kept.get(rank).is_empty() && !next.get(rank).is_empty() {
                            kept.set(rank, next.get(rank));
                        }
                    }
                }
            }
            None => {
                positions.insert(row.identifier.clone(), identifiers.len());
                identifiers.push(IdentifierSummary {
                    identifier: row.identifier,
                    abundance: row.abundance,
                    taxonomy: row.taxonomy,
                });
            }
        }
    }

    identifiers.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    SampleSummary {
        path: sample.path,
        sample_name: sample.sample_name,
        identifiers,
        missing_ranks: sample.missing_ranks,
        rejected_rows: sample.rejected_rows,
    }
}

/// Counters describing what a run did with its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub files_seen: usize,
    pub files_accepted: usize,
    pub files_skipped: usize,
    pub files_without_taxonomy: usize,
    pub rows_rejected: usize,
}

/// The two finished tables of a run.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub abundance: AbundanceTable,
    pub taxonomy: TaxonomyTable,
    pub stats: AggregationStats,
}

/// Merges per-file summaries in the order they are added.
///
/// Sample columns follow insertion order. Identifier rows follow the order in
/// which identifiers are first seen. The first file that supplies taxonomy for
/// an identifier wins.
#[derive(Debug, Default)]
pub struct Aggregator {
    samples: Vec<String>,
    registered: AHashSet<String>,

    identifiers: Vec<String>,
    /// identifier -> (sample column, per-file sum)
    counts: AHashMap<String, Vec<(usize, f64)>>,

    taxonomy_order: Vec<String>,
    taxonomy: AHashMap<String, Taxonomy>,

    stats: AggregationStats,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one valid file. Fails only if its sample name is already taken,
    /// in which case nothing from the file is kept.
    pub fn add_sample(&mut self, summary: SampleSummary) -> Result<(), SampleError> {
        self.stats.files_seen += 1;
        self.stats.rows_rejected += summary.rejected_rows;

        if self.registered.contains(&summary.sample_name) {
            self.stats.files_skipped += 1;
            return Err(SampleError::DuplicateSample {
                path: summary.path,
                sample: summary.sample_name,
            });
        }

        let column = self.samples.len();
        self.registered.insert(summary.sample_name.clone());
        self.samples.push(summary.sample_name.clone());
        self.stats.files_accepted += 1;

        let with_taxonomy = summary.has_taxonomy();
        if !with_taxonomy {
            self.stats.files_without_taxonomy += 1;
            log::warn!(
                "Missing taxonomy columns {:?} in file {}. Skipping taxonomy info for this file.",
                summary.missing_ranks,
                summary.path.display()
            );
        }

        for entry in summary.identifiers {
            if !self.counts.contains_key(&entry.identifier) {
                self.identifiers.push(entry.identifier.clone());
            }
            self.counts
                .entry(entry.identifier.clone())
                .or_default()
                .push((column, entry.abundance));

            if !with_taxonomy {
                continue;
            }
            if let Some(taxonomy) = entry.taxonomy {
                if !self.taxonomy.contains_key(&entry.identifier) {
                    self.taxonomy_order.push(entry.identifier.clone());
                    self.taxonomy.insert(entry.identifier, taxonomy);
                }
            }
        }

        log::debug!(
            "Added sample '{}' as column {}",
            self.samples[column],
            column + 1
        );
        Ok(())
    }

    /// Records a file that could not be used at all.
    pub fn skip_file(&mut self, err: &SampleError) {
        self.stats.files_seen += 1;
        self.stats.files_skipped += 1;
        log::warn!("{}. Skipping this file.", err);
    }

    fn add_summary_or_skip(&mut self, summary: SampleSummary) {
        if let Err(err) = self.add_sample(summary) {
            log::warn!("{}. Skipping this file.", err);
        }
    }

    pub fn stats(&self) -> AggregationStats {
        self.stats
    }

    /// Builds the dense abundance grid and the taxonomy table.
    pub fn finish(mut self) -> Aggregation {
        let width = self.samples.len();
        let mut rows = Vec::with_capacity(self.identifiers.len());
        for identifier in self.identifiers {
            let mut values = vec![0.0; width];
            if let Some(cells) = self.counts.remove(&identifier) {
                for (column, abundance) in cells {
                    values[column] = abundance;
                }
            }
            rows.push((identifier, values));
        }

        let mut records = Vec::with_capacity(self.taxonomy_order.len());
        for identifier in self.taxonomy_order {
            if let Some(taxonomy) = self.taxonomy.remove(&identifier) {
                records.push((identifier, taxonomy));
            }
        }

        Aggregation {
            abundance: AbundanceTable::from_rows(self.samples, rows),
            taxonomy: TaxonomyTable::from_records(records),
            stats: self.stats,
        }
    }
}

/// Reads every file and merges them in the given order.
///
/// Files are read and grouped in parallel; merging is sequential, so the
/// result depends only on the order of `paths`.
pub fn aggregate_sample_files(paths: &[PathBuf]) -> Aggregation {
    let summaries: Vec<Result<SampleSummary, SampleError>> = paths
        .par_iter()
        .map(|path| read_sample_file(path).map(summarize_sample))
        .collect();

    let mut aggregator = Aggregator::new();
    for summary in summaries {
        match summary {
            Ok(summary) => aggregator.add_summary_or_skip(summary),
            Err(err) => aggregator.skip_file(&err),
        }
    }

    let aggregation = aggregator.finish();
    let stats = aggregation.stats;
    log::info!(
        "Aggregated {} of {} file(s) ({} skipped, {} without taxonomy, {} row(s) rejected): {} identifier(s), {} with taxonomy",
        stats.files_accepted,
        stats.files_seen,
        stats.files_skipped,
        stats.files_without_taxonomy,
        stats.rows_rejected,
        aggregation.abundance.len(),
        aggregation.taxonomy.len()
    );
    aggregation
}
