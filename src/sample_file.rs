//src/sample_file.rs

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::discover::{is_gzipped, sample_name};
use crate::errors::SampleError;
use crate::types::{Rank, Row, SampleFile, Taxonomy, ABUNDANCE_COLUMN, IDENTIFIER_COLUMN};

/// Cell values read as "no value". Same set pandas treats as NA by default.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Parses an abundance cell. Missing values count as zero; anything else must
/// be a finite, non-negative number.
pub fn parse_abundance(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return Some(0.0);
    }
    match cell.trim().parse::<f64>() {
        // `+ 0.0` turns -0.0 into 0.0.
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value + 0.0),
        _ => None,
    }
}

/// Reads one classifier output (plain or `.gz`) into a `SampleFile`.
///
/// Fails when the table cannot be parsed or lacks the identifier or abundance
/// column. Missing rank columns are not an error: the rows come back without
/// taxonomy and `missing_ranks` lists the absent headers.
pub fn read_sample_file<P: AsRef<Path>>(path: P) -> Result<SampleFile, SampleError> {
    let path = path.as_ref();
    let sample = sample_name(path).ok_or_else(|| SampleError::InvalidSampleName {
        path: path.to_path_buf(),
    })?;

    let file = File::open(path).map_err(|source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    read_sample_table(BufReader::new(reader), path, sample)
}

/// Parses tab-delimited text with a header row. `path` is only used for
/// diagnostics.
pub fn read_sample_table<R: Read>(
    reader: R,
    path: &Path,
    sample_name: String,
) -> Result<SampleFile, SampleError> {
    let csv_err = |source: csv::Error| SampleError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(SampleError::NoHeader {
            path: path.to_path_buf(),
        });
    }

    let column = |name: &str| headers.iter().position(|h| h == name);

    let id_idx = column(IDENTIFIER_COLUMN).ok_or_else(|| SampleError::MissingColumn {
        path: path.to_path_buf(),
        column: IDENTIFIER_COLUMN,
    })?;
    let abundance_idx = column(ABUNDANCE_COLUMN).ok_or_else(|| SampleError::MissingColumn {
        path: path.to_path_buf(),
        column: ABUNDANCE_COLUMN,
    })?;

    let mut rank_idx = [0usize; 7];
    let mut missing_ranks = Vec::new();
    for rank in Rank::ALL {
        match column(rank.input_column()) {
            Some(idx) => rank_idx[rank.index()] = idx,
            None => missing_ranks.push(rank.input_column()),
        }
    }
    // Output order is Kingdom..Species; report in the classifier's own order.
    missing_ranks.reverse();
    let with_taxonomy = missing_ranks.is_empty();

    let mut rows = Vec::new();
    let mut rejected_rows = 0;

    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() > headers.len() {
            return Err(SampleError::RaggedRow {
                path: path.to_path_buf(),
                line,
                found: record.len(),
                expected: headers.len(),
            });
        }

        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let identifier = cell(id_idx);
        if is_missing(identifier) {
            log::debug!("{}: line {} has no {}, dropping it", path.display(), line, IDENTIFIER_COLUMN);
            continue;
        }

        let abundance = match parse_abundance(cell(abundance_idx)) {
            Some(value) => value,
            None => {
                log::warn!(
                    "{}: line {} has unusable {} value '{}', dropping the row",
                    path.display(),
                    line,
                    ABUNDANCE_COLUMN,
                    cell(abundance_idx)
                );
                rejected_rows += 1;
                continue;
            }
        };

        let taxonomy = if with_taxonomy {
            let mut taxonomy = Taxonomy::default();
            for rank in Rank::ALL {
                let value = cell(rank_idx[rank.index()]);
                if !is_missing(value) {
                    taxonomy.set(rank, value);
                }
            }
            Some(taxonomy)
        } else {
            None
        };

        rows.push(Row {
            identifier: identifier.to_string(),
            abundance,
            taxonomy,
        });
    }

    log::debug!(
        "Read {} row(s) from {} as sample '{}'",
        rows.len(),
        path.display(),
        sample_name
    );

    Ok(SampleFile {
        path: path.to_path_buf(),
        sample_name,
        rows,
        missing_ranks,
        rejected_rows,
    })
}
