//src/tables.rs

use ahash::AHashMap;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::errors::AggregateError;
use crate::types::{Rank, Taxonomy, IDENTIFIER_COLUMN};

/// Identifier × sample grid of summed abundances. Every cell is present.
#[derive(Debug, Clone, Default)]
pub struct AbundanceTable {
    samples: Vec<String>,
    identifiers: Vec<String>,
    index: AHashMap<String, usize>,
    values: Vec<Vec<f64>>,
}

impl AbundanceTable {
    /// Builds the table from rows in output order. Each row must hold one
    /// value per sample.
    pub fn from_rows(samples: Vec<String>, rows: Vec<(String, Vec<f64>)>) -> Self {
        let mut table = Self {
            samples,
            ..Self::default()
        };
        for (identifier, values) in rows {
            debug_assert_eq!(values.len(), table.samples.len());
            table.index.insert(identifier.clone(), table.identifiers.len());
            table.identifiers.push(identifier);
            table.values.push(values);
        }
        table
    }

    /// Sample columns, in discovery order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// One value per sample column, or `None` for an unknown identifier.
    pub fn row(&self, identifier: &str) -> Option<&[f64]> {
        self.index.get(identifier).map(|&i| self.values[i].as_slice())
    }

    /// The cell for a known identifier and sample; absent combinations are 0.
    pub fn get(&self, identifier: &str, sample: &str) -> Option<f64> {
        let column = self.samples.iter().position(|s| s == sample)?;
        self.row(identifier).map(|values| values[column])
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.identifiers
            .iter()
            .zip(&self.values)
            .map(|(id, values)| (id.as_str(), values.as_slice()))
    }

    /// Writes `Target_ID` plus one column per sample, tab-delimited.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<(), AggregateError> {
        write_table_atomically(path.as_ref(), |writer| {
            writer.write_field(IDENTIFIER_COLUMN)?;
            for sample in &self.samples {
                writer.write_field(sample)?;
            }
            writer.write_record(None::<&[u8]>)?;

            for (identifier, values) in self.rows() {
                writer.write_field(identifier)?;
                for &value in values {
                    writer.write_field(format_abundance(value))?;
                }
                writer.write_record(None::<&[u8]>)?;
            }
            Ok(())
        })
    }
}

/// Identifier → seven rank values, for identifiers that received taxonomy.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTable {
    identifiers: Vec<String>,
    index: AHashMap<String, usize>,
    records: Vec<Taxonomy>,
}

impl TaxonomyTable {
    pub fn from_records(records: Vec<(String, Taxonomy)>) -> Self {
        let mut table = Self::default();
        for (identifier, taxonomy) in records {
            if table.index.contains_key(&identifier) {
                continue;
            }
            table.index.insert(identifier.clone(), table.identifiers.len());
            table.identifiers.push(identifier);
            table.records.push(taxonomy);
        }
        table
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&Taxonomy> {
        self.index.get(identifier).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Taxonomy)> {
        self.identifiers
            .iter()
            .zip(&self.records)
            .map(|(id, taxonomy)| (id.as_str(), taxonomy))
    }

    /// Writes `Target_ID, Kingdom, ..., Species`, tab-delimited. The header
    /// is written even when the table is empty.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<(), AggregateError> {
        write_table_atomically(path.as_ref(), |writer| {
            writer.write_field(IDENTIFIER_COLUMN)?;
            for rank in Rank::ALL {
                writer.write_field(rank.output_column())?;
            }
            writer.write_record(None::<&[u8]>)?;

            for (identifier, taxonomy) in self.iter() {
                writer.write_field(identifier)?;
                for value in taxonomy.values() {
                    writer.write_field(value)?;
                }
                writer.write_record(None::<&[u8]>)?;
            }
            Ok(())
        })
    }
}

/// Integral values keep one decimal (`8.0`), others use the shortest
/// representation that reads back to the same number.
pub fn format_abundance(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Writes through a temporary file next to `path`, then renames it into
/// place, so a failed write never leaves a partial table behind.
fn write_table_atomically<F>(path: &Path, write_rows: F) -> Result<(), AggregateError>
where
    F: FnOnce(&mut csv::Writer<&mut NamedTempFile>) -> csv::Result<()>,
{
    let io_err = |source: std::io::Error| AggregateError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Temp files default to 0600; the tables are meant to be shared like any
    // other output, so ask for 0644 (the process umask still applies).
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(io_err)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(&mut tmp);
        write_rows(&mut writer).map_err(|source| AggregateError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file_mut().sync_all().map_err(io_err)?;

    tmp.persist(path).map_err(|source| AggregateError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
