//src/types.rs

use std::fmt;
use std::path::PathBuf;

/// Header of the identifier column, in both the inputs and the outputs.
pub const IDENTIFIER_COLUMN: &str = "Target_ID";

/// Header of the abundance column in the per-sample inputs.
pub const ABUNDANCE_COLUMN: &str = "estimated counts";

/// The seven taxonomic ranks carried into the taxonomy table.
/// Declaration order is the output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Column header this rank is read from in a classifier output.
    pub fn input_column(self) -> &'static str {
        match self {
            Rank::Kingdom => "superkingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }

    /// Column header this rank is written under in the taxonomy table.
    pub fn output_column(self) -> &'static str {
        match self {
            Rank::Kingdom => "Kingdom",
            Rank::Phylum => "Phylum",
            Rank::Class => "Class",
            Rank::Order => "Order",
            Rank::Family => "Family",
            Rank::Genus => "Genus",
            Rank::Species => "Species",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output_column())
    }
}

/// One value per rank, indexed by `Rank`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    values: [String; 7],
}

impl Taxonomy {
    pub fn get(&self, rank: Rank) -> &str {
        &self.values[rank.index()]
    }

    pub fn set(&mut self, rank: Rank, value: impl Into<String>) {
        self.values[rank.index()] = value.into();
    }

    /// Values in output column order (Kingdom first).
    pub fn values(&self) -> &[String; 7] {
        &self.values
    }
}

/// A single validated record of a classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub identifier: String,
    pub abundance: f64,
    /// `None` when the file lacks one or more taxonomy columns.
    pub taxonomy: Option<Taxonomy>,
}

/// One parsed per-sample file. Rows keep file line order.
#[derive(Debug, Clone)]
pub struct SampleFile {
    pub path: PathBuf,
    pub sample_name: String,
    pub rows: Vec<Row>,
    /// Input headers of rank columns absent from the file.
    pub missing_ranks: Vec<&'static str>,
    /// Data lines dropped because their abundance cell was unusable.
    pub rejected_rows: usize,
}

impl SampleFile {
    /// Whether the file supplied all seven rank columns.
    pub fn has_taxonomy(&self) -> bool {
        self.missing_ranks.is_empty()
    }
}
