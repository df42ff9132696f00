use std::fs;
use std::io::Write;
use std::path::Path;

use make_phyloseq_files::{
    aggregate_sample_files, collect_inputs, make_phyloseq_files, AggregateError, Rank, RunConfig,
};

const HEADER: &str =
    "Target_ID\testimated counts\tspecies\tgenus\tfamily\torder\tclass\tphylum\tsuperkingdom";

/// A data line with every rank filled in as `<tag>_<rank>`.
fn line(id: &str, count: &str, tag: &str) -> String {
    let ranks: Vec<String> = ["species", "genus", "family", "order", "class", "phylum", "superkingdom"]
        .iter()
        .map(|rank| format!("{}_{}", tag, rank))
        .collect();
    format!("{}\t{}\t{}", id, count, ranks.join("\t"))
}

fn write_sample(dir: &Path, name: &str, header: &str, lines: &[String]) {
    let mut text = String::from(header);
    text.push('\n');
    for l in lines {
        text.push_str(l);
        text.push('\n');
    }
    fs::write(dir.join(name), text).expect("write sample");
}

fn config_for(input: &Path, output: &Path) -> RunConfig {
    let mut config = RunConfig::new(input);
    config.otu_path = output.join("otu_table.tsv");
    config.tax_path = output.join("tax_table.tsv");
    config
}

#[test]
fn two_samples_sum_within_file_and_first_taxonomy_wins() {
    let input = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    write_sample(
        input.path(),
        "S1.tsv",
        HEADER,
        &[line("OTU1", "5", "A"), line("OTU1", "3", "A")],
    );
    write_sample(
        input.path(),
        "S2.tsv",
        HEADER,
        &[line("OTU1", "7", "B"), line("OTU2", "2", "C")],
    );

    let config = config_for(input.path(), output.path());
    let summary = make_phyloseq_files(&config).expect("run failed");
    assert_eq!(summary.samples, 2);
    assert_eq!(summary.identifiers, 2);
    assert_eq!(summary.taxonomy_rows, 2);

    let otu = fs::read_to_string(&config.otu_path).unwrap();
    assert_eq!(otu, "Target_ID\tS1\tS2\nOTU1\t8.0\t7.0\nOTU2\t0.0\t2.0\n");

    let tax = fs::read_to_string(&config.tax_path).unwrap();
    let mut lines = tax.lines();
    assert_eq!(
        lines.next(),
        Some("Target_ID\tKingdom\tPhylum\tClass\tOrder\tFamily\tGenus\tSpecies")
    );
    assert_eq!(
        lines.next(),
        Some("OTU1\tA_superkingdom\tA_phylum\tA_class\tA_order\tA_family\tA_genus\tA_species")
    );
    assert_eq!(
        lines.next(),
        Some("OTU2\tC_superkingdom\tC_phylum\tC_class\tC_order\tC_family\tC_genus\tC_species")
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn file_missing_abundance_column_gets_no_column() {
    let input = tempfile::tempdir().expect("tempdir");
    write_sample(input.path(), "A.tsv", HEADER, &[line("OTU1", "1", "A")]);
    write_sample(
        input.path(),
        "B.tsv",
        "Target_ID\tspecies",
        &["OTU1\tsomething".to_string()],
    );
    write_sample(input.path(), "C.tsv", "name\testimated counts", &["OTU1\t4".to_string()]);

    let files = collect_inputs(&RunConfig::new(input.path())).expect("discovery failed");
    let result = aggregate_sample_files(&files);

    assert_eq!(result.abundance.samples(), &["A".to_string()]);
    assert_eq!(result.abundance.row("OTU1"), Some(&[1.0][..]));
    assert_eq!(result.stats.files_seen, 3);
    assert_eq!(result.stats.files_skipped, 2);
}

#[test]
fn file_missing_a_rank_column_contributes_abundance_only() {
    let input = tempfile::tempdir().expect("tempdir");
    write_sample(
        input.path(),
        "S1.tsv",
        "Target_ID\testimated counts\tspecies\tgenus\tfamily\torder\tclass\tphylum",
        &["OTU1\t4\ts\tg\tf\to\tc\tp".to_string()],
    );
    write_sample(input.path(), "S2.tsv", HEADER, &[line("OTU2", "1", "B")]);

    let files = collect_inputs(&RunConfig::new(input.path())).expect("discovery failed");
    let result = aggregate_sample_files(&files);

    assert_eq!(result.abundance.get("OTU1", "S1"), Some(4.0));
    assert_eq!(result.abundance.get("OTU1", "S2"), Some(0.0));
    assert!(result.taxonomy.get("OTU1").is_none());
    assert_eq!(
        result.taxonomy.get("OTU2").map(|t| t.get(Rank::Kingdom)),
        Some("B_superkingdom")
    );
    assert_eq!(result.stats.files_without_taxonomy, 1);
}

#[test]
fn empty_input_directory_writes_nothing() {
    let input = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    fs::write(input.path().join("notes.txt"), "not a sample").unwrap();

    let config = config_for(input.path(), output.path());
    let err = make_phyloseq_files(&config).unwrap_err();

    assert!(matches!(err, AggregateError::NoInputFiles { .. }));
    assert!(!config.otu_path.exists());
    assert!(!config.tax_path.exists());
}

#[test]
fn unparseable_file_is_skipped() {
    let input = tempfile::tempdir().expect("tempdir");
    write_sample(input.path(), "S1.tsv", HEADER, &[line("OTU1", "2", "A")]);
    write_sample(
        input.path(),
        "S2.tsv",
        "Target_ID\testimated counts",
        &["OTU1\t1\tspill\tover".to_string()],
    );
    fs::write(input.path().join("S3.tsv"), "").unwrap();

    let files = collect_inputs(&RunConfig::new(input.path())).expect("discovery failed");
    let result = aggregate_sample_files(&files);

    assert_eq!(result.abundance.samples(), &["S1".to_string()]);
    assert_eq!(result.stats.files_skipped, 2);
}

#[test]
fn bad_abundance_drops_only_that_row() {
    let input = tempfile::tempdir().expect("tempdir");
    write_sample(
        input.path(),
        "S1.tsv",
        HEADER,
        &[line("OTU1", "2", "A"), line("OTU1", "lots", "A"), line("OTU2", "1.5", "B")],
    );

    let files = collect_inputs(&RunConfig::new(input.path())).expect("discovery failed");
    let result = aggregate_sample_files(&files);

    assert_eq!(result.abundance.get("OTU1", "S1"), Some(2.0));
    assert_eq!(result.abundance.get("OTU2", "S1"), Some(1.5));
    assert_eq!(result.stats.rows_rejected, 1);
}

#[test]
fn gzipped_inputs_match_plain_inputs() {
    let plain = tempfile::tempdir().expect("tempdir");
    let gzipped = tempfile::tempdir().expect("tempdir");
    let lines = [line("OTU1", "5", "A"), line("OTU1", "3", "A"), line("OTU2", "1", "B")];

    write_sample(plain.path(), "S1.tsv", HEADER, &lines);

    let file = fs::File::create(gzipped.path().join("S1.tsv.gz")).unwrap();
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    writeln!(encoder, "{}", HEADER).unwrap();
    for l in &lines {
        writeln!(encoder, "{}", l).unwrap();
    }
    encoder.finish().unwrap();

    let mut gz_config = RunConfig::new(gzipped.path());
    gz_config.pattern = "*.tsv.gz".to_string();

    let from_plain =
        aggregate_sample_files(&collect_inputs(&RunConfig::new(plain.path())).unwrap());
    let from_gz = aggregate_sample_files(&collect_inputs(&gz_config).unwrap());

    assert_eq!(from_plain.abundance.samples(), from_gz.abundance.samples());
    assert_eq!(from_plain.abundance.identifiers(), from_gz.abundance.identifiers());
    for id in from_plain.abundance.identifiers() {
        assert_eq!(from_plain.abundance.row(id), from_gz.abundance.row(id));
        assert_eq!(from_plain.taxonomy.get(id), from_gz.taxonomy.get(id));
    }
}

#[test]
fn tables_stay_consistent_across_many_files() {
    let input = tempfile::tempdir().expect("tempdir");
    for i in 0..12 {
        let lines: Vec<String> = (0..=i)
            .map(|j| line(&format!("OTU{:02}", j), &format!("{}", j + 1), &format!("T{}", i)))
            .collect();
        let header = if i % 3 == 0 {
            "Target_ID\testimated counts"
        } else {
            HEADER
        };
        let lines: Vec<String> = if i % 3 == 0 {
            lines
                .iter()
                .map(|l| l.split('\t').take(2).collect::<Vec<_>>().join("\t"))
                .collect()
        } else {
            lines
        };
        write_sample(input.path(), &format!("sample_{:02}.tsv", i), header, &lines);
    }

    let files = collect_inputs(&RunConfig::new(input.path())).unwrap();
    let result = aggregate_sample_files(&files);

    assert_eq!(result.abundance.samples().len(), 12);
    for (id, values) in result.abundance.rows() {
        assert_eq!(values.len(), 12);
        let j: usize = id[3..].parse().unwrap();
        for (i, value) in values.iter().enumerate() {
            let expected = if j <= i { (j + 1) as f64 } else { 0.0 };
            assert_eq!(*value, expected, "{} in sample {}", id, i);
        }
    }
    for (id, taxonomy) in result.taxonomy.iter() {
        assert!(result.abundance.contains(id));
        // Every third sample has no rank columns and cannot supply taxonomy.
        let j: usize = id[3..].parse().unwrap();
        let first = (j..12).find(|i| i % 3 != 0).unwrap();
        assert_eq!(taxonomy.get(Rank::Genus), format!("T{}_genus", first));
    }
}
