use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;

use make_phyloseq_files::{
    aggregate_with_config, collect_inputs, AggregateError, RunConfig, DEFAULT_OTU_TABLE,
    DEFAULT_PATTERN, DEFAULT_TAX_TABLE,
};

/// Combine Lemur classification outputs into OTU and Taxonomy tables for
/// phyloseq, using Target_ID as the OTU identifier.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input directory containing the Lemur output files (tab-delimited)
    #[arg(short, long, required = true, value_name = "DIR")]
    input: PathBuf,

    /// Output filename for the OTU table
    #[arg(long, default_value = DEFAULT_OTU_TABLE, value_name = "FILE")]
    otu: PathBuf,

    /// Output filename for the Taxonomy table
    #[arg(long, default_value = DEFAULT_TAX_TABLE, value_name = "FILE")]
    tax: PathBuf,

    /// File pattern to match input files
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Worker threads for reading input files (default: all cores)
    #[arg(short, long, value_name = "N")]
    threads: Option<usize>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl From<&Args> for RunConfig {
    fn from(args: &Args) -> Self {
        let mut config = RunConfig::new(&args.input);
        config.pattern = args.pattern.clone();
        config.otu_path = args.otu.clone();
        config.tax_path = args.tax.clone();
        config.threads = args.threads;
        config
    }
}

fn spinner(color: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(config: &RunConfig) -> Result<(), AggregateError> {
    // 1. Gather input files
    let spinner_discover = spinner("blue");
    spinner_discover.set_message(format!(
        "Gathering '{}' files under {}...",
        config.pattern,
        config.input_dir.display()
    ));
    let files = match collect_inputs(config) {
        Ok(files) => files,
        Err(e) => {
            spinner_discover.finish_and_clear();
            return Err(e);
        }
    };
    spinner_discover.finish_with_message(format!("Found {} file(s).", files.len()));

    // 2. Aggregate
    let spinner_aggregate = spinner("green");
    spinner_aggregate.set_message("Aggregating samples...");
    let aggregation = aggregate_with_config(config, &files)?;
    let stats = aggregation.stats;
    spinner_aggregate.finish_with_message(format!(
        "Aggregated {} sample(s), {} skipped: {} OTU(s), {} with taxonomy.",
        stats.files_accepted,
        stats.files_skipped,
        aggregation.abundance.len(),
        aggregation.taxonomy.len()
    ));

    // 3. Write both tables
    let spinner_write = spinner("yellow");
    spinner_write.set_message("Writing output files...");
    aggregation.write(&config.otu_path, &config.tax_path)?;
    spinner_write.finish_and_clear();

    println!("OTU table written to {}", config.otu_path.display());
    println!("Taxonomy table written to {}", config.tax_path.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    log::debug!("Arguments: {:?}", args);

    let config = RunConfig::from(&args);
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AggregateError::NoInputFiles { .. }) => {
            println!("No files found matching the pattern in the input directory.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Run failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
