//! Cage Similarity: batch driver
//!
//! Three stages, each resumable from the artifacts of the previous one:
//!
//! 1. `persistence`: identifier list + coordinate tables → results table,
//!    times table and one landscape file per computed structure, written as
//!    each structure finishes; identifiers already in the results table are
//!    skipped on rerun
//! 2. `distances`: results table → Betti segregation lists and a
//!    checkpointed bottleneck matrix per comparison dimension
//! 3. `similar`: checkpoint + reference identifier → similarity report

use anyhow::{bail, Context, Result};
use cage_tda::analysis::{
    matrices_from_records, read_checkpoint, DiagramStore, DistanceMatrixBuilder, RankedEntry, SimilarityRanker,
    SimilaritySet,
};
use cage_tda::io::{read_identifier_list, read_results_table, write_lacking_dimension, RESULTS_TABLE};
use cage_tda::{AnalysisConfig, BatchWriter, CsvDirectory, FiltrationEngine};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cage-similarity")]
#[command(version)]
#[command(about = "Topological similarity of molecular cages via persistent homology", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults apply to absent fields)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (overrides the configuration)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute persistence diagrams and landscapes for a batch of structures
    Persistence(PersistenceArgs),
    /// Build bottleneck distance matrices from a results table
    Distances(DistancesArgs),
    /// Rank the structures similar to a reference
    Similar(SimilarArgs),
}

#[derive(Parser, Debug)]
struct PersistenceArgs {
    /// Identifier list, one per line
    #[arg(long, required = true)]
    ids: PathBuf,

    /// Directory of `<id>.csv` coordinate tables
    #[arg(long, required = true)]
    coords: PathBuf,

    /// Output directory
    #[arg(long, short = 'o', default_value = "cage_tda_out")]
    output: PathBuf,
}

#[derive(Parser, Debug)]
struct DistancesArgs {
    /// Results table written by `persistence`
    #[arg(long, required = true)]
    results: PathBuf,

    /// Output directory (the checkpoint lives here)
    #[arg(long, short = 'o', default_value = "cage_tda_out")]
    output: PathBuf,
}

#[derive(Parser, Debug)]
struct SimilarArgs {
    /// Distance checkpoint written by `distances`
    #[arg(long, required = true)]
    checkpoint: PathBuf,

    /// Reference identifier
    #[arg(long, required = true)]
    reference: String,

    /// Homology dimension of the matrix to rank
    #[arg(long, default_value = "2")]
    dimension: usize,

    /// Similarity threshold in (0, 1] (overrides the configuration)
    #[arg(long)]
    threshold: Option<f64>,

    /// Report path (JSON); printed to stdout when absent
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct SimilarityReport<'a> {
    dimension: usize,
    #[serde(flatten)]
    set: &'a SimilaritySet,
    ranked: &'a [RankedEntry],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }
    config.validate().context("Invalid configuration")?;

    if let Some(n) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    let outcome = match cli.command {
        Commands::Persistence(args) => run_persistence(&config, args),
        Commands::Distances(args) => run_distances(&config, args),
        Commands::Similar(args) => run_similar(&config, args),
    };
    if let Err(e) = &outcome {
        error!(error = %format!("{:#}", e), "batch aborted");
    }
    outcome
}

fn run_persistence(config: &AnalysisConfig, args: PersistenceArgs) -> Result<()> {
    let start = Instant::now();
    let ids = read_identifier_list(&args.ids).context("Failed to read identifier list")?;

    let writer = BatchWriter::resume(&args.output)
        .with_context(|| format!("Failed to open batch output {}", args.output.display()))?;
    let pending: Vec<String> = ids.iter().filter(|id| !writer.completed().contains(*id)).cloned().collect();
    info!(
        structures = ids.len(),
        pending = pending.len(),
        coords = %args.coords.display(),
        "starting persistence batch"
    );

    let engine = FiltrationEngine::from_config(config);
    let source = CsvDirectory::new(&args.coords);
    let computed = engine
        .process_batch_into(&pending, &source, &writer)
        .context("Failed to write batch outcomes")?;

    info!(
        results = %args.output.join(RESULTS_TABLE).display(),
        computed,
        skipped = ids.len() - pending.len(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "persistence batch finished"
    );
    Ok(())
}

fn run_distances(config: &AnalysisConfig, args: DistancesArgs) -> Result<()> {
    let records = read_results_table(&args.results)
        .with_context(|| format!("Failed to read results table {}", args.results.display()))?;
    let store = DiagramStore::from_records(records);
    if store.is_empty() {
        bail!("Results table {} has no structures", args.results.display());
    }
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let required = config.required_betti;
    let lacking = store.lacking_dimension(required);
    write_lacking_dimension(
        args.output.join(format!("no_betti_{}.gcd", required)),
        args.output.join(format!("no_betti_{}_diagrams.csv", required)),
        &lacking,
    )
    .context("Failed to write Betti segregation lists")?;
    if !lacking.is_empty() {
        warn!(count = lacking.len(), betti = required, "structures lack the required Betti dimension");
    }

    let builder = DistanceMatrixBuilder::new(&store).with_required_betti(required);
    let checkpoint = args.output.join("distances.jsonl");
    let matrices = builder
        .build_checkpointed(&config.comparison_dimensions, &checkpoint)
        .with_context(|| format!("Failed to build distance matrices into {}", checkpoint.display()))?;

    for (dimension, matrix) in &matrices {
        info!(
            dimension,
            structures = matrix.identifiers().len(),
            pairs = matrix.len(),
            "distance matrix ready"
        );
    }
    Ok(())
}

fn run_similar(config: &AnalysisConfig, args: SimilarArgs) -> Result<()> {
    let threshold = args.threshold.unwrap_or(config.similarity_threshold);
    if !(threshold > 0.0 && threshold <= 1.0) {
        bail!("Threshold must lie in (0, 1], got {}", threshold);
    }

    let records = read_checkpoint(&args.checkpoint)
        .with_context(|| format!("Failed to read checkpoint {}", args.checkpoint.display()))?;
    let matrices = matrices_from_records(&records);
    let Some(matrix) = matrices.get(&args.dimension) else {
        bail!("No Betti-{} distances in {}", args.dimension, args.checkpoint.display());
    };

    let row = matrix.row(&args.reference);
    if row.is_empty() {
        bail!(
            "'{}' is not in the Betti-{} distance matrix (missing, failed or lacking the dimension)",
            args.reference,
            args.dimension
        );
    }

    let ranked = SimilarityRanker::ranked(&row, &args.reference);
    let set = SimilarityRanker::rank(&row, &args.reference, threshold);
    info!(reference = %args.reference, dimension = args.dimension, matches = set.len(), "similarity ranked");

    let report = SimilarityReport {
        dimension: args.dimension,
        set: &set,
        ranked: &ranked,
    };
    match &args.report {
        Some(path) => write_report(path, &report)?,
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn write_report(path: &Path, report: &SimilarityReport<'_>) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("Failed to create report {}", path.display()))?;
    serde_json::to_writer_pretty(file, report).context("Failed to write similarity report")?;
    info!(report = %path.display(), "similarity report written");
    Ok(())
}
