//! gclust - grouped cluster summaries CLI
//!
//! Partitions allelic profiles by a metadata column, clusters each group and
//! writes the cluster summary and line lists.

use clap::{ArgAction, Parser};
use grouped_clusters::config::{RawConfig, RawThresholds, Scalar};
use grouped_clusters::error::Result;
use grouped_clusters::pipeline::run;
use std::path::PathBuf;
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::EnvFilter;

/// Group-wise genetic distance, clustering and outlier summaries
#[derive(Parser)]
#[command(name = "gclust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Allelic profiles TSV
    #[arg(short = 'p', long)]
    profile: Option<PathBuf>,

    /// Sample metadata TSV
    #[arg(short = 'r', long)]
    metadata: Option<PathBuf>,

    /// JSON or YAML configuration; its values take precedence over flags
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long)]
    outdir: Option<PathBuf>,

    /// Metadata column used to partition samples
    #[arg(short = 'a', long = "partition_col")]
    partition_col: Option<String>,

    /// Sample id column of the metadata
    #[arg(short = 'i', long = "id_col")]
    id_col: Option<String>,

    /// Distance above which samples are reported as outliers
    #[arg(long = "outlier_thresh")]
    outlier_thresh: Option<f64>,

    /// Minimum number of members to perform clustering
    #[arg(short = 'm', long = "min_cluster_members", default_value_t = 2)]
    min_cluster_members: i64,

    /// Count a missing allele against a present one as a difference
    #[arg(short = 'n', long = "count_missing")]
    count_missing: bool,

    /// Skip the locus missingness filter
    #[arg(short = 's', long = "skip")]
    skip_qc: bool,

    /// Maximum fraction of missing calls tolerated per locus
    #[arg(long = "missing_thresh", default_value_t = 1.0)]
    missing_thresh: f64,

    /// Comma-delimited, strictly decreasing thresholds
    #[arg(short = 't', long)]
    thresholds: Option<String>,

    /// Separator between levels of a cluster address
    #[arg(short = 'd', long = "delimeter", default_value = ".")]
    delimeter: String,

    /// Linkage method: single, complete or average
    #[arg(short = 'e', long, default_value = "average")]
    method: String,

    /// Tree distances: patristic or cophenetic
    #[arg(long = "tree_distances", default_value = "patristic")]
    tree_distances: String,

    /// Overwrite an existing output directory
    #[arg(short = 'f', long)]
    force: bool,

    /// Number of worker threads
    #[arg(long, default_value_t = 1)]
    cpus: i64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn to_raw(&self) -> RawConfig {
        let flag = |set: bool| set.then_some(Scalar::Bool(true));
        RawConfig {
            profile_file: self.profile.clone(),
            partition_file: self.metadata.clone(),
            outdir: self.outdir.clone(),
            outlier_thresh: self.outlier_thresh.map(Scalar::Float),
            thresholds: self.thresholds.clone().map(RawThresholds::Text),
            method: Some(self.method.clone()),
            tree_distances: Some(self.tree_distances.clone()),
            force: flag(self.force),
            id_col: self.id_col.clone(),
            partition_col: self.partition_col.clone(),
            min_members: Some(Scalar::Int(self.min_cluster_members)),
            count_missing: flag(self.count_missing),
            skip_qc: flag(self.skip_qc),
            missing_thresh: Some(Scalar::Float(self.missing_thresh)),
            delimeter: Some(self.delimeter.clone()),
            num_threads: Some(Scalar::Int(self.cpus)),
            ..RawConfig::default()
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    let _ = set_global_default(subscriber);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cmd_run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(cli: &Cli) -> Result<()> {
    let raw = match &cli.config {
        Some(path) => RawConfig::from_file(path)?.or(cli.to_raw()),
        None => cli.to_raw(),
    };
    let config = raw.validate()?;

    let report = run(&config)?;
    eprintln!(
        "Done! {} groups clustered, {} skipped; results in {:?}",
        report.groups.clustered, report.groups.skipped, config.outdir
    );
    Ok(())
}
