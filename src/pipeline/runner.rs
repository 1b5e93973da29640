//! End-to-end execution of a run.

use crate::config::RunConfig;
use crate::data::{AllelicProfiles, Metadata, Table};
use crate::error::{ClusterError, Result};
use crate::partition::Partitioner;
use crate::pipeline::group::{GroupMetrics, GroupSettings, Services};
use crate::pipeline::orchestrator::{cleanup, process_groups, stage_groups, StagingOptions};
use crate::report::{build_line_lists, compile_group_data, order_columns, sample_overlap};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Sample counts of the profile and metadata inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleCounts {
    pub profile: usize,
    pub metadata: usize,
    pub in_both: usize,
    pub profile_only: usize,
    pub metadata_only: usize,
    /// Samples placed in a group.
    pub grouped: usize,
}

/// Group counts by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
    pub total: usize,
    pub clustered: usize,
    pub skipped: usize,
}

/// Contents of `run.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub parameters: RunConfig,
    pub analysis_start: DateTime<Utc>,
    pub analysis_end: DateTime<Utc>,
    pub samples: SampleCounts,
    pub groups: GroupCounts,
    pub threshold_map: IndexMap<String, f64>,
}

fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn prepare_outdir(config: &RunConfig) -> Result<()> {
    let outdir = &config.outdir;
    if outdir.is_dir() && !config.force {
        return Err(ClusterError::Config(format!(
            "folder {:?} already exists, please choose new directory or use --force",
            outdir
        )));
    }
    fs::create_dir_all(outdir)?;
    Ok(())
}

/// Run the default distance and clustering services over every group.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    run_with(config, &Services::from_config(config))
}

/// Run with caller-supplied services.
pub fn run_with(config: &RunConfig, services: &Services) -> Result<RunReport> {
    let analysis_start = Utc::now();
    if !config.profile_file.is_file() {
        return Err(ClusterError::InputNotFound(config.profile_file.clone()));
    }
    if !config.metadata_file.is_file() {
        return Err(ClusterError::InputNotFound(config.metadata_file.clone()));
    }
    prepare_outdir(config)?;
    let outdir = config.outdir.as_path();

    let (profiles, allele_map) = AllelicProfiles::from_tsv(&config.profile_file)?;
    if profiles.n_loci() == 0 {
        return Err(ClusterError::EmptyData(format!(
            "profile file {:?} has no loci",
            config.profile_file
        )));
    }
    let metadata = Metadata::from_tsv(&config.metadata_file, &config.id_col)?;
    info!(
        profiles = profiles.n_samples(),
        loci = profiles.n_loci(),
        metadata = metadata.n_samples(),
        "loaded inputs"
    );
    write_json(&allele_map, outdir.join("allele_map.json"))?;
    write_json(&config.thresholds.threshold_map(), outdir.join("threshold_map.json"))?;

    let overlap = sample_overlap(profiles.sample_ids(), &metadata.sample_ids());
    overlap.to_table().to_tsv(outdir.join("metadata.overlap.tsv"))?;
    if overlap.profile_only() > 0 {
        warn!(n = overlap.profile_only(), "profiled samples have no metadata");
    }

    let partition = Partitioner::new(&metadata, &config.partition_col)?.partition(profiles.sample_ids());
    info!(
        groups = partition.groups.len(),
        samples = partition.n_samples(),
        "partitioned samples"
    );

    let options = StagingOptions {
        skip_qc: config.skip_qc,
        missing_thresh: config.missing_thresh,
    };
    let tasks = stage_groups(&partition, &profiles, &metadata, outdir, options)?;
    let outcomes = process_groups(&tasks, services, &GroupSettings::from(config), config.num_threads)?;
    cleanup(outdir, &tasks, &outcomes)?;

    let clustered: Vec<&GroupMetrics> = outcomes
        .iter()
        .map(|o| &o.metrics)
        .filter(|m| m.is_clustered())
        .collect();
    let groups = GroupCounts {
        total: outcomes.len(),
        clustered: clustered.len(),
        skipped: outcomes.len() - clustered.len(),
    };
    info!(clustered = groups.clustered, skipped = groups.skipped, "groups processed");

    let header: Vec<String> = if config.summary_columns.is_empty() {
        vec![config.partition_col.clone()]
    } else {
        config.summary_columns.keys().cloned().collect()
    };
    let retained: Vec<GroupMetrics> = clustered.into_iter().cloned().collect();
    let summary = compile_group_data(
        &retained,
        &config.summary_columns,
        &config.partition_col,
        &header,
    );
    order_columns(&summary, &config.summary_columns, config.restrict_output)
        .to_tsv(outdir.join("cluster_summary.tsv"))?;

    let enriched: Vec<&Table> = outcomes
        .iter()
        .filter(|o| o.metrics.is_clustered())
        .map(|o| &o.metadata)
        .collect();
    let lists = build_line_lists(
        &metadata,
        &enriched,
        &config.linelist_columns,
        config.restrict_output,
    )?;
    lists.included.to_tsv(outdir.join("metadata.included.tsv"))?;
    lists.excluded.to_tsv(outdir.join("metadata.excluded.tsv"))?;

    let report = RunReport {
        parameters: config.clone(),
        analysis_start,
        analysis_end: Utc::now(),
        samples: SampleCounts {
            profile: profiles.n_samples(),
            metadata: metadata.n_samples(),
            in_both: overlap.in_both(),
            profile_only: overlap.profile_only(),
            metadata_only: overlap.metadata_only(),
            grouped: partition.n_samples(),
        },
        groups,
        threshold_map: config.thresholds.threshold_map(),
    };
    write_json(&report, outdir.join("run.json"))?;
    info!(outdir = %outdir.display(), "run complete");
    Ok(report)
}
