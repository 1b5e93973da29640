//! Staging, parallel execution and cleanup across all groups.

use crate::data::{AllelicProfiles, Metadata};
use crate::error::{ClusterError, Result};
use crate::partition::Partition;
use crate::pipeline::group::{process_group, GroupFiles, GroupOutcome, GroupSettings, Services};
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Locus quality filter applied while staging profiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagingOptions {
    pub skip_qc: bool,
    /// Loci missing in a larger fraction of a group's samples are dropped.
    pub missing_thresh: f64,
}

/// `outdir/<token>`, provided the token names a single directory inside `outdir`.
fn group_directory(outdir: &Path, token: &str) -> Result<PathBuf> {
    let mut components = Path::new(token).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(outdir.join(token)),
        _ => Err(ClusterError::Pipeline(format!(
            "group directory '{}' is not a child of {:?}",
            token, outdir
        ))),
    }
}

/// True when `dir` is a direct child of `outdir` named by a plain component.
fn is_group_directory(outdir: &Path, dir: &Path) -> bool {
    match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(name)) => {
            parent == outdir && group_directory(outdir, &name.to_string_lossy()).is_ok()
        }
        _ => false,
    }
}

/// Write each group's profile and metadata subsets into its own directory.
pub fn stage_groups(
    partition: &Partition,
    profiles: &AllelicProfiles,
    metadata: &Metadata,
    outdir: &Path,
    options: StagingOptions,
) -> Result<Vec<GroupFiles>> {
    let mut staged = Vec::with_capacity(partition.groups.len());
    for (group_id, members) in &partition.groups {
        let token = partition.directories.get(group_id).ok_or_else(|| {
            ClusterError::Pipeline(format!("group '{}' has no directory", group_id))
        })?;
        let dir = group_directory(outdir, token)?;
        fs::create_dir_all(&dir)?;
        let files = GroupFiles::new(group_id, &dir);

        let mut subset = profiles.subset_samples(members);
        if !options.skip_qc {
            subset = subset.drop_sparse_loci(options.missing_thresh);
        }
        subset.to_tsv(&files.profile)?;
        metadata.subset_samples(members)?.table().to_tsv(&files.metadata)?;

        debug!(
            group = group_id.as_str(),
            members = members.len(),
            loci = subset.n_loci(),
            "staged group"
        );
        staged.push(files);
    }
    Ok(staged)
}

/// Number of workers: the configured count capped by the available CPUs.
pub fn worker_count(num_threads: usize) -> Result<usize> {
    if num_threads < 1 {
        return Err(ClusterError::ThreadPool(format!(
            "thread count must be at least 1, got {}",
            num_threads
        )));
    }
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Ok(num_threads.min(available))
}

/// Process every group on a bounded worker pool and wait for all of them.
///
/// Results come back in task order. The first failing group fails the run.
pub fn process_groups(
    tasks: &[GroupFiles],
    services: &Services,
    settings: &GroupSettings,
    num_threads: usize,
) -> Result<Vec<GroupOutcome>> {
    let workers = worker_count(num_threads)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ClusterError::ThreadPool(e.to_string()))?;
    info!(groups = tasks.len(), workers, "processing groups");

    pool.install(|| {
        tasks
            .par_iter()
            .map(|files| process_group(files, services, settings))
            .collect::<Result<Vec<_>>>()
    })
}

/// Remove binary matrix artifacts and the directories of skipped groups.
///
/// Must only be called once every group task has returned. Only direct children
/// of `outdir` are ever removed.
pub fn cleanup(outdir: &Path, tasks: &[GroupFiles], outcomes: &[GroupOutcome]) -> Result<()> {
    for (files, outcome) in tasks.iter().zip(outcomes) {
        if !is_group_directory(outdir, &files.directory) {
            return Err(ClusterError::Pipeline(format!(
                "refusing to clean {:?}: not a group directory of {:?}",
                files.directory, outdir
            )));
        }
        if !outcome.metrics.is_clustered() {
            if files.directory.is_dir() {
                fs::remove_dir_all(&files.directory)?;
                debug!(group = files.group_id.as_str(), "removed skipped group directory");
            }
            continue;
        }
        if files.matrix_bin.is_file() {
            fs::remove_file(&files.matrix_bin)?;
        }
    }
    Ok(())
}
