//! Group pipeline: staging, parallel per-group processing and the full run.

mod group;
mod orchestrator;
mod runner;

pub use group::{
    process_group, GroupFiles, GroupMetrics, GroupOutcome, GroupSettings, GroupStage, GroupStatus,
    Services, ADDRESS_COLUMN,
};
pub use orchestrator::{cleanup, process_groups, stage_groups, worker_count, StagingOptions};
pub use runner::{run, run_with, GroupCounts, RunReport, SampleCounts};
