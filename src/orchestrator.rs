//! Top-level build orchestration.
//!
//! One run handles one driver version: expand the matrix, resolve kernels,
//! group platform versions by shared kernel, then walk the groups
//! sequentially (gate, build, push primary tag, push per-platform aliases).
//! A group failure is recorded and the next group still runs; only
//! configuration errors abort the whole run. After the group loop the
//! release-notes document is reconciled.

use anyhow::Result;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::builder::{BuildRequest, BuildWorkspace, ImageBuilder};
use crate::catalog::{CatalogEntry, MatrixRule};
use crate::errors::JobError;
use crate::gate::{self, PublishAction};
use crate::grouping::{self, KernelGroup};
use crate::matrix;
use crate::notes::{self, NotesStore, SyncOutcome};
use crate::registry::{PublishTarget, RegistryClient};
use crate::resolve::{self, DtkInspector};
use crate::timing::{human_duration, Timer};
use crate::version::VersionFilter;

/// Terminal state of one kernel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Built,
    Skipped,
    Failed,
}

/// One kernel group's row in the run summary.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub kernel_version: String,
    pub platform_versions: Vec<String>,
    pub outcome: JobOutcome,
    pub reason: String,
    pub elapsed: Duration,
}

/// What happened to the release-notes document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesStatus {
    /// The run produced no groups, so the document was left alone.
    NotAttempted,
    Updated,
    Unchanged,
    Failed(String),
}

/// Aggregated outcome of a run. The exit decision belongs to the caller;
/// this only reports.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub driver_version: String,
    pub jobs: Vec<JobRecord>,
    pub notes: NotesStatus,
}

impl RunResult {
    fn empty(driver_version: &str) -> Self {
        Self {
            driver_version: driver_version.to_string(),
            jobs: Vec::new(),
            notes: NotesStatus::NotAttempted,
        }
    }

    pub fn built(&self) -> usize {
        self.count(JobOutcome::Built)
    }

    pub fn skipped(&self) -> usize {
        self.count(JobOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(JobOutcome::Failed)
    }

    fn count(&self, outcome: JobOutcome) -> usize {
        self.jobs.iter().filter(|j| j.outcome == outcome).count()
    }

    /// False if any group failed or the notes sync failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && !matches!(self.notes, NotesStatus::Failed(_))
    }

    pub fn print_summary(&self) {
        println!();
        println!("=== Run summary: driver {} ===", self.driver_version);
        for job in &self.jobs {
            let state = match job.outcome {
                JobOutcome::Built => "BUILT",
                JobOutcome::Skipped => "SKIP",
                JobOutcome::Failed => "FAIL",
            };
            println!(
                "  [{}] kernel {} ({}) [{}] - {}",
                state,
                job.kernel_version,
                job.platform_versions.join(", "),
                human_duration(job.elapsed),
                job.reason
            );
        }
        match &self.notes {
            NotesStatus::NotAttempted => {}
            NotesStatus::Updated => println!("  [NOTES] release notes updated"),
            NotesStatus::Unchanged => println!("  [NOTES] release notes already current"),
            NotesStatus::Failed(reason) => println!("  [FAIL] release notes: {}", reason),
        }
        println!(
            "  {} built, {} skipped, {} failed",
            self.built(),
            self.skipped(),
            self.failed()
        );
    }
}

/// Drives a run against injected collaborators. Which registry, which
/// builder, and whether existing tags are honored is decided once at
/// construction; the orchestrator itself never reads the environment.
pub struct BuildOrchestrator<'a> {
    inspector: &'a dyn DtkInspector,
    registry: &'a dyn RegistryClient,
    builder: &'a dyn ImageBuilder,
    notes: &'a dyn NotesStore,
    target: PublishTarget,
    force_rebuild: bool,
    work_dir: PathBuf,
}

impl<'a> BuildOrchestrator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inspector: &'a dyn DtkInspector,
        registry: &'a dyn RegistryClient,
        builder: &'a dyn ImageBuilder,
        notes: &'a dyn NotesStore,
        target: PublishTarget,
        force_rebuild: bool,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            inspector,
            registry,
            builder,
            notes,
            target,
            force_rebuild,
            work_dir,
        }
    }

    /// Execute the full pipeline for one driver version.
    ///
    /// Returns `Err` only for configuration-level problems (empty matrix
    /// selection); group failures are folded into the [`RunResult`].
    pub fn run(
        &self,
        rule: &MatrixRule,
        catalog: &[CatalogEntry],
        filter: &VersionFilter,
    ) -> Result<RunResult> {
        let driver = rule.driver.as_str();

        println!("=== Expanding platform matrix ===");
        let entries = matrix::expand(rule, catalog, filter)?;
        let versions: Vec<&str> = entries.iter().map(|e| e.version.as_str()).collect();
        println!(
            "  {} platform version(s) selected: {}",
            entries.len(),
            versions.join(", ")
        );

        println!("=== Resolving kernels ===");
        let timer = Timer::start("kernel resolution");
        let jobs = resolve::resolve_all(&entries, self.inspector);
        timer.finish();
        if jobs.is_empty() {
            eprintln!("  [WARN] No kernels resolved; nothing to build");
            return Ok(RunResult::empty(driver));
        }

        let groups = grouping::group(&jobs);
        println!(
            "  {} unique kernel(s) across {} platform version(s)",
            groups.len(),
            jobs.len()
        );

        println!("=== Processing kernel groups ===");
        let mut result = RunResult::empty(driver);
        for (kernel, group) in &groups {
            result.jobs.push(self.process_group(driver, kernel, group));
        }

        println!("=== Synchronizing release notes ===");
        result.notes =
            match notes::sync(self.notes, self.registry, &self.target, driver, &groups) {
                Ok(SyncOutcome::Updated) => NotesStatus::Updated,
                Ok(SyncOutcome::Unchanged) => NotesStatus::Unchanged,
                Err(e) => {
                    println!("  [FAIL] Release notes sync: {:#}", e);
                    NotesStatus::Failed(format!("{:#}", e))
                }
            };

        Ok(result)
    }

    fn process_group(&self, driver: &str, kernel: &str, group: &KernelGroup) -> JobRecord {
        let started = Instant::now();
        let platforms: Vec<String> =
            group.platform_versions().map(str::to_string).collect();
        let tag = self.target.kernel_tag(driver, kernel);

        let decision = gate::decide(self.registry, &self.target, &tag, self.force_rebuild);
        if decision.action == PublishAction::Skip {
            println!("  [SKIP] kernel {}: {}", kernel, decision.reason);
            return JobRecord {
                kernel_version: kernel.to_string(),
                platform_versions: platforms,
                outcome: JobOutcome::Skipped,
                reason: decision.reason,
                elapsed: started.elapsed(),
            };
        }

        println!(
            "  [BUILD] kernel {} ({}; serves {})",
            kernel,
            decision.reason,
            platforms.join(", ")
        );
        let (outcome, reason) = match self.build_group(driver, kernel, group, &tag) {
            Ok(()) => {
                println!(
                    "  [BUILT] kernel {} in {}",
                    kernel,
                    human_duration(started.elapsed())
                );
                (JobOutcome::Built, decision.reason)
            }
            Err(e) => {
                println!("  [FAIL] kernel {}: {}", kernel, e);
                (JobOutcome::Failed, e.to_string())
            }
        };

        JobRecord {
            kernel_version: kernel.to_string(),
            platform_versions: platforms,
            outcome,
            reason,
            elapsed: started.elapsed(),
        }
    }

    /// Build once, then push the kernel tag and every platform alias. The
    /// workspace guard releases the scratch dir and local images on every
    /// return path.
    fn build_group(
        &self,
        driver: &str,
        kernel: &str,
        group: &KernelGroup,
        kernel_tag: &str,
    ) -> Result<(), JobError> {
        let dtk_image = group.sample_build_env();
        let local_tag = format!("driverforge:{}", kernel_tag);

        let workspace =
            BuildWorkspace::create(&self.work_dir, kernel, &local_tag, dtk_image).map_err(
                |cause| JobError::Build {
                    kernel: kernel.to_string(),
                    cause,
                },
            )?;

        let request = BuildRequest {
            dtk_image: dtk_image.to_string(),
            driver_version: driver.to_string(),
            kernel_version: kernel.to_string(),
            local_tag: local_tag.clone(),
            scratch_dir: workspace.dir().to_path_buf(),
        };
        self.builder
            .build(&request)
            .map_err(|cause| JobError::Build {
                kernel: kernel.to_string(),
                cause,
            })?;

        self.registry
            .push(&self.target, &local_tag, kernel_tag)
            .map_err(|cause| JobError::Publish {
                tag: kernel_tag.to_string(),
                cause,
            })?;

        for platform in group.platform_versions() {
            let alias = self.target.alias_tag(driver, platform);
            self.registry
                .push(&self.target, &local_tag, &alias)
                .map_err(|cause| JobError::Publish {
                    tag: alias.clone(),
                    cause,
                })?;
        }

        Ok(())
    }
}
