//! Directory conversion
//!
//! The output tree is prepared up front: every directory is created during
//! the walk, so file jobs only ever write files. Jobs then run on blocking
//! threads, at most `jobs` at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tsqlbricks_core::{BatchReport, Config, FileOutcome, FileStatus};
use walkdir::WalkDir;

use crate::error::BatchError;
use crate::failure::convert_or_diagnose;
use crate::pipeline::Converter;

/// Batch settings, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of files converted concurrently
    pub jobs: usize,

    /// Config used for extension matching
    pub config: Config,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jobs: config.worker_count(),
            config: config.clone(),
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}

struct Job {
    input: PathBuf,
    output: PathBuf,
}

/// Convert every matching file under `input_root` into the mirrored
/// location under `output_root`.
///
/// Per-file failures are recorded in the report and never returned as
/// errors. An `Err` means nothing was converted.
pub async fn convert_directory(
    converter: Arc<Converter>,
    input_root: &Path,
    output_root: &Path,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    let skip = check_roots(input_root, output_root)?;

    if options.config.clean_output && output_root.exists() {
        tracing::debug!(output = %output_root.display(), "removing previous output");
        std::fs::remove_dir_all(output_root).map_err(|source| BatchError::Prepare {
            path: output_root.to_path_buf(),
            source,
        })?;
    }
    create_dir(output_root)?;

    let jobs = plan_jobs(input_root, output_root, skip.as_deref(), &options.config)?;
    tracing::info!(files = jobs.len(), workers = options.jobs, "starting batch conversion");

    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for job in jobs {
        let converter = Arc::clone(&converter);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let Job { input, output } = job;
            let (task_input, task_output) = (input.clone(), output.clone());

            match tokio::task::spawn_blocking(move || convert_or_diagnose(&converter, &task_input, &task_output)).await {
                Ok(outcome) => outcome,
                Err(err) => FileOutcome {
                    input,
                    output,
                    status: FileStatus::Unwritable {
                        message: format!("conversion task failed: {}", err),
                    },
                },
            }
        });
    }

    let mut report = BatchReport::new(input_root, output_root);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => report.add_outcome(outcome),
            Err(err) => tracing::error!(error = %err, "batch task panicked"),
        }
    }
    report.sort();

    tracing::info!(
        total = report.summary.total,
        converted = report.summary.converted,
        failed = report.summary.failed,
        unwritable = report.summary.unwritable,
        "batch conversion finished"
    );

    Ok(report)
}

/// Reject overlapping roots. Returns the output root relative to the input
/// root when it is nested inside it, so the walk can skip it.
fn check_roots(input_root: &Path, output_root: &Path) -> Result<Option<PathBuf>, BatchError> {
    if !input_root.is_dir() {
        return Err(BatchError::MissingInput {
            path: input_root.to_path_buf(),
        });
    }

    let input = resolve(input_root)?;
    let output = resolve(output_root)?;
    let overlapping = || BatchError::OverlappingRoots {
        input: input_root.to_path_buf(),
        output: output_root.to_path_buf(),
    };

    if input.starts_with(&output) {
        return Err(overlapping());
    }

    Ok(output.strip_prefix(&input).ok().map(Path::to_path_buf))
}

/// Absolute path with symlinks resolved as far as the path exists
fn resolve(path: &Path) -> Result<PathBuf, BatchError> {
    let prepare = |source| BatchError::Prepare {
        path: path.to_path_buf(),
        source,
    };
    if path.exists() {
        return path.canonicalize().map_err(prepare);
    }
    let absolute = std::path::absolute(path).map_err(prepare)?;
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => Ok(resolve(parent)?.join(name)),
        _ => Ok(absolute),
    }
}

fn create_dir(path: &Path) -> Result<(), BatchError> {
    std::fs::create_dir_all(path).map_err(|source| BatchError::Prepare {
        path: path.to_path_buf(),
        source,
    })
}

fn plan_jobs(
    input_root: &Path,
    output_root: &Path,
    skip: Option<&Path>,
    config: &Config,
) -> Result<Vec<Job>, BatchError> {
    let mut jobs = Vec::new();
    let walker = WalkDir::new(input_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(input_root).unwrap_or(entry.path());
            skip != Some(relative)
        });

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(input_root).unwrap_or(entry.path());
        let target = output_root.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&target)?;
        } else if entry.file_type().is_file() && config.matches_extension(&entry.file_name().to_string_lossy()) {
            jobs.push(Job {
                input: entry.path().to_path_buf(),
                output: target,
            });
        }
    }

    Ok(jobs)
}
