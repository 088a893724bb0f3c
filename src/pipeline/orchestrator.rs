//! Pipeline orchestration
//!
//! Validates the whole Run up front, then processes one Job per source,
//! strictly in order. Each Job walks the stages
//! `ResolveMetadata → ResolveCoverArt → Acquire → (Extract) → Concatenate →
//! Analyze → Encode → Done` inside its own workspace, which is removed when
//! the Job ends however it ends. By default the first failure aborts the Run;
//! with `keep_going` the remaining sources are still attempted.

use crate::acquire::{self, Fetcher, LocalSource, RemoteFetcher};
use crate::artwork;
use crate::audio;
use crate::config::Settings;
use crate::discovery;
use crate::error::{BookbinderError, Result};
use crate::metadata;
use crate::tools::Tool;
use crate::types::{ArchiveFormat, CoverArt, Metadata, Source};
use crate::workspace::Workspace;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Position of a Job in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Validate,
    ResolveMetadata,
    ResolveCoverArt,
    Acquire,
    Extract,
    Concatenate,
    Analyze,
    Encode,
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Validate => "validating",
            JobStage::ResolveMetadata => "resolving metadata",
            JobStage::ResolveCoverArt => "resolving cover art",
            JobStage::Acquire => "acquiring source",
            JobStage::Extract => "extracting",
            JobStage::Concatenate => "concatenating",
            JobStage::Analyze => "decoding",
            JobStage::Encode => "encoding",
            JobStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A failed Job (only collected when `keep_going` is set)
#[derive(Debug)]
pub struct JobFailure {
    pub source: String,
    pub stage: JobStage,
    pub error: BookbinderError,
}

/// Pipeline result summary
#[derive(Debug, Default)]
pub struct PipelineResult {
    pub total_jobs: usize,
    pub successful: usize,
    pub failed: usize,
    /// Audiobooks written, in source order
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<JobFailure>,
}

/// One source's unit of work, holding everything resolved so far
pub struct Job<'a> {
    pub index: usize,
    pub source: &'a Source,
    pub metadata: Metadata,
    pub cover: CoverArt,
    pub output: PathBuf,
    workspace: Workspace,
}

/// Run the full pipeline, downloading remote files over HTTP(S) or FTP
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let fetcher = RemoteFetcher::new(&settings.tools.curl);
    run_with(settings, &fetcher)
}

/// Run the full pipeline with a specific download backend
pub fn run_with(settings: &Settings, fetcher: &dyn Fetcher) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    // Phase 1: validate every source before any Job starts
    let sources = validate_run(settings)?;
    settings.tools.verify(&required_tools(settings, &sources))?;
    prepare_destination(&settings.destination)?;

    let total_jobs = sources.len();
    info!("Processing {} source(s) into {}", total_jobs, settings.destination.display());

    let progress = create_progress(settings.show_progress);
    let mut result = PipelineResult {
        total_jobs,
        ..PipelineResult::default()
    };

    // Phase 2: one Job at a time
    for (index, source) in sources.iter().enumerate() {
        let job_start = Instant::now();
        let mut tracker = StageTracker::new(index, total_jobs, source, &progress);

        match process_job(index, source, settings, fetcher, &mut tracker) {
            Ok(output) => {
                info!(
                    "Wrote {} in {:.1}s",
                    output.display(),
                    job_start.elapsed().as_secs_f64()
                );
                result.successful += 1;
                result.outputs.push(output);
            }
            Err(e) => {
                error!("Job for {} failed while {}: {}", source, tracker.stage, e);
                result.failed += 1;

                if !settings.keep_going {
                    progress.finish_and_clear();
                    let not_started = total_jobs - index - 1;
                    if not_started > 0 {
                        warn!("Aborting run; {} remaining source(s) not started", not_started);
                    }
                    return Err(e);
                }

                result.failures.push(JobFailure {
                    source: source.location.clone(),
                    stage: tracker.stage,
                    error: e,
                });
            }
        }
    }

    progress.finish_and_clear();
    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(result)
}

/// Classify all sources and apply the Run-level source rules
pub fn validate_run(settings: &Settings) -> Result<Vec<Source>> {
    if settings.sources.is_empty() {
        return Err(BookbinderError::Usage("No sources given".to_string()));
    }

    let sources = settings
        .sources
        .iter()
        .map(|location| discovery::classify(location))
        .collect::<Result<Vec<_>>>()?;

    if let Some(dir) = sources.iter().find(|s| s.is_directory()) {
        if sources.len() > 1 {
            return Err(BookbinderError::Usage(format!(
                "Directory source '{}' must be the only source",
                dir
            )));
        }
        if settings.infers_metadata() {
            return Err(BookbinderError::Usage(format!(
                "Metadata cannot be inferred for directory source '{}'; supply -t, -w, -a and -y",
                dir
            )));
        }
    }

    Ok(sources)
}

/// Collaborators a Run will invoke
fn required_tools(settings: &Settings, sources: &[Source]) -> Vec<Tool> {
    let mut tools = vec![Tool::Identify, Tool::Convert, Tool::Mp3wrap, Tool::Mplayer, Tool::Faac];
    let cover = settings.picture.as_deref().unwrap_or(&settings.default_cover_url);
    if discovery::is_ftp(cover) || sources.iter().any(|s| discovery::is_ftp(&s.location)) {
        tools.push(Tool::Curl);
    }
    if sources.iter().any(|s| s.archive_format() == Some(ArchiveFormat::Zip)) {
        tools.push(Tool::Unzip);
    }
    if sources.iter().any(|s| s.archive_format() == Some(ArchiveFormat::Tar)) {
        tools.push(Tool::Tar);
    }
    tools
}

/// Create the destination directory if it is missing
fn prepare_destination(destination: &Path) -> Result<()> {
    if destination.is_dir() {
        return Ok(());
    }
    if destination.exists() {
        return Err(BookbinderError::Output {
            path: destination.to_path_buf(),
            reason: "exists but is not a directory".to_string(),
        });
    }

    info!("Creating destination directory {}", destination.display());
    std::fs::create_dir_all(destination)
        .map_err(|e| BookbinderError::output_error(destination, e))
}

/// Run one Job to completion
fn process_job(
    index: usize,
    source: &Source,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    tracker: &mut StageTracker<'_>,
) -> Result<PathBuf> {
    let workspace = Workspace::create(&settings.workspace_root, index)?;

    tracker.enter(JobStage::ResolveMetadata);
    let metadata = metadata::resolve(&settings.metadata, source)?;

    tracker.enter(JobStage::ResolveCoverArt);
    let cover = artwork::resolve(
        settings.picture.as_deref(),
        &settings.default_cover_url,
        &workspace,
        fetcher,
        &settings.tools,
    )?;

    let job = Job {
        index,
        source,
        output: audio::output_path(&settings.destination, source, &metadata),
        metadata,
        cover,
        workspace,
    };

    job.build(settings, fetcher, tracker)
}

impl Job<'_> {
    /// Acquire, concatenate, decode and encode; consumes the Job and its workspace
    fn build(
        self,
        settings: &Settings,
        fetcher: &dyn Fetcher,
        tracker: &mut StageTracker<'_>,
    ) -> Result<PathBuf> {
        let tools = &settings.tools;

        tracker.enter(JobStage::Acquire);
        let track_dir = match acquire::materialize(self.source, &self.workspace, fetcher)? {
            LocalSource::Directory(dir) => dir,
            LocalSource::Archive { path, format } => {
                tracker.enter(JobStage::Extract);
                acquire::extract(&path, format, &self.workspace, tools)?
            }
        };

        tracker.enter(JobStage::Concatenate);
        let merged = audio::concatenate(&track_dir, &self.workspace, tools)?;

        tracker.enter(JobStage::Analyze);
        let decoded = audio::decode(&merged, &self.workspace, tools)?;

        tracker.enter(JobStage::Encode);
        audio::encode(&decoded, &self.metadata, &self.cover, &self.output, tools)?;

        tracker.enter(JobStage::Done);
        debug!("Job {} finished, removing workspace", self.index);
        self.workspace.close();

        Ok(self.output)
    }
}

/// Records the current stage of a Job and mirrors it on the spinner
struct StageTracker<'a> {
    stage: JobStage,
    label: String,
    progress: &'a ProgressBar,
}

impl<'a> StageTracker<'a> {
    fn new(index: usize, total: usize, source: &Source, progress: &'a ProgressBar) -> Self {
        let tracker = Self {
            stage: JobStage::Validate,
            label: format!("[{}/{}] {}", index + 1, total, source.file_name),
            progress,
        };
        info!("Starting job {} of {}: {}", index + 1, total, source);
        tracker.progress.set_message(format!("{} {}", tracker.label, tracker.stage));
        tracker
    }

    fn enter(&mut self, stage: JobStage) {
        debug!("{}: {} -> {}", self.label, self.stage, stage);
        self.stage = stage;
        self.progress.set_message(format!("{} {}", self.label, stage));
    }
}

fn create_progress(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
