use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use chrono::Utc;
use log::{debug, error, info, warn};
use crate::classifier::{non_matching, ClassificationMethod, MediaProbe};
use crate::error::{BatchError, Result};
use crate::invoker::{ExternalTools, ProcessResult};
use crate::report::{BatchReport, FileOutcome, OutcomeStatus};
use crate::scan::{discover, VideoFile};
use crate::sidecar::{transcoded_video_path, ArtifactSet, TranscodeTask};

/// What to do with the source once its transcode has succeeded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PostAction {
    #[default]
    None,
    /// Move the source video (and its contact sheet) into this directory
    Move(PathBuf),
    /// Delete the source video and its contact sheet
    Delete,
}

impl PostAction {
    /// Build from the two command-line flags, rejecting the combination
    pub fn from_flags(move_source: Option<PathBuf>, delete_source: bool) -> Result<Self> {
        match (move_source, delete_source) {
            (Some(_), true) => Err(BatchError::ConfigurationConflict),
            (Some(dest), false) => Ok(PostAction::Move(dest)),
            (None, true) => Ok(PostAction::Delete),
            (None, false) => Ok(PostAction::None),
        }
    }

    /// A move destination must be an existing directory
    pub fn validate(&self) -> Result<()> {
        match self {
            PostAction::Move(dest) if !dest.is_dir() => Err(BatchError::NotFound(dest.clone())),
            _ => Ok(()),
        }
    }

    /// Apply to the source artifacts of a finished transcode
    pub fn apply(&self, source: &ArtifactSet) -> Result<()> {
        match self {
            PostAction::None => Ok(()),
            PostAction::Move(dest) => {
                let file_name = source.video.file_name().ok_or_else(|| {
                    BatchError::InvalidArgument(format!("{} has no file name", source.video.display()))
                })?;
                let moved = ArtifactSet::new(dest.join(file_name));
                let with_sheet = source.contact_sheet.is_file();

                // both targets are checked before either file moves
                ensure_vacant(&moved.video)?;
                if with_sheet {
                    ensure_vacant(&moved.contact_sheet)?;
                }

                info!("📦 Moving {} to {}", source.video.display(), dest.display());
                move_file(&source.video, &moved.video)?;
                if with_sheet {
                    if let Err(e) = move_file(&source.contact_sheet, &moved.contact_sheet) {
                        if let Err(undo) = move_file(&moved.video, &source.video) {
                            warn!("Could not move {} back: {}", moved.video.display(), undo);
                        }
                        return Err(e);
                    }
                }
                Ok(())
            }
            PostAction::Delete => {
                info!("🗑️  Removing {}", source.video.display());
                fs::remove_file(&source.video).map_err(|e| BatchError::io(&source.video, e))?;
                if source.contact_sheet.is_file() {
                    fs::remove_file(&source.contact_sheet)
                        .map_err(|e| BatchError::io(&source.contact_sheet, e))?;
                }
                Ok(())
            }
        }
    }

    /// Directory the move post-action writes into
    pub fn move_destination(&self) -> Option<&Path> {
        match self {
            PostAction::Move(dest) => Some(dest.as_path()),
            _ => None,
        }
    }
}

fn ensure_vacant(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(BatchError::io(
            path,
            io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }
    Ok(())
}

/// Rename `from` to `to`, copying across filesystems; never replaces `to`
fn move_file(from: &Path, to: &Path) -> Result<()> {
    ensure_vacant(to)?;

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{} is on another filesystem, copying", to.display());
            copy_and_remove(from, to)
        }
        Err(e) => Err(BatchError::io(from, e)),
    }
}

/// Copy then delete the original; a failed copy leaves nothing at `to`
fn copy_and_remove(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = fs::copy(from, to) {
        if to.exists() {
            if let Err(cleanup) = fs::remove_file(to) {
                warn!("Could not remove partial copy {}: {}", to.display(), cleanup);
            }
        }
        return Err(BatchError::io(from, e));
    }
    fs::remove_file(from).map_err(|e| BatchError::io(from, e))
}

/// Whether `path` resolves to somewhere under `dir` (already canonical)
fn is_within(path: &Path, dir: &Path) -> bool {
    fs::canonicalize(path).is_ok_and(|p| p.starts_with(dir))
}

/// How a per-file failure affects the rest of the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, record it, and move on to the next file
    #[default]
    Continue,
    /// Stop the batch and return the error
    Abort,
}

/// Parameters of one `batch` run
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub root: PathBuf,
    pub recursive: bool,
    pub method: ClassificationMethod,
    pub move_source: Option<PathBuf>,
    pub delete_source: bool,
    pub failure_policy: FailurePolicy,
}

impl BatchRequest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            method: ClassificationMethod::default(),
            move_source: None,
            delete_source: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Drives discovery, classification, transcoding, contact sheets and
/// post-actions, one file at a time
pub struct BatchRunner<'a, T: ?Sized, P: ?Sized> {
    tools: &'a T,
    probe: &'a P,
}

impl<'a, T, P> BatchRunner<'a, T, P>
where
    T: ExternalTools + ?Sized,
    P: MediaProbe + ?Sized,
{
    pub fn new(tools: &'a T, probe: &'a P) -> Self {
        Self { tools, probe }
    }

    /// Transcode every non-matching video under `request.root`.
    ///
    /// Post-action flags are validated before anything is discovered or run.
    pub fn run(&self, request: &BatchRequest) -> Result<BatchReport> {
        let post_action = PostAction::from_flags(request.move_source.clone(), request.delete_source)?;
        post_action.validate()?;

        info!(
            "Starting batch in {} (recursive: {}, method: {}, post-action: {:?})",
            request.root.display(),
            request.recursive,
            request.method,
            post_action
        );

        // sources moved into a destination under the root must not be found again
        let moved_into = post_action
            .move_destination()
            .map(|dest| fs::canonicalize(dest).map_err(|e| BatchError::io(dest, e)))
            .transpose()?;
        let files = discover(&request.root, request.recursive)?.filter(move |f| match &moved_into {
            Some(dest) if is_within(f.path(), dest) => {
                debug!("Skipping {}: inside the move destination", f.path().display());
                false
            }
            _ => true,
        });
        let mut report = BatchReport::new(&request.root, request.method);

        for candidate in non_matching(files, request.method, self.probe) {
            let started_at = Utc::now();

            let (source, output, step) = match candidate {
                Ok(video) => {
                    let output = transcoded_video_path(video.path());
                    let step = self.process_file(&video, &post_action);
                    (video.into_path(), Some(output), step)
                }
                Err(e) => (e.path().map(Path::to_path_buf).unwrap_or_default(), None, Err(e)),
            };

            let (status, detail) = match step {
                Ok(done) => done,
                Err(e) => {
                    error!("❌ {}: {}", source.display(), e);
                    if request.failure_policy == FailurePolicy::Abort {
                        return Err(e);
                    }
                    (OutcomeStatus::Failed, Some(e.to_string()))
                }
            };

            report.outcomes.push(FileOutcome {
                source,
                output,
                status,
                detail,
                started_at,
                finished_at: Utc::now(),
            });
        }

        report.finished_at = Some(Utc::now());
        info!(
            "Batch complete: {} transcoded, {} skipped, {} failed",
            report.transcoded(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Transcode, contact sheet, post-action for a single candidate
    fn process_file(&self, video: &VideoFile, post_action: &PostAction) -> Result<(OutcomeStatus, Option<String>)> {
        let task = TranscodeTask::new(video.path());

        if task.output.video.exists() {
            info!("⏭️  Output exists, skipping: {}", task.output.video.display());
            return Ok((OutcomeStatus::Skipped, None));
        }

        info!("🎬 Transcoding {} -> {}", task.input.video.display(), task.output.video.display());
        let transcode = self.tools.run_transcode(&task)?;
        if !transcode.is_ok() {
            return Ok((
                OutcomeStatus::Failed,
                Some(format!("ffmpeg exited with status {}", transcode.exit_code)),
            ));
        }

        let sheet = self.tools.run_contact_sheet(&task.output)?;
        let detail = if sheet.is_ok() {
            None
        } else {
            warn!("Contact sheet failed for {}", task.output.video.display());
            Some(format!("vcsi exited with status {}", sheet.exit_code))
        };

        post_action.apply(&task.input)?;
        info!("✅ Finished {}", task.output.video.display());
        Ok((OutcomeStatus::Transcoded, detail))
    }

    /// Transcode a single file, optionally deleting the source afterwards
    pub fn transcode_file(&self, path: &Path, delete_source: bool) -> Result<ProcessResult<TranscodeTask>> {
        if !path.is_file() {
            return Err(BatchError::NotFound(path.to_path_buf()));
        }

        let task = TranscodeTask::new(path);
        info!("🎬 Transcoding {} -> {}", task.input.video.display(), task.output.video.display());
        let result = self.tools.run_transcode(&task)?;

        if delete_source {
            if result.is_ok() {
                PostAction::Delete.apply(&task.input)?;
            } else {
                warn!("Keeping {}: transcode did not succeed", task.input.video.display());
            }
        }
        Ok(result)
    }

    /// Contact sheet for one file, or for every video in a directory.
    ///
    /// In directory mode videos that already have a sheet are skipped
    /// unless `overwrite` is set.
    pub fn make_contact_sheets(
        &self,
        path: &Path,
        recursive: bool,
        overwrite: bool,
    ) -> Result<Vec<ProcessResult<ArtifactSet>>> {
        if path.is_file() {
            let result = self.tools.run_contact_sheet(&ArtifactSet::new(path))?;
            return Ok(vec![result]);
        }
        if !path.is_dir() {
            return Err(BatchError::NotFound(path.to_path_buf()));
        }

        let mut results = Vec::new();
        for video in discover(path, recursive)? {
            let artifacts = ArtifactSet::new(video.into_path());
            if !overwrite && artifacts.contact_sheet.is_file() {
                debug!("Contact sheet exists, skipping: {}", artifacts.contact_sheet.display());
                continue;
            }
            results.push(self.tools.run_contact_sheet(&artifacts)?);
        }
        Ok(results)
    }
}
