use std::ffi::OsString;
use std::process::{Command, ExitStatus, Stdio};
use log::{debug, warn};
use serde::Serialize;
use crate::config::ToolConfig;
use crate::error::{BatchError, Result};
use crate::sidecar::{ArtifactSet, TranscodeTask};

/// ffmpeg video encoder for the target codec
pub const VIDEO_CODEC: &str = "libx265";
/// ffmpeg audio encoder
pub const AUDIO_CODEC: &str = "aac";

/// Exit status of one external invocation and what it was run on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult<S> {
    /// Process exit code; -1 if it was terminated by a signal
    pub exit_code: i32,
    pub subject: S,
}

impl<S> ProcessResult<S> {
    pub fn new(status: ExitStatus, subject: S) -> Self {
        Self {
            exit_code: status.code().unwrap_or(-1),
            subject,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.exit_code == 0
    }
}

/// The two external tools the orchestrator drives
pub trait ExternalTools {
    /// Encode `task.input.video` into `task.output.video`
    fn run_transcode(&self, task: &TranscodeTask) -> Result<ProcessResult<TranscodeTask>>;

    /// Render the contact sheet of `artifacts.video` into `artifacts.contact_sheet`
    fn run_contact_sheet(&self, artifacts: &ArtifactSet) -> Result<ProcessResult<ArtifactSet>>;
}

/// Runs ffmpeg and vcsi as blocking subprocesses under nice
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    cfg: ToolConfig,
}

impl ProcessInvoker {
    pub fn new(cfg: ToolConfig) -> Self {
        Self { cfg }
    }

    /// `nice --adjustment=20 ffmpeg -hide_banner -n -i IN -c:v libx265 -c:a aac -strict -2 OUT`
    pub fn transcode_command(&self, task: &TranscodeTask) -> Command {
        let mut cmd = Command::new(&self.cfg.nice_bin);
        cmd.arg(self.cfg.nice_arg())
            .arg(&self.cfg.ffmpeg_bin)
            .arg("-hide_banner")
            // never overwrite an existing output
            .arg("-n")
            .arg("-i")
            .arg(&task.input.video)
            .args(["-c:v", VIDEO_CODEC, "-c:a", AUDIO_CODEC, "-strict", "-2"])
            .arg(&task.output.video);
        cmd
    }

    /// `nice --adjustment=20 vcsi IN -t -w 850 -g 3x5 -o OUT`
    pub fn contact_sheet_command(&self, artifacts: &ArtifactSet) -> Command {
        let mut cmd = Command::new(&self.cfg.nice_bin);
        cmd.arg(self.cfg.nice_arg())
            .arg(&self.cfg.vcs_bin)
            .arg(&artifacts.video)
            .arg("-t")
            .arg("-w")
            .arg(self.cfg.contact_sheet_width.to_string())
            .arg("-g")
            .arg(self.cfg.grid_arg())
            .arg("-o")
            .arg(&artifacts.contact_sheet);
        cmd
    }

    /// Run to completion with inherited stdio, applying the strict policy
    fn execute<S>(&self, mut cmd: Command, tool: &str, subject: S) -> Result<ProcessResult<S>> {
        debug!("{} command: {}", tool, render_command(&cmd));

        let program = cmd.get_program().to_string_lossy().into_owned();
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| BatchError::Spawn { program, source: e })?;

        let result = ProcessResult::new(status, subject);
        debug!("{} exit code: {}", tool, result.exit_code);

        if !result.is_ok() {
            if self.cfg.strict {
                return Err(BatchError::Process {
                    program: tool.to_string(),
                    exit_code: result.exit_code,
                });
            }
            warn!("{} exited with status {} (strict checking disabled)", tool, result.exit_code);
        }

        Ok(result)
    }
}

impl ExternalTools for ProcessInvoker {
    fn run_transcode(&self, task: &TranscodeTask) -> Result<ProcessResult<TranscodeTask>> {
        self.execute(self.transcode_command(task), "ffmpeg", task.clone())
    }

    fn run_contact_sheet(&self, artifacts: &ArtifactSet) -> Result<ProcessResult<ArtifactSet>> {
        self.execute(self.contact_sheet_command(artifacts), "vcsi", artifacts.clone())
    }
}

/// Program and arguments as one line, for logging
pub fn render_command(cmd: &Command) -> String {
    let mut parts: Vec<OsString> = vec![cmd.get_program().to_os_string()];
    parts.extend(cmd.get_args().map(|a| a.to_os_string()));
    parts
        .iter()
        .map(|p| {
            let s = p.to_string_lossy();
            if s.contains(char::is_whitespace) {
                format!("\"{s}\"")
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
