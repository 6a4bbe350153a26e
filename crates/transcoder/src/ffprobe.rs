use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use log::debug;
use serde::Deserialize;
use crate::classifier::{MediaProbe, VideoTrack};
use crate::config::ToolConfig;
use crate::error::{BatchError, Result};

/// ffprobe JSON output, restricted to what classification needs
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeData {
    #[serde(default)]
    pub streams: Vec<FFProbeStream>,
}

/// Stream-level metadata from ffprobe
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeStream {
    #[serde(rename = "codec_type")]
    pub codec_type: Option<String>,
    #[serde(rename = "codec_name")]
    pub codec_name: Option<String>,
    /// Container fourcc such as `hvc1`; Matroska reports `[0][0][0][0]`
    #[serde(rename = "codec_tag_string")]
    pub codec_tag_string: Option<String>,
}

impl FFProbeData {
    /// First stream whose codec type is video
    pub fn first_video_stream(&self) -> Option<&FFProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    }
}

/// Parse ffprobe's `-print_format json` output into the first video track
pub fn parse_probe_output(path: &Path, json: &str) -> Result<VideoTrack> {
    let data: FFProbeData = serde_json::from_str(json)
        .map_err(|e| BatchError::probe(path, format!("invalid ffprobe JSON: {e}")))?;

    let stream = data
        .first_video_stream()
        .ok_or_else(|| BatchError::probe(path, "no video track"))?;

    // "[0][0][0][0]" means the container carries no fourcc
    let codec_tag = stream
        .codec_tag_string
        .clone()
        .filter(|tag| !tag.starts_with('['));

    Ok(VideoTrack {
        codec_name: stream.codec_name.clone(),
        codec_tag,
    })
}

/// Media probe backed by the ffprobe binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_bin: PathBuf,
}

impl FfprobeProbe {
    pub fn new(cfg: &ToolConfig) -> Self {
        Self {
            ffprobe_bin: cfg.ffprobe_bin.clone(),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn first_video_track(&self, path: &Path) -> Result<VideoTrack> {
        if !path.exists() {
            return Err(BatchError::NotFound(path.to_path_buf()));
        }

        let mut cmd = Command::new(&self.ffprobe_bin);
        cmd.args(["-v", "error", "-select_streams", "v:0", "-show_streams", "-print_format", "json"])
            .arg(path)
            .stdin(Stdio::null());

        debug!("ffprobe command: {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            BatchError::probe(path, format!("failed to start {}: {e}", self.ffprobe_bin.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BatchError::probe(
                path,
                format!(
                    "ffprobe exited with status {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }

        let json = String::from_utf8(output.stdout)
            .map_err(|_| BatchError::probe(path, "ffprobe output is not valid UTF-8"))?;

        parse_probe_output(path, &json)
    }
}
