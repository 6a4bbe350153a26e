use std::fmt;
use std::path::Path;
use std::str::FromStr;
use log::debug;
use serde::Serialize;
use crate::error::{BatchError, Result};
use crate::scan::VideoFile;
use crate::sidecar::TRANSCODE_TAG;

/// Codec identifiers that mean the stream is already HEVC: the decoder name
/// and both MP4 sample-entry fourccs
pub const TARGET_CODEC_IDS: &[&str] = &["hevc", "hev1", "hvc1"];

/// How to decide whether a file is already encoded in the target codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationMethod {
    /// Filename tag only, no I/O
    #[default]
    Fast,
    /// Probe every file's first video track
    Accurate,
    /// Fast filter first, then probe what is left
    SemiAccurate,
}

impl ClassificationMethod {
    pub const ALL: [ClassificationMethod; 3] = [
        ClassificationMethod::Fast,
        ClassificationMethod::Accurate,
        ClassificationMethod::SemiAccurate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::Fast => "fast",
            ClassificationMethod::Accurate => "accurate",
            ClassificationMethod::SemiAccurate => "semi-accurate",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationMethod {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                BatchError::InvalidArgument(format!(
                    "got a bad value for method: '{s}' (expected fast, accurate or semi-accurate)"
                ))
            })
    }
}

/// Codec identifiers of a file's first video track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoTrack {
    /// Decoder name, e.g. `hevc` or `h264`
    pub codec_name: Option<String>,
    /// Container codec tag, e.g. `hvc1` or `avc1`
    pub codec_tag: Option<String>,
}

impl VideoTrack {
    /// Whether any identifier of this track names the target codec
    pub fn is_target_codec(&self) -> bool {
        [&self.codec_name, &self.codec_tag]
            .into_iter()
            .flatten()
            .any(|id| TARGET_CODEC_IDS.iter().any(|t| id.eq_ignore_ascii_case(t)))
    }
}

/// Source of container metadata for accurate classification
pub trait MediaProbe {
    /// First video track of `path`; a file without one is a probe error
    fn first_video_track(&self, path: &Path) -> Result<VideoTrack>;
}

impl<P: MediaProbe + ?Sized> MediaProbe for &P {
    fn first_video_track(&self, path: &Path) -> Result<VideoTrack> {
        (**self).first_video_track(path)
    }
}

/// Fast rule: the file stem ends with `.x265`
pub fn is_already_encoded(file: &Path) -> bool {
    file.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.strip_suffix(TRANSCODE_TAG))
        .is_some_and(|rest| rest.ends_with('.'))
}

/// Accurate rule: probe the first video track and compare its codec
pub fn is_target_codec<P: MediaProbe + ?Sized>(probe: &P, file: &Path) -> Result<bool> {
    let track = probe.first_video_track(file)?;
    let hevc = track.is_target_codec();
    debug!(
        "Probed {}: codec={:?} tag={:?} -> hevc={}",
        file.display(),
        track.codec_name,
        track.codec_tag,
        hevc
    );
    Ok(hevc)
}

/// Drop files whose name carries the transcode tag
pub fn fast_filter<I>(files: I) -> impl Iterator<Item = VideoFile>
where
    I: IntoIterator<Item = VideoFile>,
{
    files.into_iter().filter(|f| !is_already_encoded(f.path()))
}

/// Drop files whose first video track is HEVC; probe failures come through as errors
pub fn accurate_filter<'a, I, P>(files: I, probe: &'a P) -> impl Iterator<Item = Result<VideoFile>> + 'a
where
    I: IntoIterator<Item = VideoFile> + 'a,
    I::IntoIter: 'a,
    P: MediaProbe + ?Sized,
{
    files
        .into_iter()
        .filter_map(move |f| match is_target_codec(probe, f.path()) {
            Ok(true) => None,
            Ok(false) => Some(Ok(f)),
            Err(e) => Some(Err(e)),
        })
}

/// Lazily yield the files that still need transcoding under `method`
pub fn non_matching<'a, I, P>(
    files: I,
    method: ClassificationMethod,
    probe: &'a P,
) -> Box<dyn Iterator<Item = Result<VideoFile>> + 'a>
where
    I: IntoIterator<Item = VideoFile> + 'a,
    I::IntoIter: 'a,
    P: MediaProbe + ?Sized,
{
    match method {
        ClassificationMethod::Fast => Box::new(fast_filter(files).map(Ok)),
        ClassificationMethod::Accurate => Box::new(accurate_filter(files, probe)),
        ClassificationMethod::SemiAccurate => Box::new(accurate_filter(fast_filter(files), probe)),
    }
}
