use std::ffi::OsString;
use std::path::{Path, PathBuf};
use serde::Serialize;

/// Marker placed before the extension of every transcoded output
pub const TRANSCODE_TAG: &str = "x265";
/// Extension (tag + container) that replaces the source extension
pub const OUTPUT_EXTENSION: &str = "x265.mp4";
/// Suffix appended to a video path to name its contact sheet
pub const CONTACT_SHEET_SUFFIX: &str = ".jpg";

/// A video path and the contact sheet that belongs to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactSet {
    pub video: PathBuf,
    pub contact_sheet: PathBuf,
}

impl ArtifactSet {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        let video = video.into();
        let contact_sheet = contact_sheet_path(&video);
        Self {
            video,
            contact_sheet,
        }
    }
}

/// Source artifacts and the artifacts a transcode of them produces
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TranscodeTask {
    pub input: ArtifactSet,
    pub output: ArtifactSet,
}

impl TranscodeTask {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        let video = video.into();
        let output = transcoded_video_path(&video);
        Self {
            input: ArtifactSet::new(video),
            output: ArtifactSet::new(output),
        }
    }
}

/// `movie.mp4` -> `movie.mp4.jpg`
pub fn contact_sheet_path(video: &Path) -> PathBuf {
    let mut name = OsString::from(video.as_os_str());
    name.push(CONTACT_SHEET_SUFFIX);
    PathBuf::from(name)
}

/// `movie.avi` -> `movie.x265.mp4`
pub fn transcoded_video_path(video: &Path) -> PathBuf {
    video.with_extension(OUTPUT_EXTENSION)
}
