use std::path::{Path, PathBuf};
use log::{debug, warn};
use walkdir::WalkDir;
use crate::error::{BatchError, Result};

/// Video file extensions (lowercase, without the dot) considered for processing
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mkv", "flv", "vob", "ogv", "drc", "gifv", "mng", "avi", "mts", "m2ts", "ts",
    "mov", "qt", "wmv", "yuv", "rm", "rmvb", "viv", "asf", "amv", "m4p", "m4v", "mpg", "mp2",
    "mpeg", "mpe", "mpv", "m2v", "svi", "3gp", "3g2", "mxf", "roq", "nsv", "f4v", "f4p", "f4a",
    "f4b", "divx", "ogx", "evo", "m2p", "ps", "mk3d", "movie",
];

/// A path known to hold video content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoFile(PathBuf);

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VideoFile(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for VideoFile {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Whether the extension (case-insensitive) is a known video extension
pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Lazily enumerate video files under `root`.
///
/// Only direct children are visited unless `recursive` is set. Order follows
/// the filesystem and is not stable.
pub fn discover(root: &Path, recursive: bool) -> Result<impl Iterator<Item = VideoFile>> {
    if !root.exists() {
        return Err(BatchError::NotFound(root.to_path_buf()));
    }

    let mut walker = WalkDir::new(root).follow_links(false).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    debug!("Scanning {} (recursive: {})", root.display(), recursive);

    let files = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Error reading directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| has_video_extension(entry.path()))
        .map(|entry| VideoFile::new(entry.into_path()));

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn names(files: impl Iterator<Item = VideoFile>) -> HashSet<String> {
        files
            .map(|f| f.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        assert!(has_video_extension(Path::new("a.MP4")));
        assert!(has_video_extension(Path::new("a.Mkv")));
        assert!(has_video_extension(Path::new("a.x265.mp4")));
        assert!(!has_video_extension(Path::new("a.mp4.jpg")));
        assert!(!has_video_extension(Path::new("README")));
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        match discover(&missing, true) {
            Err(BatchError::NotFound(p)) => assert_eq!(p, missing),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_non_recursive_only_lists_direct_children() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("b.MOV"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("a.mp4.jpg"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub").join("c.mkv"));

        let found = names(discover(dir.path(), false).unwrap());
        assert_eq!(found, HashSet::from(["a.mp4".to_string(), "b.MOV".to_string()]));
    }

    #[test]
    fn test_recursive_walks_subtree() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        fs::create_dir_all(dir.path().join("sub").join("deeper")).unwrap();
        touch(&dir.path().join("sub").join("c.mkv"));
        touch(&dir.path().join("sub").join("deeper").join("d.avi"));

        let found = names(discover(dir.path(), true).unwrap());
        assert_eq!(
            found,
            HashSet::from(["a.mp4".to_string(), "c.mkv".to_string(), "d.avi".to_string()])
        );
    }

    #[test]
    fn test_directories_with_video_names_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.mp4")).unwrap();
        assert_eq!(discover(dir.path(), true).unwrap().count(), 0);
    }
}
