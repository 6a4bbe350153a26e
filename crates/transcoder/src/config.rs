use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the ffmpeg binary path
pub const FFMPEG_BIN_ENV: &str = "FFMPEG_BIN";
/// Environment variable that overrides the ffprobe binary path
pub const FFPROBE_BIN_ENV: &str = "FFPROBE_BIN";

/// Paths and fixed parameters for the external tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path to the `nice` binary used to lower scheduling priority
    pub nice_bin: PathBuf,
    /// Value passed as `--adjustment=<n>` to nice
    pub nice_adjustment: i32,
    /// Path to the ffmpeg encoder
    pub ffmpeg_bin: PathBuf,
    /// Path to ffprobe, used by accurate classification
    pub ffprobe_bin: PathBuf,
    /// Contact sheet tool (vcsi)
    pub vcs_bin: PathBuf,
    /// Contact sheet output width in pixels
    pub contact_sheet_width: u32,
    /// Contact sheet grid columns
    pub contact_sheet_columns: u32,
    /// Contact sheet grid rows
    pub contact_sheet_rows: u32,
    /// Turn a non-zero exit status into an error instead of a failed result
    pub strict: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ToolConfig {
    /// Built-in defaults, without looking at the environment
    pub fn default_config() -> Self {
        Self {
            nice_bin: PathBuf::from("/usr/bin/nice"),
            nice_adjustment: 20,
            ffmpeg_bin: PathBuf::from("/usr/bin/ffmpeg"),
            ffprobe_bin: PathBuf::from("/usr/bin/ffprobe"),
            vcs_bin: PathBuf::from("vcsi"),
            contact_sheet_width: 850,
            contact_sheet_columns: 3,
            contact_sheet_rows: 5,
            strict: true,
        }
    }

    /// Load configuration: defaults, then the optional JSON/TOML file, then
    /// `FFMPEG_BIN` / `FFPROBE_BIN` from the environment
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        Self::load_config_with(path, |key| std::env::var(key).ok())
    }

    /// `load_config` with the environment supplied by `lookup`
    pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

            if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
            } else {
                config = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
            }
        }

        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Apply binary path overrides; `lookup` is `std::env::var` outside of tests
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bin) = lookup(FFMPEG_BIN_ENV).filter(|v| !v.is_empty()) {
            self.ffmpeg_bin = PathBuf::from(bin);
        }
        if let Some(bin) = lookup(FFPROBE_BIN_ENV).filter(|v| !v.is_empty()) {
            self.ffprobe_bin = PathBuf::from(bin);
        }
    }

    /// The `--adjustment=<n>` argument for nice
    pub fn nice_arg(&self) -> String {
        format!("--adjustment={}", self.nice_adjustment)
    }

    /// Grid geometry in vcsi's `COLSxROWS` form
    pub fn grid_arg(&self) -> String {
        format!("{}x{}", self.contact_sheet_columns, self.contact_sheet_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = ToolConfig::default_config();
        assert_eq!(cfg.nice_arg(), "--adjustment=20");
        assert_eq!(cfg.grid_arg(), "3x5");
        assert_eq!(cfg.contact_sheet_width, 850);
        assert_eq!(cfg.ffmpeg_bin, PathBuf::from("/usr/bin/ffmpeg"));
        assert!(cfg.strict);
    }

    #[test]
    fn test_env_override_replaces_ffmpeg_bin() {
        let env: HashMap<&str, &str> = [(FFMPEG_BIN_ENV, "/opt/ffmpeg/bin/ffmpeg")].into();
        let mut cfg = ToolConfig::default_config();
        cfg.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.ffmpeg_bin, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(cfg.ffprobe_bin, PathBuf::from("/usr/bin/ffprobe"));
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut cfg = ToolConfig::default_config();
        cfg.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(cfg, ToolConfig::default_config());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(&path, "vcs_bin = \"/usr/local/bin/vcsi\"\nstrict = false\n").unwrap();

        let cfg = ToolConfig::load_config_with(Some(&path), |_| None).unwrap();

        assert_eq!(cfg.vcs_bin, PathBuf::from("/usr/local/bin/vcsi"));
        assert!(!cfg.strict);
        assert_eq!(cfg.nice_adjustment, 20);
    }

    #[test]
    fn test_env_overrides_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(
            &path,
            "ffmpeg_bin = \"/file/ffmpeg\"\nffprobe_bin = \"/file/ffprobe\"\n",
        )
        .unwrap();

        let env: HashMap<&str, &str> = [(FFPROBE_BIN_ENV, "/env/ffprobe")].into();
        let cfg = ToolConfig::load_config_with(Some(&path), |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.ffmpeg_bin, PathBuf::from("/file/ffmpeg"));
        assert_eq!(cfg.ffprobe_bin, PathBuf::from("/env/ffprobe"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(&path, "strict = \"maybe\"\n").unwrap();

        assert!(ToolConfig::load_config_with(Some(&path), |_| None).is_err());
    }

    #[test]
    fn test_load_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        std::fs::write(&path, r#"{"contact_sheet_width": 1200}"#).unwrap();

        let cfg = ToolConfig::load_config_with(Some(&path), |_| None).unwrap();
        assert_eq!(cfg.contact_sheet_width, 1200);
        assert_eq!(cfg.contact_sheet_rows, 5);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ToolConfig::load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
