use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use humansize::{format_size, DECIMAL};
use log::{error, info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use transcoder::{
    classifier, scan, BatchRequest, BatchRunner, ClassificationMethod, FailurePolicy, FfprobeProbe,
    ProcessInvoker, ToolConfig,
};

/// Batch HEVC transcoding with ffmpeg and vcsi contact sheets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcode a single video to HEVC
    Transcode {
        file: PathBuf,

        /// Delete the source (and its contact sheet) after a successful transcode
        #[arg(short, long)]
        delete_source: bool,
    },

    /// Create contact sheets for a video or every video in a directory
    Vcs {
        path: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Regenerate sheets that already exist
        #[arg(short, long)]
        overwrite: bool,
    },

    /// Transcode every video in a directory that is not HEVC yet
    Batch {
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Move each source into this directory after it is transcoded
        #[arg(short, long, value_name = "DIR")]
        move_source: Option<PathBuf>,

        /// Delete each source after it is transcoded
        #[arg(short, long)]
        delete_source: bool,

        /// Classification method: fast, accurate or semi-accurate
        #[arg(long, default_value = "fast")]
        method: String,

        /// Stop at the first failed file
        #[arg(long)]
        fail_fast: bool,

        /// Record non-zero exits from ffmpeg/vcsi instead of treating them as errors
        #[arg(long)]
        no_strict: bool,

        /// Write a JSON report of the run to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// List videos that would be transcoded
    Find {
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Classification method: fast, accurate or semi-accurate
        #[arg(long, default_value = "fast")]
        method: String,

        /// Stop after this many results
        #[arg(long)]
        limit: Option<usize>,

        /// Print the file size next to each path
        #[arg(long)]
        sizes: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins unless --verbose is given
    let mut logger = env_logger::Builder::from_default_env();
    logger.format_timestamp_secs();
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let mut cfg = ToolConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    match args.command {
        Commands::Transcode { file, delete_source } => {
            let invoker = ProcessInvoker::new(cfg.clone());
            let probe = FfprobeProbe::new(&cfg);
            let runner = BatchRunner::new(&invoker, &probe);

            let result = runner
                .transcode_file(&file, delete_source)
                .with_context(|| format!("Failed to transcode {}", file.display()))?;
            info!("ffmpeg exited with status {} for {}", result.exit_code, file.display());
        }

        Commands::Vcs { path, recursive, overwrite } => {
            let invoker = ProcessInvoker::new(cfg.clone());
            let probe = FfprobeProbe::new(&cfg);
            let runner = BatchRunner::new(&invoker, &probe);

            let results = runner
                .make_contact_sheets(&path, recursive, overwrite)
                .with_context(|| format!("Failed to create contact sheets for {}", path.display()))?;
            info!("🖼️  Created {} contact sheet(s)", results.iter().filter(|r| r.is_ok()).count());
        }

        Commands::Batch {
            dir,
            recursive,
            move_source,
            delete_source,
            method,
            fail_fast,
            no_strict,
            report,
        } => {
            let method = parse_method(&method)?;
            if no_strict {
                cfg.strict = false;
            }

            let invoker = ProcessInvoker::new(cfg.clone());
            let probe = FfprobeProbe::new(&cfg);
            let runner = BatchRunner::new(&invoker, &probe);

            let request = BatchRequest {
                root: dir,
                recursive,
                method,
                move_source,
                delete_source,
                failure_policy: if fail_fast { FailurePolicy::Abort } else { FailurePolicy::Continue },
            };

            let batch_report = runner
                .run(&request)
                .with_context(|| format!("Batch failed in {}", request.root.display()))?;

            println!(
                "Transcoded: {}  Skipped: {}  Failed: {}",
                batch_report.transcoded(),
                batch_report.skipped(),
                batch_report.failed()
            );

            if let Some(report_path) = report {
                batch_report
                    .save(&report_path)
                    .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
                info!("Report written to {}", report_path.display());
            }
        }

        Commands::Find { dir, recursive, method, limit, sizes } => {
            let method = parse_method(&method)?;
            let probe = FfprobeProbe::new(&cfg);
            find(&dir, recursive, method, limit, sizes, &probe)?;
        }
    }

    Ok(())
}

fn parse_method(name: &str) -> Result<ClassificationMethod> {
    ClassificationMethod::from_str(name).context("Invalid --method")
}

/// Print the videos under `dir` that are not HEVC yet
fn find(
    dir: &Path,
    recursive: bool,
    method: ClassificationMethod,
    limit: Option<usize>,
    sizes: bool,
    probe: &FfprobeProbe,
) -> Result<()> {
    let files = scan::discover(dir, recursive)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    let mut printed = 0usize;
    for candidate in classifier::non_matching(files, method, probe) {
        if limit.is_some_and(|max| printed >= max) {
            break;
        }
        match candidate {
            Ok(video) => {
                if sizes {
                    println!("{}\t{}", size_label(video.path()), video.path().display());
                } else {
                    println!("{}", video.path().display());
                }
                printed += 1;
            }
            Err(e) => error!("{}", e),
        }
    }
    Ok(())
}

/// Human-readable size of `path`, or `?` when it cannot be read
fn size_label(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format_size(meta.len(), DECIMAL),
        Err(e) => {
            warn!("Could not read size of {}: {}", path.display(), e);
            "?".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_label_formats_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, vec![0u8; 1000]).unwrap();
        assert_eq!(size_label(&path), "1 kB");
    }

    #[test]
    fn test_size_label_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(size_label(&dir.path().join("gone.mp4")), "?");
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(parse_method("slow").is_err());
        assert_eq!(parse_method("semi-accurate").unwrap(), ClassificationMethod::SemiAccurate);
    }
}
