pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ffprobe;
pub mod invoker;
pub mod report;
pub mod scan;
pub mod sidecar;

pub use batch::{BatchRequest, BatchRunner, FailurePolicy, PostAction};
pub use classifier::{ClassificationMethod, MediaProbe, VideoTrack};
pub use config::ToolConfig;
pub use error::{BatchError, Result};
pub use ffprobe::FfprobeProbe;
pub use invoker::{ExternalTools, ProcessInvoker, ProcessResult};
pub use report::{BatchReport, FileOutcome, OutcomeStatus};
pub use scan::VideoFile;
pub use sidecar::{ArtifactSet, TranscodeTask};
