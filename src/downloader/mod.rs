pub mod dependency;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod stream_selector;
pub mod ytdlp;

pub use dependency::{BinaryProbe, DependencyProbe};
pub use error::{DownloadError, ErrorCategory, ExtractError};
pub use models::{DownloadRequest, TargetFormat, VideoQuality};
pub use orchestrator::{CompletedDownload, DownloadOrchestrator};
pub use progress::{PROGRESS_SLOT, ProgressEvent, ProgressRecord, ProgressRelay, ProgressSink};
pub use stream_selector::StreamSelection;
pub use ytdlp::{ExtractionOutcome, ExtractionPlan, MediaExtractor, YtDlpExtractor};
