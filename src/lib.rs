//! VideoCutter Library
//!
//! Cuts a segment out of a video between two timecodes and re-encodes it by
//! driving external `ffmpeg`/`ffprobe` processes: timecode arithmetic, media
//! probing, encoder argument construction and supervision of the running
//! encoder with progress reporting and cancellation.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{Job, JobBuilder, JobOutcome, MediaInfo, ProgressEvent};
pub use domain::timecode::{FrameRate, Timecode};
pub use engine::{ProcessSupervisor, SupervisorState};
pub use error::{CutterError, CutterResult};
pub use planner::CommandBuilder;
