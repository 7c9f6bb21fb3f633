//! Encoder execution engine: process supervision and progress reporting

pub mod diagnostics;
pub mod progress;
pub mod supervisor;

pub use diagnostics::{DiagnosticTail, LineDecoder};
pub use progress::{
    parse_progress_line, ChannelSink, ConsoleProgressSink, NullSink, ProgressMarker, ProgressSink,
    ProgressTracker, SupervisorEvent,
};
pub use supervisor::{ProcessSupervisor, RunHandle, SupervisorConfig, SupervisorState};
