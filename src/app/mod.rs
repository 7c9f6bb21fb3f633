// Application layer - Use case interactors

use std::path::Path;

use tracing::warn;

use crate::domain::model::MediaInfo;
use crate::error::CutterResult;
use crate::ports::ProbePort;

pub mod container;
pub mod cut_interactor;
pub mod inspect_interactor;
pub mod report;

pub use container::{AppContainer, DefaultAppContainer};
pub use cut_interactor::{CutInteractor, CutRequest, CutRun, EncoderSettings, PreparedCut};
pub use inspect_interactor::InspectInteractor;
pub use report::RunReport;

/// Probe `path`, retrying once when the first failure is retryable
pub(crate) async fn probe_with_retry(port: &dyn ProbePort, path: &Path) -> CutterResult<MediaInfo> {
    match port.probe(path).await {
        Err(e) if e.is_retryable() => {
            warn!(path = %path.display(), error = %e, "Probe failed, retrying once");
            port.probe(path).await
        }
        result => result,
    }
}
