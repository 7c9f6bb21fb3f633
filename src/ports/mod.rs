// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::MediaInfo;
use crate::error::CutterResult;

/// Port for media metadata probing
///
/// Implementations make a single attempt; retry policy belongs to the caller.
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe a media file and describe its duration, frame rate and streams
    async fn probe(&self, path: &Path) -> CutterResult<MediaInfo>;
}
