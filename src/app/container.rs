use std::sync::Arc;

use tracing::debug;

use crate::adapters::{AppConfig, BinaryLocator, FfprobeAdapter};
use crate::app::{cut_interactor::CutInteractor, cut_interactor::EncoderSettings, inspect_interactor::InspectInteractor};
use crate::domain::profiles::ProfileTable;
use crate::engine::SupervisorConfig;
use crate::error::CutterResult;
use crate::planner::CommandBuilder;
use crate::ports::ProbePort;

/// Builds interactors on demand
///
/// Binaries are resolved when an interactor is requested, so `probe` works
/// without ffmpeg installed and vice versa.
pub trait AppContainer: Send + Sync {
    fn cut_interactor(&self) -> CutterResult<Arc<CutInteractor>>;
    fn inspect_interactor(&self) -> CutterResult<Arc<InspectInteractor>>;
}

pub struct DefaultAppContainer {
    config: AppConfig,
    locator: BinaryLocator,
    profiles: Arc<ProfileTable>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> CutterResult<Self> {
        let profiles = Arc::new(config.profile_table()?);
        let locator = config.binary_locator();
        debug!(bundled_dir = ?locator.bundled_dir(), "Application container ready");
        Ok(Self {
            config,
            locator,
            profiles,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn profiles(&self) -> Arc<ProfileTable> {
        Arc::clone(&self.profiles)
    }

    fn probe_port(&self) -> CutterResult<Arc<dyn ProbePort>> {
        let adapter = FfprobeAdapter::from_locator(
            &self.locator,
            &self.config.binaries.ffprobe,
            self.config.probe_timeout(),
        )?;
        Ok(Arc::new(adapter) as Arc<dyn ProbePort>)
    }

    fn encoder_settings(&self) -> CutterResult<EncoderSettings> {
        let program = self.locator.locate(&self.config.binaries.ffmpeg)?;
        Ok(EncoderSettings::new(
            program,
            SupervisorConfig {
                grace_period: self.config.grace_period(),
                diagnostic_tail_lines: self.config.encoder.diagnostic_tail_lines,
            },
        ))
    }
}

impl AppContainer for DefaultAppContainer {
    fn cut_interactor(&self) -> CutterResult<Arc<CutInteractor>> {
        let probe_port = self.probe_port()?;
        let encoder = self.encoder_settings()?;
        let command_builder =
            Arc::new(CommandBuilder::new(self.profiles()).overwrite(self.config.encoder.overwrite));
        Ok(Arc::new(CutInteractor::new(probe_port, command_builder, encoder)))
    }

    fn inspect_interactor(&self) -> CutterResult<Arc<InspectInteractor>> {
        Ok(Arc::new(InspectInteractor::new(self.probe_port()?)))
    }
}
