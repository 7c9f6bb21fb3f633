// Adapters - External system implementations

pub mod binary_locator;
pub mod probe_ffprobe;
pub mod toml_config;

// Re-export adapters
pub use binary_locator::BinaryLocator;
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::AppConfig;
