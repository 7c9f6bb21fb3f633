//! Configuration initialization and hierarchy management

use tracing::debug;

use crate::adapters::AppConfig;
use crate::cli::Cli;
use crate::error::CutterResult;

/// Build the effective configuration: CLI > Env > File > Defaults
pub fn initialize_configuration(cli: &Cli) -> CutterResult<AppConfig> {
    resolve_configuration(cli, |name| std::env::var(name).ok())
}

/// Same as [`initialize_configuration`] with an injectable environment
pub fn resolve_configuration<F>(cli: &Cli, env: F) -> CutterResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    let env_overrides = config.apply_env(env)?;
    let cli_overrides = apply_cli_overrides(&mut config, cli)?;
    debug!(env_overrides, cli_overrides, "Configuration resolved");
    Ok(config)
}

fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) -> CutterResult<usize> {
    let mut applied = 0;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.parse()?;
        applied += 1;
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.parse()?;
        applied += 1;
    }
    if let Some(dir) = &cli.bundled_dir {
        config.binaries.bundled_dir = Some(dir.clone());
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CutterError;
    use crate::utils::logging::{LogFormat, LogLevel};
    use clap::Parser;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["videocutter"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["preview", "-i", "a.mp4"]);
        Cli::try_parse_from(argv).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutter.toml");
        std::fs::write(
            &path,
            "[logging]\nlevel = \"error\"\nformat = \"compact\"\n\n[probe]\ntimeout_ms = 2000\n",
        )
        .unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let config = resolve_configuration(
            &cli(&["--config", &config_arg, "--log-level", "trace"]),
            env(&[
                ("VIDEOCUTTER_LOG_LEVEL", "debug"),
                ("VIDEOCUTTER_LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.probe.timeout_ms, 2000);
    }

    #[test]
    fn test_bundled_dir_from_cli() {
        let config = resolve_configuration(
            &cli(&["--bundled-dir", "/opt/ffmpeg"]),
            env(&[("VIDEOCUTTER_BUNDLED_DIR", "/env/ffmpeg")]),
        )
        .unwrap();
        assert_eq!(config.binaries.bundled_dir, Some(PathBuf::from("/opt/ffmpeg")));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(matches!(
            resolve_configuration(&cli(&["--log-level", "loud"]), env(&[])),
            Err(CutterError::Config { .. })
        ));
        assert!(matches!(
            resolve_configuration(&cli(&[]), env(&[("VIDEOCUTTER_GRACE_PERIOD_MS", "soon")])),
            Err(CutterError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(matches!(
            resolve_configuration(&cli(&["--config", "/no/such/videocutter.toml"]), env(&[])),
            Err(CutterError::Config { .. })
        ));
    }
}
