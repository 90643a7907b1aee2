//! Config discovery: `--config`, then the per-user file, then defaults.

use std::path::{Path, PathBuf};

use membersync_recon::SyncConfig;

use crate::exit_codes::EXIT_CONFIG_INVALID;
use crate::CliError;

/// `<config dir>/membersync/sync.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("membersync").join("sync.toml"))
}

/// Where the loaded config came from.
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

pub fn load(explicit: Option<&Path>) -> Result<(SyncConfig, ConfigOrigin), CliError> {
    if let Some(path) = explicit {
        return load_file(path).map(|config| (config, ConfigOrigin::File(path.to_path_buf())));
    }

    match user_config_path() {
        Some(path) if path.is_file() => {
            log::info!("using config {}", path.display());
            let config = load_file(&path)?;
            Ok((config, ConfigOrigin::File(path)))
        }
        _ => Ok((SyncConfig::default(), ConfigOrigin::Defaults)),
    }
}

fn load_file(path: &Path) -> Result<SyncConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {e}", path.display())))?;
    SyncConfig::from_toml(&text).map_err(|e| invalid(path, e))
}

/// Re-check a config after command-line overrides were applied.
pub fn revalidate(config: &SyncConfig, origin: &ConfigOrigin) -> Result<(), CliError> {
    config.validate().map_err(|e| CliError {
        code: EXIT_CONFIG_INVALID,
        message: format!("{origin}: {e}"),
        hint: None,
    })
}

fn invalid(path: &Path, e: membersync_recon::ReconError) -> CliError {
    CliError {
        code: EXIT_CONFIG_INVALID,
        message: format!("{}: {e}", path.display()),
        hint: None,
    }
    .with_hint("run `msync validate --config <file>` to check a config file")
}
