use super::models::AppConfig;
use anyhow::{Context, Result};
use read_aloud_core::clamp_rate;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const MIN_TIMEOUT_SECS: f32 = 0.1;
const MAX_TIMEOUT_SECS: f32 = 600.0;

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

/// Parse TOML and pull every numeric setting back into its supported range.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let mut config: AppConfig = toml::from_str(contents).context("Parsing config TOML")?;
    config.playback_rate = clamp_rate(config.playback_rate);
    config.health_timeout_secs = sanitize_timeout(
        config.health_timeout_secs,
        super::defaults::default_health_timeout_secs(),
    );
    config.synthesis_timeout_secs = sanitize_timeout(
        config.synthesis_timeout_secs,
        super::defaults::default_synthesis_timeout_secs(),
    );
    config.espeak_words_per_minute = config.espeak_words_per_minute.clamp(80, 450);
    config.skip_words = config.skip_words.max(1);
    config.server_url = config.server_url.trim().trim_end_matches('/').to_string();
    Ok(config)
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Serializing config")
}

/// Persist the configuration, creating the parent directory if needed.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating config dir {}", parent.display()))?;
        }
    }
    let contents = serialize_config(config)?;
    fs::write(path, contents).with_context(|| format!("Writing config {}", path.display()))?;
    info!(path = %path.display(), "Saved config");
    Ok(())
}

fn sanitize_timeout(secs: f32, fallback: f32) -> f32 {
    if secs.is_finite() {
        secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
    } else {
        fallback
    }
}
