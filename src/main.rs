//! Entry point for the read-aloud player.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml` (or `--config`).
//! - Hand off to the runtime loop with an optional page to load.

mod audio;
mod backends;
mod cancellation;
mod commands;
mod config;
mod remote;
mod runtime;
mod terminal;

use crate::config::load_config;
use crate::runtime::Runtime;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";

#[derive(Debug, PartialEq)]
struct Args {
    config_path: PathBuf,
    page: Option<PathBuf>,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %args.config_path.display(),
        level = %config.log_level,
        "Starting read-aloud player"
    );
    info!(
        server = %config.server_url,
        mode = %config.mode,
        rate = config.playback_rate,
        voice = ?config.voice,
        espeak = %config.espeak_command,
        "Active speech configuration"
    );

    let mut runtime =
        Runtime::new(config, args.config_path).context("Failed to set up playback")?;
    runtime.start(args.page);
    runtime.run()
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut page = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("Usage: read-aloud [--config <path>] [page.txt]"))?;
                config_path = PathBuf::from(value);
            }
            _ if page.is_none() => {
                let path = PathBuf::from(arg);
                if !path.exists() {
                    return Err(anyhow!("File not found: {}", path.display()));
                }
                page = Some(path);
            }
            other => return Err(anyhow!("Unexpected argument: {other}")),
        }
    }
    Ok(Args { config_path, page })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_conf_dir_without_page() {
        assert_eq!(
            args(&[]).unwrap(),
            Args {
                config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
                page: None,
            }
        );
    }

    #[test]
    fn config_flag_and_existing_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.txt");
        std::fs::write(&page, "hello").unwrap();
        let parsed = args(&["--config", "alt.toml", page.to_str().unwrap()]).unwrap();
        assert_eq!(parsed.config_path, PathBuf::from("alt.toml"));
        assert_eq!(parsed.page, Some(page));
    }

    #[test]
    fn missing_page_or_flag_value_is_an_error() {
        assert!(args(&["/definitely/not/here.txt"]).is_err());
        assert!(args(&["--config"]).is_err());
    }
}
