use serde::Deserialize;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_server_url")]
    pub server_url: String,
    #[serde(default = "crate::config::defaults::default_playback_rate")]
    pub playback_rate: f32,
    #[serde(default)]
    pub mode: ModePreference,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "crate::config::defaults::default_health_timeout_secs")]
    pub health_timeout_secs: f32,
    #[serde(default = "crate::config::defaults::default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: f32,
    #[serde(default = "crate::config::defaults::default_espeak_command")]
    pub espeak_command: String,
    #[serde(default = "crate::config::defaults::default_espeak_words_per_minute")]
    pub espeak_words_per_minute: u32,
    #[serde(default = "crate::config::defaults::default_context_words")]
    pub context_words: usize,
    #[serde(default = "crate::config::defaults::default_skip_words")]
    pub skip_words: i64,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server_url: crate::config::defaults::default_server_url(),
            playback_rate: crate::config::defaults::default_playback_rate(),
            mode: ModePreference::Auto,
            voice: None,
            health_timeout_secs: crate::config::defaults::default_health_timeout_secs(),
            synthesis_timeout_secs: crate::config::defaults::default_synthesis_timeout_secs(),
            espeak_command: crate::config::defaults::default_espeak_command(),
            espeak_words_per_minute: crate::config::defaults::default_espeak_words_per_minute(),
            context_words: crate::config::defaults::default_context_words(),
            skip_words: crate::config::defaults::default_skip_words(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

/// How the playback backend is chosen at startup.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ModePreference {
    /// Probe on-device speech first, then the remote service.
    #[default]
    Auto,
    OnDevice,
    Remote,
}

impl std::fmt::Display for ModePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ModePreference::Auto => "auto",
            ModePreference::OnDevice => "on-device",
            ModePreference::Remote => "remote",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
