pub(crate) fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

pub(crate) fn default_playback_rate() -> f32 {
    1.0
}

pub(crate) fn default_health_timeout_secs() -> f32 {
    3.0
}

pub(crate) fn default_synthesis_timeout_secs() -> f32 {
    30.0
}

pub(crate) fn default_espeak_command() -> String {
    "espeak-ng".to_string()
}

pub(crate) fn default_espeak_words_per_minute() -> u32 {
    175
}

pub(crate) fn default_context_words() -> usize {
    15
}

pub(crate) fn default_skip_words() -> i64 {
    10
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
