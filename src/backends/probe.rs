//! Capability probe used by backend selection.

use crate::remote::RemoteClient;
use read_aloud_core::{BackendProbe, RemoteHealth, Voice};
use std::process::Command;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct SystemProbe {
    espeak_command: String,
    client: Arc<Mutex<RemoteClient>>,
}

impl SystemProbe {
    pub fn new(espeak_command: String, client: Arc<Mutex<RemoteClient>>) -> Self {
        Self {
            espeak_command,
            client,
        }
    }
}

impl BackendProbe for SystemProbe {
    fn on_device_voices(&self) -> Vec<Voice> {
        match Command::new(&self.espeak_command).arg("--voices").output() {
            Ok(output) if output.status.success() => {
                parse_espeak_voices(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!(status = %output.status, "espeak voice listing failed");
                Vec::new()
            }
            Err(err) => {
                debug!(command = %self.espeak_command, "On-device speech not found: {err}");
                Vec::new()
            }
        }
    }

    fn remote_health(&self) -> Result<RemoteHealth, String> {
        let client = self
            .client
            .lock()
            .map_err(|_| "HTTP client unavailable".to_string())?
            .clone();
        client.health()
    }
}

/// Parse `espeak-ng --voices`: a header row, then
/// `Pty Language Age/Gender VoiceName File Other`.
pub fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            Some(Voice {
                name: parts[3].to_string(),
                language: parts[1].to_string(),
            })
        })
        .collect()
}
