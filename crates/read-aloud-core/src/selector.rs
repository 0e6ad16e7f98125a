//! Backend selection: on-device speech first, then the remote service.

use crate::backend::Mode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A voice offered by the on-device synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub language: String,
}

/// Parsed `/health` reply from the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHealth {
    /// Engine names the service reports as installed.
    pub engines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub voices: Vec<Voice>,
    pub remote: Option<RemoteHealth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSelection {
    pub mode: Mode,
    pub capabilities: Capabilities,
}

impl BackendSelection {
    pub fn unavailable() -> Self {
        Self {
            mode: Mode::Unavailable,
            capabilities: Capabilities::default(),
        }
    }
}

/// Capability queries issued during selection.
///
/// `remote_health` must apply its own bounded timeout and report expiry as an
/// error.
pub trait BackendProbe {
    fn on_device_voices(&self) -> Vec<Voice>;

    fn remote_health(&self) -> Result<RemoteHealth, String>;
}

/// Probe backends in priority order; the first usable one wins.
///
/// An empty voice list counts as unavailable: some platforms advertise speech
/// before their voices finish loading, and callers re-probe when the list
/// changes.
pub fn select_backend(probe: &dyn BackendProbe) -> BackendSelection {
    let voices = probe.on_device_voices();
    if !voices.is_empty() {
        info!(voices = voices.len(), "Selected on-device speech");
        return BackendSelection {
            mode: Mode::OnDevice,
            capabilities: Capabilities {
                voices,
                remote: None,
            },
        };
    }
    debug!("No on-device voices; probing remote service");

    match probe.remote_health() {
        Ok(health) => {
            info!(engines = ?health.engines, "Selected remote synthesis service");
            BackendSelection {
                mode: Mode::Remote,
                capabilities: Capabilities {
                    voices: Vec::new(),
                    remote: Some(health),
                },
            }
        }
        Err(err) => {
            warn!("Remote synthesis service unavailable: {err}");
            BackendSelection::unavailable()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    pub(crate) struct FakeProbe {
        pub voices: Vec<Voice>,
        pub health: Result<RemoteHealth, String>,
        pub remote_calls: Cell<usize>,
    }

    impl FakeProbe {
        pub(crate) fn new(voices: Vec<Voice>, health: Result<RemoteHealth, String>) -> Self {
            Self {
                voices,
                health,
                remote_calls: Cell::new(0),
            }
        }
    }

    impl BackendProbe for FakeProbe {
        fn on_device_voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn remote_health(&self) -> Result<RemoteHealth, String> {
            self.remote_calls.set(self.remote_calls.get() + 1);
            self.health.clone()
        }
    }

    pub(crate) fn voice(name: &str) -> Voice {
        Voice {
            name: name.to_string(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn prefers_on_device_when_voices_exist() {
        let probe = FakeProbe::new(vec![voice("en-us")], Ok(RemoteHealth::default()));
        let selection = select_backend(&probe);
        assert_eq!(selection.mode, Mode::OnDevice);
        assert_eq!(selection.capabilities.voices.len(), 1);
        assert_eq!(probe.remote_calls.get(), 0);
    }

    #[test]
    fn empty_voice_list_falls_through_to_remote() {
        let health = RemoteHealth {
            engines: vec!["espeak".into()],
        };
        let probe = FakeProbe::new(Vec::new(), Ok(health.clone()));
        let selection = select_backend(&probe);
        assert_eq!(selection.mode, Mode::Remote);
        assert_eq!(selection.capabilities.remote, Some(health));
    }

    #[test]
    fn both_failing_is_unavailable() {
        let probe = FakeProbe::new(Vec::new(), Err("connection refused".into()));
        assert_eq!(select_backend(&probe), BackendSelection::unavailable());
    }
}
