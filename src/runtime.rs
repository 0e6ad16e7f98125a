//! Single-threaded event loop owning the transport controller.
//!
//! Everything that mutates playback state happens here: stdin lines, engine
//! events from backend workers and the ticker, and Ctrl-C all arrive as
//! [`RuntimeMessage`]s on one channel.

use crate::backends::{EspeakBackend, EventTx, RemoteBackend, SystemProbe, ThreadTicker};
use crate::backends::on_device::EspeakSettings;
use crate::commands::{CastCommand, Command, HELP, ModeChoice, parse_command};
use crate::config::{AppConfig, ModePreference, save_config};
use crate::remote::RemoteClient;
use crate::terminal::{TerminalRenderer, notice};
use anyhow::{Context, Result};
use read_aloud_core::{
    Backends, EngineEvent, Mode, PlayState, ProbeOutcome, REMOTE_CHUNK_WORDS, Source, TransportController,
    WordSyncEngine,
};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub enum RuntimeMessage {
    Input(String),
    Engine(EngineEvent),
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

pub struct Runtime {
    transport: TransportController,
    client: Arc<Mutex<RemoteClient>>,
    probe: SystemProbe,
    config: AppConfig,
    config_path: PathBuf,
    tx: Sender<RuntimeMessage>,
    rx: Receiver<RuntimeMessage>,
}

impl Runtime {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let events = EventTx::new(tx.clone());
        let client = Arc::new(Mutex::new(build_client(&config)?));

        let backends = Backends {
            on_device: Box::new(EspeakBackend::new(
                EspeakSettings {
                    command: config.espeak_command.clone(),
                    words_per_minute: config.espeak_words_per_minute,
                },
                events.clone(),
            )),
            remote: Box::new(RemoteBackend::new(Arc::clone(&client), events.clone())),
        };
        let engine = WordSyncEngine::new(
            backends,
            Box::new(ThreadTicker::new(events)),
            Box::new(TerminalRenderer::new(config.context_words)),
            Mode::Unavailable,
            config.playback_rate,
        );
        let mut transport = TransportController::new(engine);
        transport.set_voice(config.voice.clone());
        let probe = SystemProbe::new(config.espeak_command.clone(), Arc::clone(&client));

        Ok(Self {
            transport,
            client,
            probe,
            config,
            config_path,
            tx,
            rx,
        })
    }

    /// Pick the initial backend and optionally load a page from disk.
    pub fn start(&mut self, initial: Option<PathBuf>) {
        self.apply_mode_preference(self.config.mode);
        if let Some(path) = initial {
            self.load_file(&path);
        }
    }

    pub fn run(mut self) -> Result<()> {
        let quit_tx = self.tx.clone();
        ctrlc::set_handler(move || {
            let _ = quit_tx.send(RuntimeMessage::Quit);
        })
        .context("Installing Ctrl-C handler")?;
        spawn_stdin_reader(self.tx.clone())?;
        notice("type `help` for commands");

        while let Ok(message) = self.rx.recv() {
            let flow = match message {
                RuntimeMessage::Input(line) => match parse_command(&line) {
                    Ok(command) => self.dispatch(command),
                    Err(err) => {
                        notice(&format!("? {err}"));
                        Flow::Continue
                    }
                },
                RuntimeMessage::Engine(event) => {
                    self.transport.handle_event(event);
                    Flow::Continue
                }
                RuntimeMessage::Quit => Flow::Quit,
            };
            if matches!(flow, Flow::Quit) {
                break;
            }
        }
        info!("Shutting down");
        self.transport.stop();
        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> Flow {
        debug!(?command, "Dispatching command");
        match command {
            Command::Load(path) => self.load_file(&path),
            Command::Select(text) => {
                let _ = self.transport.load_document(Source::Selection(text));
            }
            Command::Toggle => self.transport.toggle_play_pause(),
            Command::Pause => {
                if self.transport.engine().play_state() == PlayState::Playing {
                    self.transport.toggle_play_pause();
                }
            }
            Command::Stop => self.transport.stop(),
            Command::Restart => self.transport.restart(),
            Command::Skip(words) => self.transport.skip(words),
            Command::Rewind => self.transport.skip(-self.config.skip_words),
            Command::Forward => self.transport.skip(self.config.skip_words),
            Command::Rate(rate) => {
                let applied = self.transport.set_rate(rate);
                notice(&format!("rate {applied:.1}x (applies from the next utterance)"));
            }
            Command::Mode(choice) => {
                self.config.mode = match choice {
                    ModeChoice::Auto => ModePreference::Auto,
                    ModeChoice::OnDevice => ModePreference::OnDevice,
                    ModeChoice::Remote => ModePreference::Remote,
                };
                self.apply_mode_preference(self.config.mode);
            }
            Command::Voice(voice) => {
                notice(&format!("voice {}", voice.as_deref().unwrap_or("(default)")));
                self.transport.set_voice(voice);
            }
            Command::Voices => self.list_voices(),
            Command::Server(url) => self.update_server(&url),
            Command::Probe => self.reprobe(),
            Command::Status => self.print_status(),
            Command::Cast(cast) => self.cast(cast),
            Command::Help => notice(HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn load_file(&mut self, path: &Path) {
        match fs::read_to_string(path) {
            Ok(text) => {
                if let Ok(words) = self.transport.load_document(Source::Page(text)) {
                    info!(path = %path.display(), words, "Loaded page");
                }
            }
            Err(err) => {
                warn!(path = %path.display(), "Failed to read page: {err}");
                notice(&format!("! Cannot read {}: {err}", path.display()));
            }
        }
    }

    fn apply_mode_preference(&mut self, preference: ModePreference) {
        info!(%preference, "Applying backend preference");
        match preference {
            ModePreference::Auto => self.reprobe(),
            ModePreference::OnDevice => self.transport.set_mode(Mode::OnDevice),
            ModePreference::Remote => self.transport.set_mode(Mode::Remote),
        }
    }

    fn reprobe(&mut self) {
        if self.transport.reprobe(&self.probe) == ProbeOutcome::Deferred {
            notice("backend probe deferred until playback stops");
        }
    }

    fn update_server(&mut self, url: &str) {
        self.config.server_url = url.trim().trim_end_matches('/').to_string();
        match build_client(&self.config) {
            Ok(client) => match self.client.lock() {
                Ok(mut slot) => *slot = client,
                Err(_) => warn!("HTTP client lock poisoned; keeping previous server"),
            },
            Err(err) => {
                notice(&format!("! {err:#}"));
                return;
            }
        }
        if let Err(err) = save_config(&self.config_path, &self.config) {
            warn!("{err:#}");
            notice(&format!("! Could not save settings: {err:#}"));
        } else {
            notice(&format!("server set to {}", self.config.server_url));
        }
        if self.config.mode == ModePreference::Auto {
            self.reprobe();
        }
    }

    fn list_voices(&self) {
        if let Some(selection) = self.transport.selection() {
            for voice in &selection.capabilities.voices {
                notice(&format!("  {} ({})", voice.name, voice.language));
            }
            if let Some(health) = &selection.capabilities.remote {
                notice(&format!("  remote engines: {}", health.engines.join(", ")));
            }
        }
        match self.remote_client().and_then(|client| client.voices()) {
            Ok(voices) => {
                for voice in voices {
                    notice(&format!(
                        "  {} [remote{}]",
                        voice.name,
                        voice.language.map(|l| format!(" {l}")).unwrap_or_default()
                    ));
                }
            }
            Err(err) => debug!("Remote voice list unavailable: {err:#}"),
        }
    }

    fn print_status(&self) {
        let engine = self.transport.engine();
        let controls = self.transport.controls();
        notice(&format!(
            "mode {} | state {:?} | word {}/{} | rate {:.1}x | voice {}",
            engine.mode(),
            engine.play_state(),
            engine.cursor(),
            engine.document().len(),
            engine.session().rate(),
            engine.session().voice().unwrap_or("(default)"),
        ));
        match serde_json::to_string(&controls) {
            Ok(json) => notice(&format!("controls {json}")),
            Err(err) => debug!("Failed to serialize controls: {err}"),
        }
    }

    fn cast(&self, command: CastCommand) {
        let result = self.remote_client().and_then(|client| match command {
            CastCommand::Status => client.cast_status().map(|status| {
                if status.connected {
                    format!(
                        "cast: {} ({})",
                        status.device.unwrap_or_default(),
                        if status.playing {
                            "playing"
                        } else if status.paused {
                            "paused"
                        } else {
                            "idle"
                        }
                    )
                } else {
                    format!(
                        "cast: not connected{}",
                        status.error.map(|e| format!(" ({e})")).unwrap_or_default()
                    )
                }
            }),
            CastCommand::Devices => client.cast_devices().map(|devices| {
                if devices.is_empty() {
                    return "cast: no devices found".to_string();
                }
                devices
                    .iter()
                    .map(|d| {
                        format!(
                            "  {} {} {}",
                            d.uuid,
                            d.name,
                            d.model.as_deref().or(d.host.as_deref()).unwrap_or("")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
            CastCommand::Connect(uuid) => client
                .cast_connect(&uuid)
                .map(|device| format!("cast: connected to {device}")),
            CastCommand::Send => self.spawn_cast_send(client),
            CastCommand::Control(action) => client
                .cast_control(action)
                .map(|()| format!("cast: {action:?}")),
            CastCommand::Disconnect => client
                .cast_disconnect()
                .map(|()| "cast: disconnected".to_string()),
        });
        match result {
            Ok(message) => notice(&message),
            Err(err) => {
                warn!("Cast request failed: {err:#}");
                notice(&format!("! {err:#}"));
            }
        }
    }

    /// Synthesize the words at the cursor and hand them to the cast relay.
    ///
    /// Runs on its own thread; synthesis can take the full request timeout.
    fn spawn_cast_send(&self, client: RemoteClient) -> Result<String> {
        let engine = self.transport.engine();
        let from = engine.cursor();
        let text = engine
            .document()
            .text_for(from..from.saturating_add(REMOTE_CHUNK_WORDS));
        if text.is_empty() {
            return Err(anyhow::anyhow!("Nothing to cast at the cursor"));
        }
        let rate = engine.session().rate();
        let voice = engine.session().voice().map(str::to_string);
        thread::Builder::new()
            .name("cast-send".into())
            .spawn(move || {
                let sent = client
                    .synthesize(&text, rate, voice.as_deref())
                    .map_err(anyhow::Error::from)
                    .and_then(|wav| client.cast_audio(wav));
                match sent {
                    Ok(()) => notice("cast: audio sent"),
                    Err(err) => {
                        warn!("Cast send failed: {err:#}");
                        notice(&format!("! {err:#}"));
                    }
                }
            })
            .context("Spawning cast worker")?;
        Ok("cast: sending audio...".to_string())
    }

    fn remote_client(&self) -> Result<RemoteClient> {
        self.client
            .lock()
            .map(|client| client.clone())
            .map_err(|_| anyhow::anyhow!("HTTP client unavailable"))
    }
}

fn build_client(config: &AppConfig) -> Result<RemoteClient> {
    RemoteClient::new(
        &config.server_url,
        Duration::from_secs_f32(config.health_timeout_secs),
        Duration::from_secs_f32(config.synthesis_timeout_secs),
    )
}

fn spawn_stdin_reader(tx: Sender<RuntimeMessage>) -> Result<()> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(RuntimeMessage::Input(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(RuntimeMessage::Quit);
        })
        .context("Spawning stdin reader")?;
    Ok(())
}
