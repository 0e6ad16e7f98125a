//! Line-oriented command surface standing in for the panel controls.

use crate::remote::cast::CastAction;
use anyhow::{Context, Result, anyhow, bail};
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  load <file>        load a text file as the page
  select <text>      load inline text as a selection
  play | toggle | p  play / pause / resume
  pause              pause if playing
  stop | restart     stop playback / rewind to the first word
  skip <n>           move the cursor by n words (negative goes back)
  rewind | forward   skip by the configured step
  rate <0.5-2.0>     playback rate, applied from the next utterance
  mode <auto|on-device|remote>
  voice [name]       choose a voice, or clear it
  voices             list known voices
  server <url>       save the synthesis server URL and re-probe
  probe              re-run backend selection
  status             print control state
  cast status|devices|connect <uuid>|send|play|pause|stop|disconnect
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(PathBuf),
    Select(String),
    Toggle,
    Pause,
    Stop,
    Restart,
    Skip(i64),
    Rewind,
    Forward,
    Rate(f32),
    Mode(ModeChoice),
    Voice(Option<String>),
    Voices,
    Server(String),
    Probe,
    Status,
    Cast(CastCommand),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChoice {
    Auto,
    OnDevice,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastCommand {
    Status,
    Devices,
    Connect(String),
    Send,
    Control(CastAction),
    Disconnect,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "load" | "open" => Command::Load(PathBuf::from(required(rest, "load <file>")?)),
        "select" => Command::Select(required(rest, "select <text>")?.to_string()),
        "play" | "toggle" | "p" => Command::Toggle,
        "pause" => Command::Pause,
        "stop" | "s" => Command::Stop,
        "restart" => Command::Restart,
        "skip" => Command::Skip(
            required(rest, "skip <n>")?
                .parse()
                .with_context(|| format!("Invalid word count: {rest}"))?,
        ),
        "rewind" | "b" => Command::Rewind,
        "forward" | "f" => Command::Forward,
        "rate" | "speed" => Command::Rate(
            required(rest, "rate <value>")?
                .parse()
                .with_context(|| format!("Invalid rate: {rest}"))?,
        ),
        "mode" => Command::Mode(parse_mode(rest)?),
        "voice" => Command::Voice((!rest.is_empty()).then(|| rest.to_string())),
        "voices" => Command::Voices,
        "server" => Command::Server(required(rest, "server <url>")?.to_string()),
        "probe" => Command::Probe,
        "status" => Command::Status,
        "cast" => Command::Cast(parse_cast(rest)?),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "" => bail!("Empty command"),
        other => bail!("Unknown command: {other} (try `help`)"),
    };
    Ok(command)
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() {
        Err(anyhow!("Usage: {usage}"))
    } else {
        Ok(rest)
    }
}

fn parse_mode(value: &str) -> Result<ModeChoice> {
    match value {
        "auto" => Ok(ModeChoice::Auto),
        "on-device" | "ondevice" | "local" => Ok(ModeChoice::OnDevice),
        "remote" | "server" => Ok(ModeChoice::Remote),
        other => bail!("Unknown mode: {other:?} (auto, on-device, remote)"),
    }
}

fn parse_cast(rest: &str) -> Result<CastCommand> {
    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (rest, ""),
    };
    Ok(match word {
        "status" | "" => CastCommand::Status,
        "devices" => CastCommand::Devices,
        "connect" => CastCommand::Connect(required(arg, "cast connect <uuid>")?.to_string()),
        "send" => CastCommand::Send,
        "disconnect" => CastCommand::Disconnect,
        action => CastCommand::Control(action.parse()?),
    })
}
