//! Pass-through client for the cast relay endpoints.

use super::RemoteClient;
use anyhow::{Context, Result, bail};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CastStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub playing: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CastDevice {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DevicesReply {
    #[serde(default)]
    devices: Vec<CastDevice>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CastReply {
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CastAction {
    Play,
    Pause,
    Stop,
}

impl std::str::FromStr for CastAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            other => bail!("Invalid cast action: {other}"),
        }
    }
}

impl RemoteClient {
    pub fn cast_status(&self) -> Result<CastStatus> {
        let response = self
            .control_client()
            .get(self.url("/api/cast/status"))
            .send()
            .context("Requesting cast status")?;
        response.json().context("Parsing cast status")
    }

    pub fn cast_devices(&self) -> Result<Vec<CastDevice>> {
        let response = self
            .control_client()
            .get(self.url("/api/cast/devices"))
            .send()
            .context("Requesting cast devices")?;
        let reply: DevicesReply = response.json().context("Parsing cast devices")?;
        if let Some(error) = reply.error {
            debug!(%error, "Cast relay reported a device error");
        }
        Ok(reply.devices)
    }

    /// Connect to a device by uuid; returns the device name.
    pub fn cast_connect(&self, uuid: &str) -> Result<String> {
        let response = self
            .transfer_client()
            .post(self.url("/api/cast/connect"))
            .json(&serde_json::json!({ "uuid": uuid }))
            .send()
            .context("Connecting cast device")?;
        let reply = expect_success(response)?;
        let device = reply.device.unwrap_or_else(|| uuid.to_string());
        info!(%device, "Connected cast device");
        Ok(device)
    }

    pub fn cast_audio(&self, wav: Vec<u8>) -> Result<()> {
        let part = Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")
            .context("Building cast audio part")?;
        let form = Form::new().part("audio", part);
        let response = self
            .transfer_client()
            .post(self.url("/api/cast/cast_data"))
            .multipart(form)
            .send()
            .context("Sending audio to cast device")?;
        expect_success(response)?;
        Ok(())
    }

    pub fn cast_control(&self, action: CastAction) -> Result<()> {
        let response = self
            .control_client()
            .post(self.url("/api/cast/control"))
            .json(&serde_json::json!({ "action": action }))
            .send()
            .context("Sending cast control")?;
        expect_success(response)?;
        Ok(())
    }

    pub fn cast_disconnect(&self) -> Result<()> {
        let response = self
            .control_client()
            .post(self.url("/api/cast/disconnect"))
            .send()
            .context("Disconnecting cast device")?;
        expect_success(response)?;
        info!("Disconnected cast device");
        Ok(())
    }
}

fn expect_success(response: Response) -> Result<CastReply> {
    let status = response.status();
    let reply: CastReply = response.json().unwrap_or_default();
    if !status.is_success() {
        bail!(
            "Cast relay error ({status}): {}",
            reply.error.as_deref().unwrap_or("no detail")
        );
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_actions_serialize_lowercase() {
        assert_eq!(
            serde_json::json!({ "action": CastAction::Pause }),
            serde_json::json!({ "action": "pause" })
        );
        assert_eq!("stop".parse::<CastAction>().unwrap(), CastAction::Stop);
        assert!("rewind".parse::<CastAction>().is_err());
    }

    #[test]
    fn status_defaults_to_disconnected() {
        let status: CastStatus =
            serde_json::from_str(r#"{"connected":false,"error":"pychromecast not installed"}"#)
                .unwrap();
        assert!(!status.connected);
        assert_eq!(status.error.as_deref(), Some("pychromecast not installed"));
    }
}
