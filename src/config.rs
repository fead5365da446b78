// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving bridge settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::bluetooth::{FramerOptions, FramingMode, InvalidUtf8Policy, PeerSelector};
use crate::error::BridgeError;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Name of the microcontroller the bridge looks for by default.
pub const DEFAULT_DEVICE_NAME: &str = "ESP32_BT";

/// Bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Record framing settings.
    pub framing: FramingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Name of the bonded peer to connect to.
    pub device_name: String,

    /// Address of the bonded peer. Takes precedence over the name.
    pub device_address: Option<String>,

    /// Service the peer exposes.
    pub service_uuid: Uuid,

    /// RFCOMM channel of the service on the peer.
    pub rfcomm_channel: u8,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            device_address: None,
            service_uuid: SPP_UUID,
            rfcomm_channel: 1,
        }
    }
}

impl BluetoothConfig {
    /// The peer filter this configuration describes.
    pub fn selector(&self) -> PeerSelector {
        match &self.device_address {
            Some(address) => PeerSelector::Address(address.clone()),
            None => PeerSelector::Name(self.device_name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// `per_read` or `delimited`.
    pub mode: FramingMode,

    /// Record delimiter for `delimited` mode. Must be a single byte.
    pub delimiter: String,

    /// Longest partial record kept in `delimited` mode.
    pub max_record_len: usize,

    /// `replace` or `skip`.
    pub invalid_utf8: InvalidUtf8Policy,

    /// Size of the buffer handed to each read.
    pub read_buffer_size: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            mode: FramingMode::PerRead,
            delimiter: "\n".to_string(),
            max_record_len: 1024,
            invalid_utf8: InvalidUtf8Policy::Replace,
            read_buffer_size: 1024,
        }
    }
}

impl FramingConfig {
    /// Build framer options, validating the delimiter.
    pub fn framer_options(&self) -> Result<FramerOptions, BridgeError> {
        let delimiter = match self.delimiter.as_bytes() {
            [byte] => *byte,
            _ => {
                return Err(BridgeError::Config(format!(
                    "delimiter must be a single byte, got {:?}",
                    self.delimiter
                )))
            }
        };

        Ok(FramerOptions {
            mode: self.mode,
            delimiter,
            max_record_len: self.max_record_len,
            invalid_utf8: self.invalid_utf8,
        })
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spp-bridge")
            .join("config.toml")
    }

    /// Load configuration from the default file or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults there if missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            info!("Wrote default configuration to {}", path.display());
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values the bridge cannot run with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.framing.read_buffer_size == 0 {
            return Err(BridgeError::Config(
                "read_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.framing.max_record_len == 0 {
            return Err(BridgeError::Config(
                "max_record_len must be greater than zero".to_string(),
            ));
        }
        self.framing.framer_options()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_device() {
        let config = Config::default();
        assert_eq!(config.bluetooth.device_name, "ESP32_BT");
        assert_eq!(
            config.bluetooth.service_uuid.to_string(),
            "00001101-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(config.framing.mode, FramingMode::PerRead);
        assert_eq!(config.framing.read_buffer_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[bluetooth]\ndevice_name = \"HC-05\"\n\n[framing]\nmode = \"delimited\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bluetooth.device_name, "HC-05");
        assert_eq!(config.bluetooth.rfcomm_channel, 1);
        assert_eq!(config.framing.mode, FramingMode::Delimited);
        assert_eq!(config.framing.invalid_utf8, InvalidUtf8Policy::Replace);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.bluetooth.device_address = Some("AA:BB:CC:DD:EE:FF".to_string());
        config.framing.invalid_utf8 = InvalidUtf8Policy::Skip;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.bluetooth.selector(),
            PeerSelector::Address("AA:BB:CC:DD:EE:FF".to_string())
        );
    }

    #[test]
    fn test_rejects_multibyte_delimiter() {
        let mut config = Config::default();
        config.framing.delimiter = "\r\n".to_string();
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let mut config = Config::default();
        config.framing.read_buffer_size = 0;
        assert!(config.validate().is_err());
    }
}
