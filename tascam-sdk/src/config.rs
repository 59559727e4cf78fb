//! Deck configuration
//!
//! `DeckConfig` bundles everything needed to open a [`TascamDeck`](crate::TascamDeck):
//! the serial port, its speed and the link timing. It deserializes from JSON
//! so applications can keep it in a settings file.

use serde::{Deserialize, Serialize};
use tascam_link::{BaudRate, LinkConfig};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Serial port path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: Option<String>,

    /// Default: 9600
    pub baud_rate: BaudRate,

    pub link: LinkConfig,

    /// Connect while building the deck when a port is set
    /// Default: true
    pub auto_connect: bool,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: BaudRate::default(),
            link: LinkConfig::default(),
            auto_connect: true,
        }
    }
}

impl DeckConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            ..Default::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.link.validate()?;
        Ok(config)
    }

    pub fn with_baud_rate(mut self, baud_rate: BaudRate) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }
}
