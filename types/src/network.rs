//! Network identifier.

use serde::{Deserialize, Serialize};

/// Identifies which fedchain network a node belongs to.
///
/// The network byte is mixed into every signing payload so a signature made
/// for one network never verifies on another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Main,
    /// The public test network.
    Test,
    /// Local simulation network.
    #[default]
    Local,
}

impl NetworkId {
    /// Domain-separation byte for signing payloads.
    pub fn magic(&self) -> u8 {
        match self {
            Self::Main => 0xFA,
            Self::Test => 0x7E,
            Self::Local => 0x10,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Local => "local",
        }
    }

    /// Parse a network name, defaulting to `Local` for anything unknown.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" => Self::Main,
            "test" | "testnet" => Self::Test,
            _ => Self::Local,
        }
    }
}
