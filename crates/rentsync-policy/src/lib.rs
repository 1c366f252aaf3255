//! Single-writer policy for booking and inventory state.
//!
//! For every brand the operator configures an [`OperationMode`]. The mode
//! alone decides which [`WriterRole`] may mutate bookings:
//!
//! | mode         | designated writer |
//! |--------------|-------------------|
//! | `standalone` | `adapter`         |
//! | `integrated` | `hub`             |
//!
//! Both services link this crate and must agree on the table above. Each
//! binary reports [`POLICY_VERSION`] at startup so a rollout that mixes
//! versions is visible in logs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version of the writer policy contract.
///
/// Bump whenever the mode → writer table changes.
pub const POLICY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-brand operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// The brand adapter owns bookings and talks to the channel manager.
    Standalone,
    /// The central hub owns bookings.
    Integrated,
}

/// Service role that may be authorized to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterRole {
    Adapter,
    Hub,
}

impl OperationMode {
    /// All modes, for exhaustive checks.
    pub const ALL: [OperationMode; 2] = [OperationMode::Standalone, OperationMode::Integrated];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Standalone => "standalone",
            OperationMode::Integrated => "integrated",
        }
    }
}

impl WriterRole {
    /// All roles, for exhaustive checks.
    pub const ALL: [WriterRole; 2] = [WriterRole::Adapter, WriterRole::Hub];

    pub fn as_str(&self) -> &'static str {
        match self {
            WriterRole::Adapter => "adapter",
            WriterRole::Hub => "hub",
        }
    }
}

/// The role allowed to write under `mode`.
pub const fn designated_writer(mode: OperationMode) -> WriterRole {
    match mode {
        OperationMode::Standalone => WriterRole::Adapter,
        OperationMode::Integrated => WriterRole::Hub,
    }
}

/// Whether `role` may write under `mode`.
pub fn is_writer_allowed(mode: OperationMode, role: WriterRole) -> bool {
    designated_writer(mode) == role
}

/// Error parsing a mode or role from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown operation mode: {0}")]
    UnknownMode(String),

    #[error("unknown writer role: {0}")]
    UnknownRole(String),
}

impl FromStr for OperationMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(OperationMode::Standalone),
            "integrated" => Ok(OperationMode::Integrated),
            other => Err(ParseError::UnknownMode(other.to_string())),
        }
    }
}

impl FromStr for WriterRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adapter" => Ok(WriterRole::Adapter),
            "hub" => Ok(WriterRole::Hub),
            other => Err(ParseError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WriterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
