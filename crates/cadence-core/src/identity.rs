//! Participant and asset identities.
//!
//! Everything that can hold or move tokens — payers, payees, gateways, the
//! registry owner, token contracts — is addressed by a 20-byte [`Address`],
//! written as a `0x`-prefixed lowercase hex string.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// A 20-byte account or asset identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
  /// The all-zeroes address. Rejected wherever a real participant or asset
  /// is required.
  pub const ZERO: Address = Address([0; 20]);

  pub const fn new(bytes: [u8; 20]) -> Self { Self(bytes) }

  pub fn as_bytes(&self) -> &[u8; 20] { &self.0 }

  pub fn is_zero(&self) -> bool { *self == Self::ZERO }

  /// Build an address from a small integer, big-endian in the low bytes.
  /// Handy for tests and sandbox fixtures.
  pub fn from_low_u64(value: u64) -> Self {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&value.to_be_bytes());
    Self(bytes)
  }
}

// ─── Parsing and formatting ──────────────────────────────────────────────────

/// Failure to parse an [`Address`] from its hex string form.
#[derive(Debug, Error)]
pub enum AddressParseError {
  #[error("address must start with 0x")]
  MissingPrefix,

  #[error("address must be 40 hex characters, got {0}")]
  BadLength(usize),

  #[error("invalid hex: {0}")]
  InvalidHex(#[from] hex::FromHexError),
}

impl FromStr for Address {
  type Err = AddressParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let body = s
      .strip_prefix("0x")
      .ok_or(AddressParseError::MissingPrefix)?;
    if body.len() != 40 {
      return Err(AddressParseError::BadLength(body.len()));
    }
    let raw = hex::decode(body)?;
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&raw);
    Ok(Self(bytes))
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl fmt::Debug for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

// ─── Serde ───────────────────────────────────────────────────────────────────

impl Serialize for Address {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Address {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}
