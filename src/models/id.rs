//! Document identifiers shared by art records and image metadata.
//!
//! Identifiers are 128-bit random values rendered as **32 lowercase
//! hexadecimal characters** (no hyphens), the same text `Uuid::simple()`
//! produces. Externally supplied ids must pass [`DocumentId::parse`] before
//! they are used in any query.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

/// Length of the textual form of a [`DocumentId`].
pub const DOCUMENT_ID_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a valid document id")]
pub struct InvalidIdentifier(pub String);

/// A validated document identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Allocate a fresh identifier for a new document.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validate a client-supplied identifier.
    ///
    /// Accepts exactly 32 hex digits in either case; the parsed id always
    /// renders in lowercase. Hyphenated, braced, or URN forms are rejected.
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        if raw.len() != DOCUMENT_ID_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidIdentifier(raw.to_string()));
        }
        Uuid::try_parse(raw)
            .map(Self)
            .map_err(|_| InvalidIdentifier(raw.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for DocumentId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
