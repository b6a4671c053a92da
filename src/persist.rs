//! Versioned binary envelope for programs and snapshots.
//!
//! Layout: 4-byte magic, format version, artifact kind, then a bincode
//! payload. The kind byte keeps a snapshot from being loaded where a
//! program is expected (and vice versa); the version byte lets future
//! format revisions be rejected cleanly instead of misread.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::FormatError;

const MAGIC: &[u8; 4] = b"CDNC";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArtifactKind {
    Program,
    Snapshot,
    FutureSnapshot,
}

impl ArtifactKind {
    fn byte(self) -> u8 {
        match self {
            ArtifactKind::Program => 0,
            ArtifactKind::Snapshot => 1,
            ArtifactKind::FutureSnapshot => 2,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ArtifactKind::Program),
            1 => Some(ArtifactKind::Snapshot),
            2 => Some(ArtifactKind::FutureSnapshot),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ArtifactKind::Program => "program",
            ArtifactKind::Snapshot => "snapshot",
            ArtifactKind::FutureSnapshot => "future snapshot",
        }
    }
}

pub(crate) fn encode<T: Serialize>(kind: ArtifactKind, value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(kind.byte());
    // bincode handles every shape serde can derive; failure here would
    // mean the in-memory state itself is broken.
    let payload = bincode::serialize(value).expect("engine state is always encodable");
    out.extend_from_slice(&payload);
    out
}

pub(crate) fn decode<T: DeserializeOwned>(
    expected: ArtifactKind,
    bytes: &[u8],
) -> Result<T, FormatError> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(FormatError::Header);
    }
    if bytes[4] != VERSION {
        return Err(FormatError::Version(bytes[4]));
    }
    let found = ArtifactKind::from_byte(bytes[5]).ok_or(FormatError::Header)?;
    if found != expected {
        return Err(FormatError::Kind {
            expected: expected.name(),
            found: found.name(),
        });
    }
    bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|err| FormatError::Corrupt(err.to_string()))
}
