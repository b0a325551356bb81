//! Decoder error types
//!
//! Two tiers, matching the recovery behavior: a [`DecodeError`] kills the
//! whole parse (no further feeding is meaningful), a [`TagError`] costs
//! exactly the tag that raised it.

use flicker_bits::ReadError;
use thiserror::Error;

/// Fatal stream errors. Surfaced from `feed`; the decoder is dead
/// afterwards.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The 3-byte signature was neither the plain nor the compressed
    /// magic.
    #[error("bad signature {0:02x?}: not an SWF stream")]
    BadMagic([u8; 3]),

    /// The compressed body could not be inflated.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// The stream header could not be read even though its computed byte
    /// requirement was met.
    #[error("malformed stream header: {0}")]
    Header(#[from] ReadError),
}

/// Recoverable per-tag errors. Logged by the tag loop; parsing resumes at
/// the next tag boundary.
#[derive(Debug, Error)]
pub enum TagError {
    /// The tag payload ended before its fields did.
    #[error("truncated tag payload: {0}")]
    Truncated(#[from] ReadError),

    /// A character-defining tag reused an existing id.
    #[error("character id {0} already defined")]
    DuplicateCharacter(u16),
}
