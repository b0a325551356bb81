//! # Flicker SWF
//!
//! Streaming parser for the tag-structured SWF binary container.
//!
//! The heart of the crate is [`SwfDecoder`], a resumable state machine fed
//! by opaque byte buffers: each call consumes as much as is currently
//! available and reports [`Status::NeedData`] when a record is incomplete,
//! leaving the input untouched so the next call re-peeks from the same
//! position. Decoded characters, the root timeline and embedded scripts
//! accumulate on the decoder; rendering and playback live elsewhere.
//!
//! Parsing is deliberately tolerant: unknown tags, size mismatches and
//! malformed payloads cost one tag each, never the document.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod character;
pub mod decode;
pub mod decoder;
pub mod error;
pub mod sprite;
pub mod tag;
pub mod types;

pub use character::Character;
pub use decoder::{Status, SwfDecoder};
pub use error::{DecodeError, TagError};
pub use sprite::{Frame, FrameAction, Placement, Sprite};
pub use tag::TagCode;
pub use types::{Color, ColorTransform, Gradient, GradientEntry, Matrix, Rect, TWIPS_PER_PIXEL};
