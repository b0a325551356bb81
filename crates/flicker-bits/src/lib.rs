//! # Flicker Bits
//!
//! Byte buffers and bit-level readers for the Flicker SWF interpreter.
//!
//! The container format is bit-packed: records describe their own field
//! widths and byte alignment only matters at tag boundaries. Everything in
//! this crate is built on two pieces:
//!
//! - [`Buffer`]: an immutable, reference-counted byte range with zero-copy
//!   sub-views. Nothing is ever mutated in place, so views are safe to hand
//!   across the decoder and the VM without copying.
//! - [`BitReader`]: a bit-granular cursor over a [`Buffer`]. Every read on
//!   an exhausted cursor is an error, never a silent zero.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod queue;
pub mod reader;

pub use buffer::{Buffer, BufferId};
pub use error::ReadError;
pub use queue::BufferQueue;
pub use reader::BitReader;

/// Result type for reader operations.
pub type ReadResult<T> = std::result::Result<T, ReadError>;
