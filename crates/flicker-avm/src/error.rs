//! Script execution errors
//!
//! All of these are recoverable from the host's point of view: they abort
//! the script that raised them and nothing else.

use flicker_bits::ReadError;
use thiserror::Error;

/// Errors that abort execution of a single script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// An opcode byte with no registered handler.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// An operand block was truncated or otherwise malformed.
    #[error("malformed operands: {0}")]
    MalformedOperands(#[from] ReadError),

    /// An operand block length field ran past the end of the script.
    #[error("operand block of {len} byte(s) exceeds script bounds")]
    OperandBlockOutOfBounds {
        /// Declared operand block length.
        len: usize,
    },

    /// A push-constant record indexed outside the active constant pool.
    #[error("constant index {index} outside pool of {len} string(s)")]
    ConstantOutOfRange {
        /// The requested index.
        index: usize,
        /// Size of the active pool (0 when none is active).
        len: usize,
    },

    /// A push record with an undefined type code.
    #[error("illegal push record type {0}")]
    IllegalPushType(u8),

    /// A movie property index outside the defined 0..=21 range.
    #[error("property index {0} out of range")]
    PropertyIndexOutOfRange(i32),

    /// The function call stack grew past the recursion limit.
    #[error("call depth limit exceeded")]
    CallDepthExceeded,

    /// The configured instruction budget was exhausted.
    #[error("instruction budget exhausted")]
    InstructionBudgetExhausted,
}

/// Result type for script execution.
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;
