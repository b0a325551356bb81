//! # Flicker AVM
//!
//! Stack-machine bytecode interpreter for the ActionScript 1/2 era action
//! blocks embedded in SWF-style containers.
//!
//! The machine is dynamically typed: every operand is a [`Value`] and the
//! per-opcode coercion rules in [`coerce`] are observable behavior, version
//! gates included. Execution state lives in explicit [`CallFrame`]s driven
//! by the [`Interpreter`]; nothing is ambient — scripts act on the world
//! only through an [`ExecutionContext`] and the [`Host`] trait.
//!
//! Failure philosophy: bytecode-level problems (unknown opcodes, bad jump
//! targets, out-of-range constants) abort only the script that contains
//! them; the surrounding container parse and any sibling scripts are never
//! affected.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod coerce;
pub mod context;
pub mod error;
pub mod frame;
pub mod interp;
pub mod object;
pub mod opcode;
pub mod script;
pub mod value;

pub use context::{ExecutionContext, Host, NullHost};
pub use error::{ScriptError, ScriptResult};
pub use frame::{CallFrame, Registers};
pub use interp::Interpreter;
pub use object::{Callable, NativeFn, ObjectHeap, ObjectId, ScriptObject};
pub use script::{ConstantPool, Param, PreloadFlags, Script};
pub use value::Value;
