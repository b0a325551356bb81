//! Execution context and host interface
//!
//! All mutable VM state is threaded explicitly: nothing in this crate is a
//! global. The context owns the object heap, the global object, the shared
//! legacy register file and the version flag that gates coercions; the
//! world outside the VM (stage, timeline, trace channel, clock) is reached
//! only through the [`Host`] trait.

use std::rc::Rc;

use tracing::debug;

use crate::frame::LEGACY_REGISTER_COUNT;
use crate::object::{Callable, NativeFn, ObjectHeap, ObjectId, ScriptObject};
use crate::value::Value;

/// Default ceiling on executed instructions per top-level run.
///
/// Execution is cooperative and non-preemptive; the budget is the only
/// thing standing between a hostile jump loop and a hung host.
pub const DEFAULT_INSTRUCTION_BUDGET: u64 = 10_000_000;

/// Maximum function call nesting.
pub const MAX_CALL_DEPTH: u32 = 256;

/// The collaborators the VM acts on: stage, timeline, trace channel and
/// clock. Implemented by the player; a [`NullHost`] is provided for tests
/// and headless use.
pub trait Host {
    /// Receive one line of trace output.
    fn trace(&mut self, message: &str) {
        let _ = message;
    }

    /// Stage size in pixels.
    fn stage_size(&self) -> (u32, u32) {
        (0, 0)
    }

    /// Pointer position in pixels.
    fn mouse_position(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    /// Total frames of the root timeline.
    fn frame_count(&self) -> u16 {
        1
    }

    /// Frames of the root timeline decoded so far.
    fn frames_loaded(&self) -> u16 {
        self.frame_count()
    }

    /// Current frame index (zero-based).
    fn current_frame(&self) -> u16 {
        0
    }

    /// Seek the root timeline to a zero-based frame index.
    fn goto_frame(&mut self, frame: u16) {
        let _ = frame;
    }

    /// Seek the root timeline to a labeled frame. Returns whether the
    /// label exists.
    fn goto_label(&mut self, label: &str) -> bool {
        let _ = label;
        false
    }

    /// Step the root timeline forward or backward.
    fn advance_frames(&mut self, delta: i32) {
        let _ = delta;
    }

    /// Pause or resume timeline playback.
    fn set_playing(&mut self, playing: bool) {
        let _ = playing;
    }

    /// Stop all playing sounds.
    fn stop_sounds(&mut self) {}

    /// Navigate to a URL in a named target.
    fn get_url(&mut self, url: &str, target: &str) {
        let _ = (url, target);
    }

    /// Milliseconds since playback started.
    fn elapsed_millis(&self) -> u32 {
        0
    }
}

/// A host that swallows everything. Useful for tests and tools that only
/// care about computation.
#[derive(Debug, Default)]
pub struct NullHost;

impl Host for NullHost {}

/// The explicit execution context threaded through the interpreter.
pub struct ExecutionContext {
    heap: ObjectHeap,
    global: ObjectId,
    root: Value,
    version: u8,
    legacy_registers: [Value; LEGACY_REGISTER_COUNT],
    rng_state: u64,
    /// Remaining instruction budget for the current top-level run.
    pub(crate) budget: u64,
    /// Configured budget, restored at each top-level entry.
    pub(crate) budget_limit: u64,
    /// Current function call nesting.
    pub(crate) call_depth: u32,
}

impl ExecutionContext {
    /// Create a context for content of the given player version.
    pub fn new(version: u8) -> Self {
        let mut heap = ObjectHeap::new();
        let global = heap.alloc(ScriptObject::new());
        let mut rng_seed = [0u8; 8];
        if getrandom::getrandom(&mut rng_seed).is_err() {
            rng_seed = 0x5DEECE66Du64.to_le_bytes();
        }
        let mut cx = Self {
            heap,
            global,
            root: Value::Undefined,
            version,
            legacy_registers: Default::default(),
            rng_state: u64::from_le_bytes(rng_seed) | 1,
            budget: DEFAULT_INSTRUCTION_BUDGET,
            budget_limit: DEFAULT_INSTRUCTION_BUDGET,
            call_depth: 0,
        };
        cx.install_builtins();
        cx
    }

    /// Player version gating coercions and opcode availability.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The object heap.
    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// The object heap, mutably.
    pub fn heap_mut(&mut self) -> &mut ObjectHeap {
        &mut self.heap
    }

    /// Handle of the global object.
    pub fn global(&self) -> ObjectId {
        self.global
    }

    /// The value `this` resolves to at top level (the root clip).
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Install the root-clip value used for top-level `this`.
    pub fn set_root(&mut self, root: Value) {
        self.root = root;
    }

    /// Cap the number of instructions a top-level run may execute.
    pub fn set_instruction_budget(&mut self, budget: u64) {
        self.budget_limit = budget;
        self.budget = budget;
    }

    /// Allocate a fresh plain object.
    pub fn alloc_object(&mut self) -> ObjectId {
        self.heap.alloc(ScriptObject::new())
    }

    /// Allocate a native function object.
    pub fn alloc_native(&mut self, f: NativeFn) -> ObjectId {
        self.heap.alloc(ScriptObject::function(Callable::Native(f)))
    }

    /// Read a property of the global object.
    pub fn get_global_property(&self, name: &str) -> Option<Value> {
        self.heap.get(self.global)?.get(name).cloned()
    }

    /// Write a property of the global object.
    pub fn set_global_property(&mut self, name: impl Into<Rc<str>>, value: Value) {
        if let Some(global) = self.heap.get_mut(self.global) {
            global.set(name, value);
        }
    }

    /// Read a shared legacy register. Out-of-range indices read as
    /// undefined.
    pub fn legacy_register(&self, index: usize) -> Value {
        self.legacy_registers
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Write a shared legacy register. Out-of-range writes are dropped.
    pub fn set_legacy_register(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.legacy_registers.get_mut(index) {
            *slot = value;
        } else {
            debug!(index, "legacy register write out of range, ignored");
        }
    }

    /// Random integer in `[0, bound)`; zero when `bound` is not above one.
    pub fn random_below(&mut self, bound: f64) -> f64 {
        if bound.is_nan() || bound < 1.0 {
            return 0.0;
        }
        // xorshift64*, seeded from the OS at context creation.
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let r = (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11) as f64 / (1u64 << 53) as f64;
        (r * bound.trunc()).floor()
    }

    /// Coerce a value to an object per the boxing rules: undefined and
    /// null have no object form; numbers, booleans and strings box; object
    /// handles pass through.
    pub fn to_object(&mut self, value: &Value) -> Option<ObjectId> {
        match value {
            Value::Undefined | Value::Null => None,
            Value::Object(id) => Some(*id),
            primitive => Some(self.heap.alloc(ScriptObject::boxed(primitive.clone()))),
        }
    }

    /// Built-in constructors available to new-object.
    fn install_builtins(&mut self) {
        let object_ctor: NativeFn = Rc::new(|cx, _host, this, _args| {
            // `new Object()` has its fresh instance as `this`; a bare call
            // makes a new object.
            Ok(match this {
                Value::Object(_) => this,
                _ => Value::Object(cx.alloc_object()),
            })
        });
        let id = self.alloc_native(object_ctor);
        let prototype = self.alloc_object();
        if let Some(obj) = self.heap.get_mut(id) {
            obj.set("prototype", Value::Object(prototype));
        }
        self.set_global_property("Object", Value::Object(id));
    }
}
