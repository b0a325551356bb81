//! The bytecode interpreter
//!
//! A fetch-decode-execute loop over raw action bytes. Opcodes at or above
//! 0x80 carry a little-endian u16 length plus that many operand bytes;
//! handlers read their operands through a [`BitReader`] scoped to exactly
//! that block, so a malformed encoding surfaces as a read error that
//! aborts the script — never the host.
//!
//! Stack discipline is part of the contract: every invocation opcode
//! consumes its full operand tuple and pushes exactly one result, even
//! when the callee cannot be resolved.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};

use flicker_bits::{BitReader, Buffer, ReadError};

use crate::coerce;
use crate::context::{ExecutionContext, Host, MAX_CALL_DEPTH};
use crate::error::{ScriptError, ScriptResult};
use crate::frame::CallFrame;
use crate::object::{Callable, ObjectId, ScriptObject};
use crate::opcode::Opcode;
use crate::script::{ConstantPool, Param, PreloadFlags, Script};
use crate::value::Value;

/// Longest `__proto__` chain followed before giving up.
const MAX_PROTO_DEPTH: u32 = 64;

type Args = SmallVec<[Value; 8]>;

/// The stack-machine execution engine.
///
/// Borrows the execution context and the host for the duration of a run;
/// there is no hidden state beyond the two.
pub struct Interpreter<'a> {
    cx: &'a mut ExecutionContext,
    host: &'a mut dyn Host,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter over `cx` acting on `host`.
    pub fn new(cx: &'a mut ExecutionContext, host: &'a mut dyn Host) -> Self {
        Self { cx, host }
    }

    /// The execution context.
    pub fn context(&mut self) -> &mut ExecutionContext {
        self.cx
    }

    /// Execute a top-level script, returning its result value.
    ///
    /// Restores the instruction budget; `this` is the context's root
    /// value. Errors abort this script only — the context stays usable.
    pub fn execute(&mut self, script: Rc<Script>) -> ScriptResult<Value> {
        let this = self.cx.root().clone();
        let mut frame = CallFrame::new(script, this);
        self.run(&mut frame)?;
        Ok(frame.return_value)
    }

    /// Drive an existing frame to completion, restoring the instruction
    /// budget first. Exposed for harnesses that inspect frame state after
    /// the run.
    pub fn run(&mut self, frame: &mut CallFrame) -> ScriptResult<()> {
        self.cx.budget = self.cx.budget_limit;
        self.run_frame(frame)
    }

    /// Call `callee` as a function. A non-callable callee quietly yields
    /// undefined; the net effect is always exactly one result value.
    pub fn call_value(&mut self, callee: &Value, this: Value, args: &[Value]) -> ScriptResult<Value> {
        let Some(id) = callee.as_object() else {
            debug!("call of a non-object value");
            return Ok(Value::Undefined);
        };
        let Some(callable) = self.cx.heap().get(id).and_then(|o| o.callable.clone()) else {
            debug!("call of a non-function object");
            return Ok(Value::Undefined);
        };
        match callable {
            Callable::Native(f) => f(self.cx, self.host, this, args),
            Callable::Script(script) => self.invoke_script(script, this, args),
        }
    }

    // ==================== Run loop ====================

    fn run_frame(&mut self, frame: &mut CallFrame) -> ScriptResult<()> {
        let code = frame.script.code.clone();
        let len = code.len();
        while !frame.done && frame.pc < len {
            let bytes = code.as_slice();
            let op_byte = bytes[frame.pc];
            let (operands, next_pc) = if Opcode::has_operands(op_byte) {
                if frame.pc + 3 > len {
                    return Err(ReadError::eof(frame.pc + 3 - len).into());
                }
                let block_len =
                    u16::from_le_bytes([bytes[frame.pc + 1], bytes[frame.pc + 2]]) as usize;
                let start = frame.pc + 3;
                let block = code
                    .subbuffer(start, block_len)
                    .ok_or(ScriptError::OperandBlockOutOfBounds { len: block_len })?;
                (block, start + block_len)
            } else {
                (Buffer::empty(), frame.pc + 1)
            };
            frame.pc = next_pc;

            if frame.skip_actions > 0 {
                frame.skip_actions -= 1;
                continue;
            }
            if self.cx.budget == 0 {
                return Err(ScriptError::InstructionBudgetExhausted);
            }
            self.cx.budget -= 1;

            let mut r = BitReader::new(operands);
            self.dispatch(op_byte, frame, &mut r)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, op_byte: u8, frame: &mut CallFrame, r: &mut BitReader) -> ScriptResult<()> {
        let op = Opcode::from_byte(op_byte).ok_or(ScriptError::UnknownOpcode(op_byte))?;
        trace!(op = op.name(), pc = frame.pc, "execute");
        match op {
            Opcode::End => frame.done = true,

            // ==================== Timeline control ====================
            Opcode::NextFrame => self.host.advance_frames(1),
            Opcode::PreviousFrame => self.host.advance_frames(-1),
            Opcode::Play => self.host.set_playing(true),
            Opcode::Stop => self.host.set_playing(false),
            Opcode::ToggleQuality => {}
            Opcode::StopSounds => self.host.stop_sounds(),
            Opcode::GotoFrame => {
                let target = r.u16()?;
                self.host.goto_frame(target);
            }
            Opcode::GotoLabel => {
                let label = r.string()?;
                if !self.host.goto_label(&label) {
                    warn!(label, "goto unknown frame label");
                }
            }
            Opcode::GotoFrame2 => {
                r.bits(6)?;
                let scene_bias = r.bit()?;
                let play = r.bit()?;
                if scene_bias {
                    r.u16()?;
                }
                let target = frame.pop();
                match &target {
                    Value::String(label) if coerce::string_to_number(label).is_nan() => {
                        if !self.host.goto_label(label) {
                            warn!(label = label.as_ref(), "goto unknown frame label");
                        }
                    }
                    _ => {
                        let n = self.to_number(&target)?;
                        if n.is_finite() && n >= 1.0 {
                            // Stack-supplied frame numbers are one-based.
                            self.host.goto_frame((n - 1.0) as u16);
                        }
                    }
                }
                self.host.set_playing(play);
            }
            Opcode::WaitForFrame => {
                let target = r.u16()?;
                let skip = r.u8()?;
                if target >= self.host.frames_loaded() {
                    frame.skip_actions = skip as u32;
                }
            }
            Opcode::WaitForFrame2 => {
                let skip = r.u8()?;
                let target = frame.pop();
                let n = self.to_number(&target)?;
                if !n.is_finite() || n as u16 >= self.host.frames_loaded() {
                    frame.skip_actions = skip as u32;
                }
            }
            Opcode::Call => {
                frame.pop();
                error!("frame call action not supported");
            }

            // ==================== URL / targets ====================
            Opcode::GetUrl => {
                let url = r.string()?;
                let target = r.string()?;
                self.host.get_url(&url, &target);
            }
            Opcode::GetUrl2 => {
                r.bits(2)?; // send-vars method
                r.bits(4)?;
                r.bit()?; // load target
                r.bit()?; // load vars
                let target = frame.pop();
                let url = frame.pop();
                let target = self.to_string(&target)?;
                let url = self.to_string(&url)?;
                self.host.get_url(&url, &target);
            }
            Opcode::SetTarget => {
                let target = r.string()?;
                if !target.is_empty() {
                    warn!(target, "set-target not supported");
                }
            }
            Opcode::SetTarget2 => {
                frame.pop();
                warn!("set-target not supported");
            }

            // ==================== Stack ====================
            Opcode::Push => self.op_push(frame, r)?,
            Opcode::Pop => {
                frame.pop();
            }
            Opcode::PushDuplicate => {
                let v = frame.pop();
                frame.push(v.clone());
                frame.push(v);
            }
            Opcode::Swap => {
                let a = frame.pop();
                let b = frame.pop();
                frame.push(a);
                frame.push(b);
            }
            Opcode::StoreRegister => {
                let reg = r.u8()? as usize;
                let v = frame.pop();
                frame.push(v.clone());
                self.write_register(frame, reg, v);
            }

            // ==================== Arithmetic / logic ====================
            Opcode::Add
            | Opcode::Subtract
            | Opcode::Multiply
            | Opcode::Divide
            | Opcode::Equals
            | Opcode::Less
            | Opcode::And
            | Opcode::Or
            | Opcode::Modulo => self.op_binary_numeric(op, frame)?,
            Opcode::BitAnd
            | Opcode::BitOr
            | Opcode::BitXor
            | Opcode::BitLShift
            | Opcode::BitRShift
            | Opcode::BitURShift => self.op_binary_bitwise(op, frame)?,
            Opcode::Not => {
                let a = frame.pop();
                let b = coerce::to_boolean(&a, self.cx.version());
                frame.push(Value::Bool(!b));
            }
            Opcode::Increment => {
                let a = frame.pop();
                let n = self.to_number(&a)?;
                frame.push(Value::Number(n + 1.0));
            }
            Opcode::Decrement => {
                let a = frame.pop();
                let n = self.to_number(&a)?;
                frame.push(Value::Number(n - 1.0));
            }
            Opcode::ToInteger => {
                let a = frame.pop();
                let n = self.to_number(&a)?;
                frame.push(Value::Number(if n.is_nan() { 0.0 } else { coerce::truncate(n) }));
            }
            Opcode::ToNumber => {
                let a = frame.pop();
                let n = self.to_number(&a)?;
                frame.push(Value::Number(n));
            }
            Opcode::ToString => {
                let a = frame.pop();
                let s = self.to_string(&a)?;
                frame.push(Value::String(s));
            }
            Opcode::TypeOf => {
                let a = frame.pop();
                let name = match &a {
                    Value::Undefined => "undefined",
                    Value::Null => "null",
                    Value::Bool(_) => "boolean",
                    Value::Number(_) => "number",
                    Value::String(_) => "string",
                    Value::Object(id) => {
                        if self
                            .cx
                            .heap()
                            .get(*id)
                            .is_some_and(|o| o.callable.is_some())
                        {
                            "function"
                        } else {
                            "object"
                        }
                    }
                };
                frame.push(Value::string(name));
            }

            // ==================== Comparison ====================
            Opcode::Add2 => {
                let a = frame.pop();
                let b = frame.pop();
                let pa = self.to_primitive(a)?;
                let pb = self.to_primitive(b)?;
                if pa.is_string() || pb.is_string() {
                    let sb = self.to_string(&pb)?;
                    let sa = self.to_string(&pa)?;
                    frame.push(Value::string(format!("{sb}{sa}")));
                } else {
                    let nb = self.to_number(&pb)?;
                    let na = self.to_number(&pa)?;
                    frame.push(Value::Number(nb + na));
                }
            }
            Opcode::Less2 | Opcode::Greater => {
                let a = frame.pop();
                let b = frame.pop();
                let pa = self.to_primitive(a)?;
                let pb = self.to_primitive(b)?;
                let result = if let (Value::String(sa), Value::String(sb)) = (&pa, &pb) {
                    if op == Opcode::Less2 {
                        sb.as_ref() < sa.as_ref()
                    } else {
                        sb.as_ref() > sa.as_ref()
                    }
                } else {
                    let na = self.to_number(&pa)?;
                    let nb = self.to_number(&pb)?;
                    if op == Opcode::Less2 { nb < na } else { nb > na }
                };
                frame.push(Value::Bool(result));
            }
            Opcode::Equals2 => {
                let a = frame.pop();
                let b = frame.pop();
                let eq = self.abstract_equals(&b, &a)?;
                frame.push(Value::Bool(eq));
            }
            Opcode::StrictEquals => {
                let a = frame.pop();
                let b = frame.pop();
                frame.push(Value::Bool(strict_equals(&b, &a)));
            }
            Opcode::InstanceOf => {
                let ctor = frame.pop();
                let object = frame.pop();
                let result = self.instance_of(&object, &ctor);
                frame.push(Value::Bool(result));
            }

            // ==================== Strings ====================
            Opcode::StringEquals => {
                let a = frame.pop();
                let b = frame.pop();
                let sa = self.to_string(&a)?;
                let sb = self.to_string(&b)?;
                frame.push(Value::Bool(sa == sb));
            }
            Opcode::StringLess => {
                let a = frame.pop();
                let b = frame.pop();
                let sa = self.to_string(&a)?;
                let sb = self.to_string(&b)?;
                frame.push(Value::Bool(sb.as_ref() < sa.as_ref()));
            }
            Opcode::StringGreater => {
                let a = frame.pop();
                let b = frame.pop();
                let sa = self.to_string(&a)?;
                let sb = self.to_string(&b)?;
                frame.push(Value::Bool(sb.as_ref() > sa.as_ref()));
            }
            Opcode::StringAdd => {
                let a = frame.pop();
                let b = frame.pop();
                let sa = self.to_string(&a)?;
                let sb = self.to_string(&b)?;
                frame.push(Value::string(format!("{sb}{sa}")));
            }
            Opcode::StringLength => {
                let a = frame.pop();
                let s = self.to_string(&a)?;
                frame.push(Value::Number(s.len() as f64));
            }
            Opcode::MbStringLength => {
                let a = frame.pop();
                let s = self.to_string(&a)?;
                frame.push(Value::Number(s.chars().count() as f64));
            }
            Opcode::StringExtract => {
                let a = frame.pop();
                let b = frame.pop();
                let c = frame.pop();
                let count = self.to_int32_of(&a)?;
                let index = self.to_int32_of(&b)?;
                let s = self.to_string(&c)?;
                let bytes = s.as_bytes();
                let (index, count) = clamp_extract(index, count, bytes.len());
                let out = String::from_utf8_lossy(&bytes[index..index + count]).into_owned();
                frame.push(Value::string(out));
            }
            Opcode::MbStringExtract => {
                let a = frame.pop();
                let b = frame.pop();
                let c = frame.pop();
                let count = self.to_int32_of(&a)?;
                let index = self.to_int32_of(&b)?;
                let s = self.to_string(&c)?;
                let n = s.chars().count();
                let (index, count) = clamp_extract(index, count, n);
                let out: String = s.chars().skip(index).take(count).collect();
                frame.push(Value::string(out));
            }
            Opcode::CharToAscii => {
                let a = frame.pop();
                let s = self.to_string(&a)?;
                let code = s.as_bytes().first().copied().unwrap_or(0);
                frame.push(Value::Number(code as f64));
            }
            Opcode::AsciiToChar => {
                let a = frame.pop();
                let code = (self.to_int32_of(&a)? & 0xff) as u8;
                frame.push(Value::string(char::from(code).to_string()));
            }
            Opcode::MbCharToAscii => {
                let a = frame.pop();
                let s = self.to_string(&a)?;
                let code = s.chars().next().map_or(0, |c| c as u32);
                frame.push(Value::Number(code as f64));
            }
            Opcode::MbAsciiToChar => {
                let a = frame.pop();
                let code = coerce::to_uint32(self.to_number(&a)?);
                let out = char::from_u32(code).map_or_else(String::new, |c| c.to_string());
                frame.push(Value::string(out));
            }

            // ==================== Control flow ====================
            Opcode::Jump => {
                let offset = r.s16()?;
                self.branch(frame, offset);
            }
            Opcode::If => {
                let offset = r.s16()?;
                let a = frame.pop();
                if coerce::to_boolean(&a, self.cx.version()) {
                    self.branch(frame, offset);
                }
            }
            Opcode::Return => {
                frame.return_value = frame.pop();
                frame.done = true;
            }

            // ==================== Variables / properties ====================
            Opcode::GetVariable => {
                let a = frame.pop();
                let name = self.to_string(&a)?;
                let value = self.get_variable(frame, &name);
                frame.push(value);
            }
            Opcode::SetVariable => {
                let value = frame.pop();
                let name = frame.pop();
                let name = self.to_string(&name)?;
                self.cx.set_global_property(name, value);
            }
            Opcode::DefineLocal => {
                // No activation objects: locals live on the global object.
                let value = frame.pop();
                let name = frame.pop();
                let name = self.to_string(&name)?;
                self.cx.set_global_property(name, value);
            }
            Opcode::DefineLocal2 => {
                let name = frame.pop();
                let name = self.to_string(&name)?;
                if self.cx.get_global_property(&name).is_none() {
                    self.cx.set_global_property(name, Value::Undefined);
                }
            }
            Opcode::Delete2 => {
                let name = frame.pop();
                let name = self.to_string(&name)?;
                let global = self.cx.global();
                let removed = self
                    .cx
                    .heap_mut()
                    .get_mut(global)
                    .is_some_and(|g| g.remove(&name));
                frame.push(Value::Bool(removed));
            }
            Opcode::GetMember => {
                let name = frame.pop();
                let object = frame.pop();
                let name = self.to_string(&name)?;
                let value = match object.as_object() {
                    Some(id) => self.get_property_chained(id, &name),
                    None => {
                        debug!(name = name.as_ref(), "get member on a non-object");
                        Value::Undefined
                    }
                };
                frame.push(value);
            }
            Opcode::SetMember => {
                let value = frame.pop();
                let name = frame.pop();
                let object = frame.pop();
                let name = self.to_string(&name)?;
                match object.as_object().and_then(|id| self.cx.heap_mut().get_mut(id)) {
                    Some(obj) => obj.set(name, value),
                    None => debug!(name = name.as_ref(), "set member on a non-object"),
                }
            }
            Opcode::GetProperty => {
                let a = frame.pop();
                let _target = frame.pop();
                let index = self.to_int32_of(&a)?;
                let value = self.movie_property(index)?;
                frame.push(value);
            }
            Opcode::SetProperty => {
                let _value = frame.pop();
                let b = frame.pop();
                let _target = frame.pop();
                let index = self.to_int32_of(&b)?;
                if !(0..=21).contains(&index) {
                    return Err(ScriptError::PropertyIndexOutOfRange(index));
                }
                warn!(index, "set movie property not supported");
            }

            // ==================== Objects ====================
            Opcode::InitObject => {
                let n = frame.pop();
                let n = self.to_int32_of(&n)?.max(0) as usize;
                let n = n.min(frame.stack.len() / 2);
                let id = self.cx.alloc_object();
                for _ in 0..n {
                    let value = frame.pop();
                    let name = frame.pop();
                    let name = self.to_string(&name)?;
                    if let Some(obj) = self.cx.heap_mut().get_mut(id) {
                        obj.set(name, value);
                    }
                }
                frame.push(Value::Object(id));
            }
            Opcode::InitArray => {
                let n = frame.pop();
                let n = self.to_int32_of(&n)?.max(0) as usize;
                let n = n.min(frame.stack.len());
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(frame.pop());
                }
                let id = self.make_array(items);
                frame.push(Value::Object(id));
            }
            Opcode::Enumerate2 => {
                let a = frame.pop();
                frame.push(Value::Null);
                if let Some(id) = a.as_object() {
                    let names: Vec<Rc<str>> = self
                        .cx
                        .heap()
                        .get(id)
                        .map(|obj| {
                            obj.keys()
                                .filter(|k| !is_hidden_property(k))
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default();
                    for name in names {
                        frame.push(Value::String(name));
                    }
                }
            }
            Opcode::Extends => {
                let superclass = frame.pop();
                let subclass = frame.pop();
                self.op_extends(&superclass, &subclass);
            }

            // ==================== Functions ====================
            Opcode::ConstantPool => {
                let n = r.u16()?;
                let mut strings = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    strings.push(Rc::<str>::from(r.string()?));
                }
                frame.pool = Some(Rc::new(ConstantPool::new(strings)));
            }
            Opcode::DefineFunction => self.op_define_function(frame, r, false)?,
            Opcode::DefineFunction2 => self.op_define_function(frame, r, true)?,
            Opcode::CallFunction => {
                let name = frame.pop();
                let argc = frame.pop();
                let name = self.to_string(&name)?;
                let args = self.pop_args(frame, &argc)?;
                let callee = self.get_variable(frame, &name);
                let result = if callee.is_object() {
                    self.call_value(&callee, self.cx.root().clone(), &args)?
                } else {
                    warn!(name = name.as_ref(), "call of an undefined function");
                    Value::Undefined
                };
                frame.push(result);
            }
            Opcode::CallMethod => {
                let name = frame.pop();
                let object = frame.pop();
                let argc = frame.pop();
                let name_str = self.to_string(&name)?;
                let args = self.pop_args(frame, &argc)?;
                let result = if name.is_nullish() || name_str.is_empty() {
                    // An empty method name calls the object itself.
                    self.call_value(&object, self.cx.root().clone(), &args)?
                } else if let Some(id) = object.as_object() {
                    let callee = self.get_property_chained(id, &name_str);
                    if callee.is_object() {
                        self.call_value(&callee, object.clone(), &args)?
                    } else {
                        warn!(method = name_str.as_ref(), "call of an undefined method");
                        Value::Undefined
                    }
                } else {
                    debug!(
                        method = name_str.as_ref(),
                        "method call on a non-object value"
                    );
                    Value::Undefined
                };
                frame.push(result);
            }
            Opcode::NewObject => {
                let name = frame.pop();
                let argc = frame.pop();
                let name = self.to_string(&name)?;
                let args = self.pop_args(frame, &argc)?;
                let ctor = self.get_variable(frame, &name);
                let result = self.construct(&ctor, &args)?;
                frame.push(result);
            }
            Opcode::NewMethod => {
                let name = frame.pop();
                let object = frame.pop();
                let argc = frame.pop();
                let name_str = self.to_string(&name)?;
                let args = self.pop_args(frame, &argc)?;
                let ctor = if name.is_nullish() || name_str.is_empty() {
                    object.clone()
                } else if let Some(id) = object.as_object() {
                    self.get_property_chained(id, &name_str)
                } else {
                    Value::Undefined
                };
                let result = self.construct(&ctor, &args)?;
                frame.push(result);
            }

            // ==================== Misc ====================
            Opcode::Trace => {
                let a = frame.pop();
                let s = self.to_printable(&a)?;
                self.host.trace(&s);
            }
            Opcode::GetTime => {
                frame.push(Value::Number(self.host.elapsed_millis() as f64));
            }
            Opcode::RandomNumber => {
                let a = frame.pop();
                let bound = self.to_number(&a)?;
                let n = self.cx.random_below(bound);
                frame.push(Value::Number(n));
            }
            Opcode::CloneSprite => {
                frame.pop();
                frame.pop();
                frame.pop();
                warn!("clone sprite not supported");
            }
            Opcode::RemoveSprite => {
                frame.pop();
                warn!("remove sprite not supported");
            }
            Opcode::StartDrag => {
                frame.pop(); // target
                frame.pop(); // lock center
                let constrain = frame.pop();
                if coerce::to_boolean(&constrain, self.cx.version()) {
                    frame.pop();
                    frame.pop();
                    frame.pop();
                    frame.pop();
                }
                warn!("start drag not supported");
            }
            Opcode::EndDrag => {
                warn!("end drag not supported");
            }
        }
        Ok(())
    }

    // ==================== Handlers ====================

    fn op_push(&mut self, frame: &mut CallFrame, r: &mut BitReader) -> ScriptResult<()> {
        while r.remaining_bits() >= 8 {
            let ty = r.u8()?;
            let value = match ty {
                0 => Value::string(r.string()?),
                1 => Value::Number(r.f32()? as f64),
                2 => Value::Null,
                3 => Value::Undefined,
                4 => {
                    let reg = r.u8()? as usize;
                    self.read_register(frame, reg)
                }
                5 => Value::Bool(r.u8()? != 0),
                6 => Value::Number(r.f64()?),
                7 => Value::Number(r.u32()? as i32 as f64),
                8 => {
                    let index = r.u8()? as usize;
                    self.pool_constant(frame, index)?
                }
                9 => {
                    let index = r.u16()? as usize;
                    self.pool_constant(frame, index)?
                }
                other => return Err(ScriptError::IllegalPushType(other)),
            };
            frame.push(value);
        }
        Ok(())
    }

    fn pool_constant(&self, frame: &CallFrame, index: usize) -> ScriptResult<Value> {
        let pool = frame.pool.as_deref();
        match pool.and_then(|p| p.get(index)) {
            Some(s) => Ok(Value::String(Rc::clone(s))),
            None => Err(ScriptError::ConstantOutOfRange {
                index,
                len: pool.map_or(0, ConstantPool::len),
            }),
        }
    }

    fn op_binary_numeric(&mut self, op: Opcode, frame: &mut CallFrame) -> ScriptResult<()> {
        let a = frame.pop();
        let b = frame.pop();
        let a = self.to_number(&a)?;
        let b = self.to_number(&b)?;
        let result = match op {
            Opcode::Add => Value::Number(b + a),
            Opcode::Subtract => Value::Number(b - a),
            Opcode::Multiply => Value::Number(b * a),
            // IEEE semantics: division and modulo produce infinities and
            // NaN, they never trap.
            Opcode::Divide => Value::Number(b / a),
            Opcode::Modulo => Value::Number(b % a),
            Opcode::Equals => Value::Bool(b == a),
            Opcode::Less => Value::Bool(b < a),
            Opcode::And => Value::Bool(b != 0.0 && a != 0.0),
            Opcode::Or => Value::Bool(b != 0.0 || a != 0.0),
            _ => unreachable!("non-numeric opcode routed to numeric handler"),
        };
        frame.push(result);
        Ok(())
    }

    fn op_binary_bitwise(&mut self, op: Opcode, frame: &mut CallFrame) -> ScriptResult<()> {
        let a = frame.pop();
        let b = frame.pop();
        let a = self.to_int32_of(&a)?;
        let b = self.to_int32_of(&b)?;
        let result = match op {
            Opcode::BitAnd => (b & a) as f64,
            Opcode::BitOr => (b | a) as f64,
            Opcode::BitXor => (b ^ a) as f64,
            Opcode::BitLShift => (b << (a & 31)) as f64,
            Opcode::BitRShift => (b >> (a & 31)) as f64,
            Opcode::BitURShift => ((b as u32) >> (a & 31)) as f64,
            _ => unreachable!("non-bitwise opcode routed to bitwise handler"),
        };
        frame.push(Value::Number(result));
        Ok(())
    }

    /// Relative branch from the current pc; an out-of-bounds target is a
    /// logged error and the branch is not taken.
    fn branch(&mut self, frame: &mut CallFrame, offset: i16) {
        let target = frame.pc as i64 + offset as i64;
        if (0..=frame.script.code.len() as i64).contains(&target) {
            frame.pc = target as usize;
        } else {
            error!(offset, pc = frame.pc, "branch target out of bounds");
        }
    }

    fn op_define_function(
        &mut self,
        frame: &mut CallFrame,
        r: &mut BitReader,
        extended: bool,
    ) -> ScriptResult<()> {
        let name = r.string()?;
        let n_params = r.u16()?;
        let mut register_count = 0;
        let mut flags = PreloadFlags::default();
        if extended {
            register_count = r.u8()?;
            flags = PreloadFlags::parse(r)?;
        }
        let mut params = Vec::with_capacity(n_params as usize);
        for _ in 0..n_params {
            let register = if extended { r.u8()? } else { 0 };
            params.push(Param {
                name: r.string()?,
                register,
            });
        }
        let code_size = r.u16()? as usize;

        // The body is not operand data: it is the next code_size bytes of
        // the surrounding script, skipped over here and only entered by a
        // later call.
        let body = match frame.script.code.subbuffer(frame.pc, code_size) {
            Some(body) => {
                frame.pc += code_size;
                body
            }
            None => {
                error!(code_size, "function body exceeds script bounds");
                Buffer::empty()
            }
        };

        let script = Rc::new(Script {
            name: name.clone(),
            params,
            register_count,
            flags,
            extended,
            code: body,
            pool: frame.pool.clone(),
            version: self.cx.version(),
        });
        let function = self.make_function(script);
        if name.is_empty() {
            frame.push(function);
        } else {
            self.cx.set_global_property(name, function);
        }
        Ok(())
    }

    fn op_extends(&mut self, superclass: &Value, subclass: &Value) {
        let (Some(sup), Some(sub)) = (superclass.as_object(), subclass.as_object()) else {
            warn!("extends on non-object operands");
            return;
        };
        let super_proto = self.get_own_property(sup, "prototype");
        let proto = self.cx.alloc_object();
        if let Some(obj) = self.cx.heap_mut().get_mut(proto) {
            if let Some(p) = super_proto {
                obj.set("__proto__", p);
            }
            obj.set("__constructor__", superclass.clone());
        }
        if let Some(obj) = self.cx.heap_mut().get_mut(sub) {
            obj.set("prototype", Value::Object(proto));
        }
    }

    // ==================== Invocation ====================

    fn invoke_script(&mut self, script: Rc<Script>, this: Value, args: &[Value]) -> ScriptResult<Value> {
        if self.cx.call_depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::CallDepthExceeded);
        }
        self.cx.call_depth += 1;
        let result = self.invoke_script_inner(script, this, args);
        self.cx.call_depth -= 1;
        result
    }

    fn invoke_script_inner(
        &mut self,
        script: Rc<Script>,
        this: Value,
        args: &[Value],
    ) -> ScriptResult<Value> {
        let mut frame = CallFrame::new(Rc::clone(&script), this.clone());

        if script.extended {
            // Implicits preload from register 1 upward, in wire order.
            let f = script.flags;
            let mut reg = 1usize;
            if f.preload_this {
                frame.set_register(reg, this);
                reg += 1;
            }
            if f.preload_args {
                let arguments = self.make_array(args.to_vec());
                frame.set_register(reg, Value::Object(arguments));
                reg += 1;
            }
            if f.preload_super {
                // No super support; the register still gets allocated.
                frame.set_register(reg, Value::Undefined);
                reg += 1;
            }
            if f.preload_root {
                frame.set_register(reg, self.cx.root().clone());
                reg += 1;
            }
            if f.preload_parent {
                frame.set_register(reg, self.cx.root().clone());
                reg += 1;
            }
            if f.preload_global {
                frame.set_register(reg, Value::Object(self.cx.global()));
            }
        }

        for (i, param) in script.params.iter().enumerate() {
            let arg = args.get(i).cloned().unwrap_or_default();
            if script.extended && param.register > 0 {
                frame.set_register(param.register as usize, arg);
            } else if !param.name.is_empty() {
                self.cx.set_global_property(param.name.as_str(), arg);
            }
        }

        self.run_frame(&mut frame)?;
        Ok(frame.return_value)
    }

    /// Construct an instance of `ctor`, yielding undefined when the
    /// constructor cannot be resolved. The argument list is consumed
    /// exactly once regardless of the constructor kind.
    fn construct(&mut self, ctor: &Value, args: &[Value]) -> ScriptResult<Value> {
        let Some(ctor_id) = ctor.as_object() else {
            warn!("construction from a non-object value");
            return Ok(Value::Undefined);
        };
        let Some(callable) = self.cx.heap().get(ctor_id).and_then(|o| o.callable.clone()) else {
            warn!("construction from a non-function object");
            return Ok(Value::Undefined);
        };

        let instance = self.cx.alloc_object();
        let proto = self.get_own_property(ctor_id, "prototype");
        if let Some(obj) = self.cx.heap_mut().get_mut(instance) {
            if let Some(Value::Object(p)) = proto {
                obj.set("__proto__", Value::Object(p));
            }
            obj.set("__constructor__", ctor.clone());
        }
        let this = Value::Object(instance);
        let returned = match callable {
            Callable::Native(f) => f(self.cx, self.host, this.clone(), args)?,
            Callable::Script(script) => self.invoke_script(script, this.clone(), args)?,
        };
        // A constructor returning an object replaces the fresh instance.
        Ok(match returned {
            Value::Object(_) => returned,
            _ => this,
        })
    }

    fn pop_args(&mut self, frame: &mut CallFrame, argc: &Value) -> ScriptResult<Args> {
        let n = self.to_int32_of(argc)?.max(0) as usize;
        let n = if n > frame.stack.len() {
            warn!(
                argc = n,
                depth = frame.stack.len(),
                "argument count exceeds stack depth, clamping"
            );
            frame.stack.len()
        } else {
            n
        };
        Ok((0..n).map(|_| frame.pop()).collect())
    }

    // ==================== Variables and registers ====================

    /// Variable lookup: `_global` and `this` resolve against the context
    /// directly, everything else against the global object.
    fn get_variable(&mut self, frame: &CallFrame, name: &str) -> Value {
        match name {
            "_global" => Value::Object(self.cx.global()),
            "this" => frame.this.clone(),
            _ => match self.cx.get_global_property(name) {
                Some(v) => v,
                None => {
                    debug!(name, "read of an uninitialized variable");
                    Value::Undefined
                }
            },
        }
    }

    fn read_register(&self, frame: &CallFrame, index: usize) -> Value {
        frame
            .register(index)
            .unwrap_or_else(|| self.cx.legacy_register(index))
    }

    fn write_register(&mut self, frame: &mut CallFrame, index: usize, value: Value) {
        if !frame.set_register(index, value.clone()) {
            self.cx.set_legacy_register(index, value);
        }
    }

    // ==================== Properties ====================

    /// Own-property lookup without prototype traversal.
    fn get_own_property(&self, id: ObjectId, name: &str) -> Option<Value> {
        self.cx.heap().get(id)?.get(name).cloned()
    }

    /// Property lookup following the `__proto__` chain.
    fn get_property_chained(&self, id: ObjectId, name: &str) -> Value {
        let mut current = id;
        for _ in 0..MAX_PROTO_DEPTH {
            let Some(obj) = self.cx.heap().get(current) else {
                return Value::Undefined;
            };
            if let Some(v) = obj.get(name) {
                return v.clone();
            }
            match obj.get("__proto__") {
                Some(Value::Object(p)) => current = *p,
                _ => return Value::Undefined,
            }
        }
        Value::Undefined
    }

    fn instance_of(&self, object: &Value, ctor: &Value) -> bool {
        let (Some(mut current), Some(ctor_id)) = (object.as_object(), ctor.as_object()) else {
            return false;
        };
        let Some(Value::Object(proto)) = self.get_own_property(ctor_id, "prototype") else {
            return false;
        };
        for _ in 0..MAX_PROTO_DEPTH {
            let Some(obj) = self.cx.heap().get(current) else {
                return false;
            };
            match obj.get("__proto__") {
                Some(Value::Object(p)) => {
                    if *p == proto {
                        return true;
                    }
                    current = *p;
                }
                _ => return false,
            }
        }
        false
    }

    /// Indexed movie properties; only the stage/timeline subset is
    /// meaningful without a rendering backend.
    fn movie_property(&mut self, index: i32) -> ScriptResult<Value> {
        if !(0..=21).contains(&index) {
            return Err(ScriptError::PropertyIndexOutOfRange(index));
        }
        let (width, height) = self.host.stage_size();
        let (mouse_x, mouse_y) = self.host.mouse_position();
        Ok(match index {
            5 => Value::Number(self.host.frame_count() as f64),
            8 => Value::Number(width as f64),
            9 => Value::Number(height as f64),
            12 => Value::Number(self.host.frames_loaded() as f64),
            16 => Value::Number(1.0), // high quality
            19 => Value::Number(1.0), // quality
            20 => Value::Number(mouse_x),
            21 => Value::Number(mouse_y),
            other => {
                debug!(index = other, "movie property not supported");
                Value::Undefined
            }
        })
    }

    // ==================== Coercions with virtual dispatch ====================

    /// Full to-string: primitives through the coercion table, objects
    /// through a virtual `toString` call with a `[type Object]` fallback.
    pub fn to_string(&mut self, value: &Value) -> ScriptResult<Rc<str>> {
        if let Some(s) = coerce::primitive_to_string(value, self.cx.version()) {
            return Ok(s);
        }
        let id = value.as_object().expect("non-primitive value");
        let to_string_fn = self.get_property_chained(id, "toString");
        if to_string_fn.is_object() {
            let result = self.call_value(&to_string_fn, value.clone(), &[])?;
            if let Value::String(s) = result {
                return Ok(s);
            }
        }
        if let Some(prim) = self.cx.heap().get(id).and_then(|o| o.primitive.clone())
            && let Some(s) = coerce::primitive_to_string(&prim, self.cx.version())
        {
            return Ok(s);
        }
        Ok("[type Object]".into())
    }

    /// The trace channel's variant of to-string: undefined always prints
    /// as "undefined", regardless of version.
    pub fn to_printable(&mut self, value: &Value) -> ScriptResult<Rc<str>> {
        match value {
            Value::Undefined => Ok("undefined".into()),
            other => self.to_string(other),
        }
    }

    /// Full to-number: objects are reduced through `valueOf` first.
    pub fn to_number(&mut self, value: &Value) -> ScriptResult<f64> {
        let primitive = self.to_primitive(value.clone())?;
        Ok(coerce::primitive_to_number(&primitive, self.cx.version()).unwrap_or(f64::NAN))
    }

    /// Reduce a value to a primitive: objects get a virtual `valueOf`
    /// call; if the result is still an object the value becomes undefined.
    pub fn to_primitive(&mut self, value: Value) -> ScriptResult<Value> {
        let Some(id) = value.as_object() else {
            return Ok(value);
        };
        let value_of = self.get_property_chained(id, "valueOf");
        if value_of.is_object() {
            let result = self.call_value(&value_of, value, &[])?;
            return Ok(if result.is_object() {
                Value::Undefined
            } else {
                result
            });
        }
        if let Some(prim) = self.cx.heap().get(id).and_then(|o| o.primitive.clone()) {
            return Ok(prim);
        }
        Ok(Value::Undefined)
    }

    fn to_int32_of(&mut self, value: &Value) -> ScriptResult<i32> {
        Ok(coerce::to_int32(self.to_number(value)?))
    }

    fn abstract_equals(&mut self, x: &Value, y: &Value) -> ScriptResult<bool> {
        use Value::*;
        Ok(match (x, y) {
            (Undefined | Null, Undefined | Null) => true,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => {
                let a = self.to_number(x)?;
                let b = self.to_number(y)?;
                a == b
            }
        })
    }

    // ==================== Allocation helpers ====================

    /// Build an array-like object: indexed properties plus `length`.
    fn make_array(&mut self, items: Vec<Value>) -> ObjectId {
        let id = self.cx.alloc_object();
        let len = items.len();
        if let Some(obj) = self.cx.heap_mut().get_mut(id) {
            for (i, item) in items.into_iter().enumerate() {
                obj.set(i.to_string(), item);
            }
            obj.set("length", Value::Number(len as f64));
        }
        id
    }

    /// Wrap a script in a function object with a fresh prototype.
    fn make_function(&mut self, script: Rc<Script>) -> Value {
        let func = self
            .cx
            .heap_mut()
            .alloc(ScriptObject::function(Callable::Script(script)));
        let proto = self.cx.alloc_object();
        if let Some(obj) = self.cx.heap_mut().get_mut(proto) {
            obj.set("constructor", Value::Object(func));
        }
        if let Some(obj) = self.cx.heap_mut().get_mut(func) {
            obj.set("prototype", Value::Object(proto));
        }
        Value::Object(func)
    }
}

/// Strict equality: same type, equal payload, no coercion.
fn strict_equals(x: &Value, y: &Value) -> bool {
    use Value::*;
    match (x, y) {
        (Undefined, Undefined) | (Null, Null) => true,
        (Number(a), Number(b)) => a == b,
        (String(a), String(b)) => a == b,
        (Bool(a), Bool(b)) => a == b,
        (Object(a), Object(b)) => a == b,
        _ => false,
    }
}

/// Clamp a substring request into `[0, len]`; never errors.
fn clamp_extract(index: i32, count: i32, len: usize) -> (usize, usize) {
    let index = index.max(0) as usize;
    let count = count.max(0) as usize;
    let index = index.min(len);
    let count = count.min(len - index);
    (index, count)
}

/// Internal wiring properties hidden from enumeration.
fn is_hidden_property(name: &str) -> bool {
    name == "__proto__" || name == "__constructor__"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_extract() {
        assert_eq!(clamp_extract(0, 5, 3), (0, 3));
        assert_eq!(clamp_extract(-2, 2, 5), (0, 2));
        assert_eq!(clamp_extract(10, 2, 5), (5, 0));
        assert_eq!(clamp_extract(2, -1, 5), (2, 0));
        assert_eq!(clamp_extract(2, 100, 5), (2, 3));
    }

    #[test]
    fn test_strict_equals() {
        assert!(strict_equals(&Value::number(1.0), &Value::number(1.0)));
        assert!(!strict_equals(&Value::number(1.0), &Value::string("1")));
        assert!(!strict_equals(
            &Value::number(f64::NAN),
            &Value::number(f64::NAN)
        ));
        assert!(strict_equals(&Value::Null, &Value::Null));
        assert!(!strict_equals(&Value::Null, &Value::Undefined));
    }
}
