//! Scripts, functions and constant pools

use std::rc::Rc;

use flicker_bits::{BitReader, Buffer, ReadResult};

/// An ordered sequence of strings installed by a constant-pool action.
///
/// Replaced wholesale when a new pool action runs; scripts defined while a
/// pool was active keep a shared reference to it, so a pool lives as long
/// as the last function still indexing into it.
#[derive(Debug, Default)]
pub struct ConstantPool {
    strings: Vec<Rc<str>>,
}

impl ConstantPool {
    /// Create a pool from its strings.
    pub fn new(strings: Vec<Rc<str>>) -> Self {
        Self { strings }
    }

    /// Look up a constant by index.
    pub fn get(&self, index: usize) -> Option<&Rc<str>> {
        self.strings.get(index)
    }

    /// Number of strings in the pool.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// A declared function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name, bound as a variable when `register` is zero.
    pub name: String,
    /// Target register (extended form), or zero for by-name binding.
    pub register: u8,
}

/// Preload/suppress flags of the extended function form.
///
/// The preload flags pre-populate registers (from register 1 upward, in
/// the order `this`, `arguments`, `super`, `_root`, `_parent`, `_global`)
/// before user code runs; the suppress flags skip building the
/// corresponding implicit entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreloadFlags {
    /// Preload the enclosing clip into a register.
    pub preload_parent: bool,
    /// Preload the root clip into a register.
    pub preload_root: bool,
    /// Do not build `super`.
    pub suppress_super: bool,
    /// Preload `super` into a register.
    pub preload_super: bool,
    /// Do not build the arguments object.
    pub suppress_args: bool,
    /// Preload the arguments object into a register.
    pub preload_args: bool,
    /// Do not bind `this`.
    pub suppress_this: bool,
    /// Preload `this` into a register.
    pub preload_this: bool,
    /// Preload the global object into a register.
    pub preload_global: bool,
}

impl PreloadFlags {
    /// Decode the flag bits in their wire order: eight bits, seven
    /// reserved bits, then the global-preload bit.
    pub fn parse(r: &mut BitReader) -> ReadResult<Self> {
        let preload_parent = r.bit()?;
        let preload_root = r.bit()?;
        let suppress_super = r.bit()?;
        let preload_super = r.bit()?;
        let suppress_args = r.bit()?;
        let preload_args = r.bit()?;
        let suppress_this = r.bit()?;
        let preload_this = r.bit()?;
        r.bits(7)?;
        let preload_global = r.bit()?;
        Ok(Self {
            preload_parent,
            preload_root,
            suppress_super,
            preload_super,
            suppress_args,
            preload_args,
            suppress_this,
            preload_this,
            preload_global,
        })
    }
}

/// A bytecode script: either a top-level action block or the captured body
/// of a define-function action.
///
/// The body is a zero-copy view into the buffer it was defined in; the
/// constant pool active at definition time is shared into the script.
#[derive(Debug)]
pub struct Script {
    /// Function name; empty for anonymous functions and top-level blocks.
    pub name: String,
    /// Declared parameters.
    pub params: Vec<Param>,
    /// Size of the private register bank (extended form only).
    pub register_count: u8,
    /// Preload/suppress flags (extended form only).
    pub flags: PreloadFlags,
    /// Whether this is the extended (define-function2) form with a private
    /// register bank.
    pub extended: bool,
    /// The bytecode body.
    pub code: Buffer,
    /// Constant pool captured at definition time.
    pub pool: Option<Rc<ConstantPool>>,
    /// Player version the script runs under (gates coercions).
    pub version: u8,
}

impl Script {
    /// Wrap a top-level action block (a do-action tag body).
    pub fn top_level(code: Buffer, name: impl Into<String>, version: u8) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            register_count: 0,
            flags: PreloadFlags::default(),
            extended: false,
            code,
            pool: None,
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_flags_bit_order() {
        // preload_this and preload_global set, everything else clear:
        // bit 7 of the first byte and bit 0 of the second.
        let buf = Buffer::new(&[0b0000_0001, 0b0000_0001]);
        let mut r = BitReader::new(buf);
        let flags = PreloadFlags::parse(&mut r).unwrap();
        assert!(flags.preload_this);
        assert!(flags.preload_global);
        assert!(!flags.preload_parent);
        assert!(!flags.suppress_this);

        let buf = Buffer::new(&[0b1010_0000, 0]);
        let mut r = BitReader::new(buf);
        let flags = PreloadFlags::parse(&mut r).unwrap();
        assert!(flags.preload_parent);
        assert!(flags.suppress_super);
        assert!(!flags.preload_root);
        assert!(!flags.preload_global);
    }

    #[test]
    fn test_constant_pool_lookup() {
        let pool = ConstantPool::new(vec!["a".into(), "b".into()]);
        assert_eq!(pool.get(0).unwrap().as_ref(), "a");
        assert_eq!(pool.get(1).unwrap().as_ref(), "b");
        assert!(pool.get(2).is_none());
        assert_eq!(pool.len(), 2);
    }
}
