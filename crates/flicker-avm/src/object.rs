//! Script object heap
//!
//! Objects live in an arena of slots addressed by generational handles
//! instead of individual reference counts. The script/scene object graph is
//! full of cycles (`prototype` ↔ `constructor`, parent ↔ child); an arena
//! sidesteps them entirely. Slots are retained for the lifetime of the
//! owning document, matching the original player's lifecycle where script
//! objects die with the document.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::context::{ExecutionContext, Host};
use crate::error::ScriptResult;
use crate::script::Script;
use crate::value::Value;

/// Generational handle to a heap object.
///
/// A stale handle (slot reused by a later generation) resolves to no
/// object; reads through it yield undefined and writes are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

/// A function implemented in Rust, callable from bytecode.
pub type NativeFn =
    Rc<dyn Fn(&mut ExecutionContext, &mut dyn Host, Value, &[Value]) -> ScriptResult<Value>>;

/// The callable payload of a function object.
#[derive(Clone)]
pub enum Callable {
    /// A bytecode function captured by a define-function action.
    Script(Rc<Script>),
    /// A built-in function.
    Native(NativeFn),
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script(s) => write!(f, "Callable::Script({:?})", s.name),
            Self::Native(_) => write!(f, "Callable::Native"),
        }
    }
}

/// A script object: a property map plus optional callable and boxed
/// primitive payloads.
///
/// Property enumeration order is insertion order, so the map is paired
/// with an order vector.
#[derive(Debug, Default)]
pub struct ScriptObject {
    properties: FxHashMap<Rc<str>, Value>,
    order: Vec<Rc<str>>,
    /// Callable payload when this object is a function.
    pub callable: Option<Callable>,
    /// The wrapped primitive when this object is a boxed number, string or
    /// boolean.
    pub primitive: Option<Value>,
}

impl ScriptObject {
    /// Create a plain object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a function object around `callable`.
    pub fn function(callable: Callable) -> Self {
        Self {
            callable: Some(callable),
            ..Self::default()
        }
    }

    /// Create a boxed-primitive object.
    pub fn boxed(primitive: Value) -> Self {
        Self {
            primitive: Some(primitive),
            ..Self::default()
        }
    }

    /// Look up an own property.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a property, recording insertion order for new names.
    pub fn set(&mut self, name: impl Into<Rc<str>>, value: Value) {
        let name = name.into();
        if self.properties.insert(Rc::clone(&name), value).is_none() {
            self.order.push(name);
        }
    }

    /// Remove a property. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.properties.remove(name).is_some() {
            self.order.retain(|n| n.as_ref() != name);
            true
        } else {
            false
        }
    }

    /// Whether an own property exists.
    pub fn has(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.order.iter()
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the object has no own properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    object: Option<ScriptObject>,
}

/// Arena of script objects.
#[derive(Debug, Default)]
pub struct ObjectHeap {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ObjectHeap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `object`, returning its handle.
    pub fn alloc(&mut self, object: ScriptObject) -> ObjectId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            ObjectId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(object),
            });
            ObjectId {
                index,
                generation: 0,
            }
        }
    }

    /// Release the object behind `id`. Stale handles keep resolving to
    /// nothing afterwards.
    pub fn free(&mut self, id: ObjectId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize)
            && slot.generation == id.generation
            && slot.object.is_some()
        {
            slot.object = None;
            slot.generation += 1;
            self.free.push(id.index);
        }
    }

    /// Resolve a handle.
    pub fn get(&self, id: ObjectId) -> Option<&ScriptObject> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_ref()
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ScriptObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_mut()
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.object.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_get() {
        let mut heap = ObjectHeap::new();
        let id = heap.alloc(ScriptObject::new());
        heap.get_mut(id).unwrap().set("x", Value::number(1.0));
        assert_eq!(heap.get(id).unwrap().get("x"), Some(&Value::number(1.0)));
    }

    #[test]
    fn test_stale_handle_after_free() {
        let mut heap = ObjectHeap::new();
        let id = heap.alloc(ScriptObject::new());
        heap.free(id);
        assert!(heap.get(id).is_none());
        // The slot is reused under a new generation.
        let id2 = heap.alloc(ScriptObject::new());
        assert!(heap.get(id).is_none());
        assert!(heap.get(id2).is_some());
        assert_ne!(id, id2);
    }

    #[test]
    fn test_enumeration_order_is_insertion_order() {
        let mut obj = ScriptObject::new();
        obj.set("b", Value::number(1.0));
        obj.set("a", Value::number(2.0));
        obj.set("b", Value::number(3.0));
        let keys: Vec<_> = obj.keys().map(|k| k.as_ref().to_owned()).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_remove() {
        let mut obj = ScriptObject::new();
        obj.set("x", Value::bool(true));
        assert!(obj.remove("x"));
        assert!(!obj.remove("x"));
        assert!(obj.is_empty());
    }
}
