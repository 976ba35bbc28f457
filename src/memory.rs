// src/memory.rs

use std::fmt;

/// Smallest capacity any growable buffer jumps to from empty.
pub const MIN_CAPACITY: usize = 8;

/// Capacity growth policy shared by every growable buffer: double, with a floor.
pub fn grow_capacity(capacity: usize) -> usize {
    if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity * 2
    }
}

/// 32-bit FNV-1a over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

// --- Core Data Structures ---

/// Handle to an object living in a [`Heap`]. Only meaningful for the heap that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(usize);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An immutable heap string with its hash computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjString {
    chars: Box<str>,
    hash: u32,
}

impl ObjString {
    fn new(chars: Box<str>) -> Self {
        let hash = hash_bytes(chars.as_bytes());
        ObjString { chars, hash }
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl fmt::Display for ObjString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chars)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    String(ObjString),
}

// --- The Heap ---

/// Owning registry for every object created while compiling or running.
///
/// Objects are never freed individually: they stay alive until the heap itself is dropped,
/// which releases all of them at once. Handles are plain indices, so nothing here needs to
/// walk a linked list.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of an object and returns its handle.
    pub fn register(&mut self, obj: HeapObject) -> ObjRef {
        let id = self.objects.len();
        self.objects.push(obj);
        log::trace!("heap: registered object #{}", id);
        ObjRef(id)
    }

    /// Copies `chars` into a new string object.
    pub fn copy_string(&mut self, chars: &str) -> ObjRef {
        self.register(HeapObject::String(ObjString::new(chars.into())))
    }

    /// Builds a new string holding `a` followed by `b`.
    pub fn concatenate(&mut self, a: ObjRef, b: ObjRef) -> ObjRef {
        let left = self.string(a).as_str();
        let right = self.string(b).as_str();
        let mut chars = String::with_capacity(left.len() + right.len());
        chars.push_str(left);
        chars.push_str(right);
        self.register(HeapObject::String(ObjString::new(chars.into_boxed_str())))
    }

    pub fn get(&self, obj: ObjRef) -> &HeapObject {
        &self.objects[obj.index()]
    }

    /// Every object is a string for now, so this never fails for a handle from this heap.
    pub fn string(&self, obj: ObjRef) -> &ObjString {
        match self.get(obj) {
            HeapObject::String(s) => s,
        }
    }

    pub fn alive_count(&self) -> usize {
        self.objects.len()
    }
}
