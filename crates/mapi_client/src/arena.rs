//! Tree-shaped allocation scopes.
//!
//! An [`Arena`] owns a tree of scopes. Every buffer belongs to exactly one
//! scope, and releasing a scope frees its buffers and those of every
//! descendant scope. References into released memory are detected and
//! rejected instead of read.
//!
//! ```
//! use mapi_client::Arena;
//!
//! let mut arena = Arena::open("call");
//! let root = arena.root();
//! let reply = arena.child(root, "reply").unwrap();
//! let buf = arena.store(reply, b"payload").unwrap();
//! assert_eq!(arena.get(buf).unwrap(), b"payload");
//!
//! assert_eq!(arena.release(reply).unwrap(), 1);
//! assert!(arena.get(buf).is_err());
//! ```

use crate::error::{MapiError, MapiResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// A scope inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    arena: u64,
    index: usize,
    generation: u32,
}

/// A buffer allocated from an [`Arena`].
///
/// Slots are reused after a free; a reference to an earlier occupant is
/// rejected because the slot's generation moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRef {
    arena: u64,
    slot: usize,
    generation: u32,
}

#[derive(Debug)]
struct Scope {
    label: String,
    generation: u32,
    live: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    buffers: Vec<usize>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    scope: usize,
    data: Option<Box<[u8]>>,
}

/// Hierarchical allocation context.
#[derive(Debug)]
pub struct Arena {
    id: u64,
    scopes: Vec<Scope>,
    slots: Vec<Slot>,
    free_scopes: Vec<usize>,
    free_slots: Vec<usize>,
    limit: usize,
    live_buffers: usize,
    live_bytes: usize,
}

impl Arena {
    /// Opens an arena with an unbounded root scope.
    pub fn open(label: impl Into<String>) -> Self {
        Self::with_limit(label, usize::MAX)
    }

    /// Opens an arena that holds at most `limit` live bytes.
    pub fn with_limit(label: impl Into<String>, limit: usize) -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            scopes: vec![Scope {
                label: label.into(),
                generation: 0,
                live: true,
                parent: None,
                children: Vec::new(),
                buffers: Vec::new(),
            }],
            slots: Vec::new(),
            free_scopes: Vec::new(),
            free_slots: Vec::new(),
            limit,
            live_buffers: 0,
            live_bytes: 0,
        }
    }

    /// The root scope.
    pub fn root(&self) -> ScopeId {
        ScopeId {
            arena: self.id,
            index: 0,
            generation: self.scopes[0].generation,
        }
    }

    /// Label of a scope.
    pub fn label(&self, scope: ScopeId) -> MapiResult<&str> {
        let index = self.live_scope(scope)?;
        Ok(&self.scopes[index].label)
    }

    /// Opens a scope nested under `parent`.
    pub fn child(&mut self, parent: ScopeId, label: impl Into<String>) -> MapiResult<ScopeId> {
        let parent = self.live_scope(parent)?;
        let index = match self.free_scopes.pop() {
            Some(index) => {
                let scope = &mut self.scopes[index];
                scope.label = label.into();
                scope.live = true;
                scope.parent = Some(parent);
                index
            }
            None => {
                self.scopes.push(Scope {
                    label: label.into(),
                    generation: 0,
                    live: true,
                    parent: Some(parent),
                    children: Vec::new(),
                    buffers: Vec::new(),
                });
                self.scopes.len() - 1
            }
        };
        self.scopes[parent].children.push(index);
        Ok(ScopeId {
            arena: self.id,
            index,
            generation: self.scopes[index].generation,
        })
    }

    /// Allocates a zeroed buffer of `size` bytes in `scope`.
    pub fn allocate(&mut self, scope: ScopeId, size: usize) -> MapiResult<BufferRef> {
        let scope = self.live_scope(scope)?;
        if size == 0 {
            return Err(MapiError::invalid_parameter("zero-sized allocation"));
        }
        let remaining = self.limit - self.live_bytes;
        if size > remaining {
            return Err(MapiError::not_enough_resources(format!(
                "{size} bytes requested, {remaining} left in arena '{}'",
                self.scopes[0].label
            )));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|e| MapiError::not_enough_resources(e.to_string()))?;
        data.resize(size, 0);
        let data = Some(data.into_boxed_slice());

        let slot = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.scope = scope;
                slot.data = data;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    scope,
                    data,
                });
                self.slots.len() - 1
            }
        };
        self.scopes[scope].buffers.push(slot);
        self.live_buffers += 1;
        self.live_bytes += size;
        Ok(BufferRef {
            arena: self.id,
            slot,
            generation: self.slots[slot].generation,
        })
    }

    /// Allocates a buffer in `scope` holding a copy of `bytes`.
    pub fn store(&mut self, scope: ScopeId, bytes: &[u8]) -> MapiResult<BufferRef> {
        let buf = self.allocate(scope, bytes.len())?;
        self.get_mut(buf)?.copy_from_slice(bytes);
        Ok(buf)
    }

    /// Reads a buffer.
    pub fn get(&self, buf: BufferRef) -> MapiResult<&[u8]> {
        let slot = self.live_slot(buf)?;
        self.slots[slot]
            .data
            .as_deref()
            .ok_or_else(|| MapiError::invalid_parameter("buffer already freed"))
    }

    /// Writes a buffer.
    pub fn get_mut(&mut self, buf: BufferRef) -> MapiResult<&mut [u8]> {
        let slot = self.live_slot(buf)?;
        self.slots[slot]
            .data
            .as_deref_mut()
            .ok_or_else(|| MapiError::invalid_parameter("buffer already freed"))
    }

    /// Frees one buffer ahead of its scope.
    pub fn free(&mut self, buf: BufferRef) -> MapiResult<()> {
        let slot = self.live_slot(buf)?;
        let scope = self.slots[slot].scope;
        self.vacate(slot);
        self.scopes[scope].buffers.retain(|s| *s != slot);
        Ok(())
    }

    /// Releases `scope`, its descendants and all their buffers.
    ///
    /// Returns the number of buffers freed. Releasing the root leaves the
    /// arena with no usable scope.
    pub fn release(&mut self, scope: ScopeId) -> MapiResult<usize> {
        let start = self.live_scope(scope)?;
        if let Some(parent) = self.scopes[start].parent {
            self.scopes[parent].children.retain(|c| *c != start);
        }

        let mut freed = 0;
        let mut pending = vec![start];
        while let Some(index) = pending.pop() {
            let scope = &mut self.scopes[index];
            scope.live = false;
            scope.generation = scope.generation.wrapping_add(1);
            pending.append(&mut scope.children);
            for slot in std::mem::take(&mut scope.buffers) {
                if self.vacate(slot) {
                    freed += 1;
                }
            }
            // The root keeps its index for the arena's lifetime.
            if index != 0 {
                self.free_scopes.push(index);
            }
        }
        trace!(
            arena = %self.scopes[0].label,
            scope = %self.scopes[start].label,
            freed,
            "released arena scope"
        );
        Ok(freed)
    }

    /// Number of buffers not yet freed.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }

    /// Bytes held by buffers not yet freed.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Drops a slot's data and puts the slot up for reuse.
    fn vacate(&mut self, slot: usize) -> bool {
        let entry = &mut self.slots[slot];
        let Some(data) = entry.data.take() else {
            return false;
        };
        entry.generation = entry.generation.wrapping_add(1);
        self.free_slots.push(slot);
        self.live_buffers -= 1;
        self.live_bytes -= data.len();
        true
    }

    fn live_scope(&self, scope: ScopeId) -> MapiResult<usize> {
        if scope.arena != self.id {
            return Err(MapiError::invalid_parameter("scope belongs to another arena"));
        }
        match self.scopes.get(scope.index) {
            Some(s) if s.live && s.generation == scope.generation => Ok(scope.index),
            Some(_) => Err(MapiError::invalid_parameter("scope already released")),
            None => Err(MapiError::invalid_parameter("unknown scope")),
        }
    }

    fn live_slot(&self, buf: BufferRef) -> MapiResult<usize> {
        if buf.arena != self.id {
            return Err(MapiError::invalid_parameter("buffer belongs to another arena"));
        }
        match self.slots.get(buf.slot) {
            Some(s) if s.generation == buf.generation && s.data.is_some() => Ok(buf.slot),
            Some(_) => Err(MapiError::invalid_parameter("buffer already freed")),
            None => Err(MapiError::invalid_parameter("unknown buffer")),
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if self.scopes[0].live {
            let root = self.root();
            // The root is live, so this cannot fail.
            let _ = self.release(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn allocate_and_read() {
        let mut arena = Arena::open("test");
        let root = arena.root();
        let buf = arena.allocate(root, 8).unwrap();
        assert_eq!(arena.get(buf).unwrap(), &[0u8; 8]);
        arena.get_mut(buf).unwrap()[0] = 0xAB;
        assert_eq!(arena.get(buf).unwrap()[0], 0xAB);
        assert_eq!(arena.live_bytes(), 8);
    }

    #[test]
    fn zero_size_is_invalid_parameter() {
        let mut arena = Arena::open("test");
        let root = arena.root();
        let err = arena.allocate(root, 0).unwrap_err();
        assert!(matches!(err, MapiError::InvalidParameter { .. }));
    }

    #[test]
    fn limit_is_enforced() {
        let mut arena = Arena::with_limit("small", 16);
        let root = arena.root();
        arena.allocate(root, 10).unwrap();
        let err = arena.allocate(root, 7).unwrap_err();
        assert!(matches!(err, MapiError::NotEnoughResources { .. }));
        arena.allocate(root, 6).unwrap();
    }

    #[test]
    fn release_is_recursive() {
        let mut arena = Arena::open("test");
        let root = arena.root();
        let a = arena.child(root, "a").unwrap();
        let b = arena.child(a, "b").unwrap();
        let x = arena.store(a, b"x").unwrap();
        let y = arena.store(b, b"yy").unwrap();
        let z = arena.store(root, b"zzz").unwrap();

        assert_eq!(arena.release(a).unwrap(), 2);
        assert!(arena.get(x).is_err());
        assert!(arena.get(y).is_err());
        assert!(arena.child(b, "c").is_err());
        assert_eq!(arena.get(z).unwrap(), b"zzz");
        assert_eq!(arena.live_buffers(), 1);
        assert_eq!(arena.live_bytes(), 3);
    }

    #[test]
    fn double_release_rejected() {
        let mut arena = Arena::open("test");
        let root = arena.root();
        let a = arena.child(root, "a").unwrap();
        arena.release(a).unwrap();
        assert!(matches!(
            arena.release(a),
            Err(MapiError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn free_single_buffer() {
        let mut arena = Arena::open("test");
        let root = arena.root();
        let a = arena.store(root, b"abc").unwrap();
        let b = arena.store(root, b"de").unwrap();
        arena.free(a).unwrap();
        assert!(arena.get(a).is_err());
        assert!(arena.free(a).is_err());
        assert_eq!(arena.release(root).unwrap(), 1);
        assert!(arena.get(b).is_err());
    }

    #[test]
    fn foreign_references_rejected() {
        let mut one = Arena::open("one");
        let two = Arena::open("two");
        let root = one.root();
        let buf = one.store(root, b"x").unwrap();
        assert!(two.get(buf).is_err());
        assert!(two.label(root).is_err());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = Arena::open("churn");
        let root = arena.root();
        for _ in 0..10_000 {
            let buf = arena.allocate(root, 1).unwrap();
            arena.free(buf).unwrap();
        }
        for _ in 0..100 {
            let scope = arena.child(root, "call").unwrap();
            arena.store(scope, b"reply").unwrap();
            arena.release(scope).unwrap();
        }
        assert_eq!(arena.slots.len(), 1);
        assert_eq!(arena.scopes.len(), 2);
        assert!(arena.scopes[0].children.is_empty());
        assert_eq!(arena.live_buffers(), 0);
        assert_eq!(arena.live_bytes(), 0);
    }

    #[test]
    fn stale_references_rejected_after_reuse() {
        let mut arena = Arena::open("test");
        let root = arena.root();
        let old = arena.store(root, b"old").unwrap();
        arena.free(old).unwrap();
        let new = arena.store(root, b"new").unwrap();
        assert_eq!(old.slot, new.slot);
        assert!(matches!(arena.get(old), Err(MapiError::InvalidParameter { .. })));
        assert!(arena.free(old).is_err());
        assert_eq!(arena.get(new).unwrap(), b"new");

        let first = arena.child(root, "first").unwrap();
        arena.release(first).unwrap();
        let second = arena.child(root, "second").unwrap();
        assert_eq!(first.index, second.index);
        assert!(arena.allocate(first, 1).is_err());
        assert!(arena.release(first).is_err());
        assert_eq!(arena.label(second).unwrap(), "second");
    }

    proptest! {
        #[test]
        fn release_frees_every_buffer(sizes in prop::collection::vec(1usize..64, 0..32)) {
            let mut arena = Arena::open("prop");
            let root = arena.root();
            let scope = arena.child(root, "scope").unwrap();
            let bufs: Vec<_> = sizes
                .iter()
                .map(|s| arena.allocate(scope, *s).unwrap())
                .collect();
            prop_assert_eq!(arena.live_bytes(), sizes.iter().sum::<usize>());
            prop_assert_eq!(arena.release(scope).unwrap(), sizes.len());
            prop_assert_eq!(arena.live_bytes(), 0);
            for buf in bufs {
                prop_assert!(arena.get(buf).is_err());
            }
        }
    }
}
