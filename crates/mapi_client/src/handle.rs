//! Generational handles for sessions and remote objects.

use std::fmt;

/// Identifies an open session within a [`MapiContext`](crate::MapiContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    index: u32,
    generation: u32,
}

/// A client-side reference to a server object.
///
/// Stays a plain value after the object is released; any later use is
/// rejected with `InvalidParameter` because the slot's generation moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapiObject {
    index: u32,
    generation: u32,
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}.{}", self.index, self.generation)
    }
}

impl fmt::Display for MapiObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}.{}", self.index, self.generation)
    }
}

/// Kind of server object behind a [`MapiObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A logged-on message store.
    Store,
    /// A folder.
    Folder,
    /// A contents table.
    Table,
}

pub(crate) trait SlotKey: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(self) -> usize;
    fn generation(self) -> u32;
}

impl SlotKey for SessionId {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
    fn index(self) -> usize {
        self.index as usize
    }
    fn generation(self) -> u32 {
        self.generation
    }
}

impl SlotKey for MapiObject {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
    fn index(self) -> usize {
        self.index as usize
    }
    fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slab of values addressed by generational keys.
#[derive(Debug)]
pub(crate) struct SlotTable<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    _key: std::marker::PhantomData<K>,
}

impl<K: SlotKey, T> SlotTable<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            _key: std::marker::PhantomData,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> K {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            return K::from_parts(index as u32, slot.generation);
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        K::from_parts(index as u32, 0)
    }

    pub(crate) fn get(&self, key: K) -> Option<&T> {
        self.slots
            .get(key.index())
            .filter(|s| s.generation == key.generation())
            .and_then(|s| s.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots
            .get_mut(key.index())
            .filter(|s| s.generation == key.generation())
            .and_then(|s| s.value.as_mut())
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<T> {
        let slot = self
            .slots
            .get_mut(key.index())
            .filter(|s| s.generation == key.generation())?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index());
        Some(value)
    }

    /// Removes every value matching `pred`, returning how many went.
    pub(crate) fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.as_ref().is_some_and(&mut pred) {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                removed += 1;
            }
        }
        removed
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.value.is_some())
            .map(|(i, s)| K::from_parts(i as u32, s.generation))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }
}
