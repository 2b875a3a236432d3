//! A dense, generational handle table: spec.md §4.2's "Resource table".
//!
//! Host-owned objects (file descriptors, sockets, any native struct a
//! guest should only ever see through an opaque token) get a stable
//! 32-bit [`componentrt_types::Handle`] here. The table never hands out
//! `&mut` access to a live entry concurrently with a `remove` of the
//! same entry — callers express that invariant the same way the rest of
//! Rust does: `get` borrows `&self`, `add`/`remove`/`clear` borrow
//! `&mut self`. Sharing a single table across threads (spec.md §5 says a
//! host handing a handle across threads must synchronize externally) is
//! the caller's job, typically via `Mutex<ResourceTable<Tag>>`.

use componentrt_types::Handle;
use std::any::Any;
use tracing::trace;

/// Index bits vs. generation bits packed into the `Handle`'s `u32`.
/// 24 bits of index supports 16.7M live entries per table; 8 bits of
/// generation makes an immediately-reused handle collide with a stale
/// caller only after 256 reuses of the same slot, which is a belt-and-
/// suspenders check beyond what spec.md §4.2 requires (generational
/// bits are "allowed but not mandated externally").
const INDEX_BITS: u32 = 24;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

#[derive(Debug)]
enum Slot<Tag> {
    /// `generation` here is the generation the *next* occupant of this
    /// slot should use (i.e. one past the last occupant's), so a stale
    /// handle referencing the previous occupant never matches again.
    Vacant { next_free: Option<u32>, generation: u8 },
    Occupied {
        tag: Tag,
        generation: u8,
        payload: Box<dyn Any + Send + Sync>,
    },
}

/// A handle table keyed by an opaque `Tag` the caller uses to identify
/// what kind of resource a handle refers to (spec.md: "Type tags are
/// opaque but comparable; `get` callers check the tag before
/// downcasting").
pub struct ResourceTable<Tag> {
    slots: Vec<Slot<Tag>>,
    free_head: Option<u32>,
}

impl<Tag> Default for ResourceTable<Tag> {
    fn default() -> Self {
        ResourceTable {
            slots: Vec::new(),
            free_head: None,
        }
    }
}

fn pack(index: u32, generation: u8) -> u32 {
    (index & INDEX_MASK) | ((generation as u32) << INDEX_BITS)
}

fn unpack(raw: u32) -> (u32, u8) {
    (raw & INDEX_MASK, (raw >> INDEX_BITS) as u8)
}

impl<Tag: Copy + Eq> ResourceTable<Tag> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `payload` tagged with `tag`, returning a fresh handle.
    /// Never returns a handle value currently held by another live
    /// entry (spec.md §4.2 invariant).
    pub fn add<T: Any + Send + Sync>(&mut self, tag: Tag, payload: T) -> Handle {
        let (index, generation) = match self.free_head.take() {
            Some(index) => {
                let (next_free, generation) = match &self.slots[index as usize] {
                    Slot::Vacant {
                        next_free,
                        generation,
                    } => (*next_free, *generation),
                    Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
                };
                self.free_head = next_free;
                (index, generation)
            }
            None => {
                let index = self.slots.len() as u32;
                assert!(index & !INDEX_MASK == 0, "resource table exhausted");
                self.slots.push(Slot::Vacant {
                    next_free: None,
                    generation: 0,
                });
                (index, 0)
            }
        };

        self.slots[index as usize] = Slot::Occupied {
            tag,
            generation,
            payload: Box::new(payload),
        };

        let raw = pack(index, generation);
        let handle = Handle::from_raw(raw.wrapping_add(1).max(1))
            .expect("packed handle value is non-zero");
        trace!(index, generation, "resource table: add");
        handle
    }

    fn locate(&self, handle: Handle) -> Option<(u32, u8)> {
        let raw = handle.as_u32().checked_sub(1)?;
        let (index, generation) = unpack(raw);
        if (index as usize) < self.slots.len() {
            Some((index, generation))
        } else {
            None
        }
    }

    /// Returns the tag and a typed reference to the payload, or `None`
    /// if `handle` does not currently refer to a live entry. A dead
    /// handle is not an error (spec.md §4.2 Failure semantics).
    pub fn get<T: Any>(&self, handle: Handle) -> Option<(Tag, &T)> {
        let (index, generation) = self.locate(handle)?;
        match self.slots.get(index as usize)? {
            Slot::Occupied {
                tag,
                generation: g,
                payload,
            } if *g == generation => payload.downcast_ref::<T>().map(|p| (*tag, p)),
            _ => None,
        }
    }

    /// As [`ResourceTable::get`] but only checks the tag matches
    /// `expected`, without attempting a downcast — useful when the
    /// caller just wants to validate a handle's kind.
    pub fn tag_of(&self, handle: Handle) -> Option<Tag> {
        let (index, generation) = self.locate(handle)?;
        match self.slots.get(index as usize)? {
            Slot::Occupied {
                tag, generation: g, ..
            } if *g == generation => Some(*tag),
            _ => None,
        }
    }

    pub fn get_mut<T: Any>(&mut self, handle: Handle) -> Option<(Tag, &mut T)> {
        let (index, generation) = self.locate(handle)?;
        match self.slots.get_mut(index as usize)? {
            Slot::Occupied {
                tag,
                generation: g,
                payload,
            } if *g == generation => {
                let tag = *tag;
                payload.downcast_mut::<T>().map(|p| (tag, p))
            }
            _ => None,
        }
    }

    /// Removes `handle`, dropping its payload. A no-op on a dead handle
    /// (spec.md §4.2 Failure semantics). The payload's `Drop` impl is
    /// the "release hook"; it runs exactly once, here, never again for
    /// this generation of the slot.
    pub fn remove(&mut self, handle: Handle) -> bool {
        let Some((index, generation)) = self.locate(handle) else {
            return false;
        };
        let slot = &mut self.slots[index as usize];
        match slot {
            Slot::Occupied { generation: g, .. } if *g == generation => {
                *slot = Slot::Vacant {
                    next_free: self.free_head,
                    generation: generation.wrapping_add(1),
                };
                self.free_head = Some(index);
                trace!(index, generation, "resource table: remove");
                true
            }
            _ => false,
        }
    }

    /// Drops every live entry and resets the table to empty, invoking
    /// each payload's release hook exactly once.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
    }

    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    enum Tag {
        File,
        Socket,
    }

    #[test]
    fn add_get_remove_roundtrip() {
        let mut t: ResourceTable<Tag> = ResourceTable::new();
        let h = t.add(Tag::File, 42u32);
        let (tag, v) = t.get::<u32>(h).unwrap();
        assert_eq!(tag, Tag::File);
        assert_eq!(*v, 42);
        assert!(t.remove(h));
        assert!(t.get::<u32>(h).is_none());
        // remove on a dead handle is a no-op, not an error.
        assert!(!t.remove(h));
    }

    #[test]
    fn release_hook_runs_exactly_once() {
        struct Counting(Arc<AtomicUsize>);
        impl Drop for Counting {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let mut t: ResourceTable<Tag> = ResourceTable::new();
        let h = t.add(Tag::File, Counting(counter.clone()));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        t.remove(h);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        t.remove(h);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_handle_after_reuse_is_rejected() {
        let mut t: ResourceTable<Tag> = ResourceTable::new();
        let h1 = t.add(Tag::File, 1u32);
        t.remove(h1);
        let h2 = t.add(Tag::Socket, 2u32);
        // Slot may be reused (spec.md allows this), but the stale
        // handle from before the reuse must not resolve to the new
        // entry.
        assert!(t.get::<u32>(h1).is_none());
        assert_eq!(t.get::<u32>(h2).unwrap().1, &2);
    }

    #[test]
    fn tag_mismatch_fails_downcast_naturally() {
        let mut t: ResourceTable<Tag> = ResourceTable::new();
        let h = t.add(Tag::File, 7u64);
        assert_eq!(t.tag_of(h), Some(Tag::File));
        // Wrong payload type: downcast fails regardless of tag.
        assert!(t.get::<u32>(h).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let counter = Arc::new(AtomicUsize::new(0));
        struct Counting(Arc<AtomicUsize>);
        impl Drop for Counting {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let mut t: ResourceTable<Tag> = ResourceTable::new();
        for _ in 0..5 {
            t.add(Tag::File, Counting(counter.clone()));
        }
        assert_eq!(t.len(), 5);
        t.clear();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(t.is_empty());
    }
}
