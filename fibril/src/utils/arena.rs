/// A stable handle into an [`Arena`].
///
/// The generation distinguishes a live entry from an earlier occupant of the
/// same slot, so a handle kept past [`Arena::remove`] never aliases the value
/// inserted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Index {
    slot: usize,
    generation: u32,
}

impl Index {
    /// Returns the raw slot number (useful in logs).
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

/// One slot of the arena.
struct Entry<T> {
    /// Bumped every time the slot is vacated.
    generation: u32,
    value: Option<T>,
}

/// A generational slab allocator.
///
/// An `Arena` stores values in a contiguous vector and hands out
/// [`Index`] handles that stay valid until the value is removed.
///
/// Internally, it keeps track of:
/// - the entries themselves, each tagged with a generation,
/// - a stack of free slots reused before the storage grows.
///
/// Storage grows exponentially once every slot is occupied.
pub(crate) struct Arena<T> {
    /// Storage for entries (vacant slots hold `None`).
    entries: Vec<Entry<T>>,
    /// Stack of free slots that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Arena<T> {
    /// Creates a new `Arena` with `size` preallocated vacant slots.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let arena = Arena::<i32>::new(16);
    /// ```
    pub(crate) fn new(size: usize) -> Self {
        let entries = (0..size)
            .map(|_| Entry {
                generation: 0,
                value: None,
            })
            .collect();
        let free = (0..size).rev().collect();

        Self {
            entries,
            free,
            len: 0,
        }
    }

    /// Inserts a value and returns its handle.
    ///
    /// A free slot is reused when available; otherwise the storage doubles.
    pub(crate) fn insert(&mut self, value: T) -> Index {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                let len = self.entries.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.entries.extend((len..new_len).map(|_| Entry {
                    generation: 0,
                    value: None,
                }));
                self.free.extend(((len + 1)..new_len).rev());

                len
            }
        };

        let entry = &mut self.entries[slot];
        entry.value = Some(value);
        self.len += 1;

        Index {
            slot,
            generation: entry.generation,
        }
    }

    /// Removes and returns the value behind `index`.
    ///
    /// Returns `None` if the handle is stale.
    pub(crate) fn remove(&mut self, index: Index) -> Option<T> {
        let entry = self.entries.get_mut(index.slot)?;

        if entry.generation != index.generation {
            return None;
        }

        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(index.slot);
        self.len -= 1;

        Some(value)
    }

    pub(crate) fn get(&self, index: Index) -> Option<&T> {
        self.entries
            .get(index.slot)
            .filter(|entry| entry.generation == index.generation)
            .and_then(|entry| entry.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        self.entries
            .get_mut(index.slot)
            .filter(|entry| entry.generation == index.generation)
            .and_then(|entry| entry.value.as_mut())
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
