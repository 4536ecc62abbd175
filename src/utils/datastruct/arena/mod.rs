/// Ordered pool, fixed once collected
///
/// Values keep their insertion position for the arena's lifetime, so an
/// `ArenaSlot` stays valid and "everything after this slot" is well defined.
/// Nothing is ever removed; the arena is built once and then shared read-only.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    pool: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaSlot {
    idx: u32,
}

impl ArenaSlot {
    pub fn new(index: usize) -> Self {
        Self { idx: index as u32 }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.idx as usize
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { pool: Vec::new() }
    }

    #[inline]
    pub fn get(&self, slot: &ArenaSlot) -> Option<&T> {
        self.pool.get(slot.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// every slot in insertion order
    pub fn slots(&self) -> impl Iterator<Item = ArenaSlot> + '_ {
        (0..self.pool.len()).map(ArenaSlot::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArenaSlot, &T)> + '_ {
        self.pool.iter().enumerate().map(|(i, v)| (ArenaSlot::new(i), v))
    }

    /// Values strictly after `slot`, in order.
    /// Never rewinds to the start of the pool.
    pub fn iter_after(&self, slot: &ArenaSlot) -> impl Iterator<Item = (ArenaSlot, &T)> + '_ {
        let start = (slot.index() + 1).min(self.pool.len());
        self.pool[start..]
            .iter()
            .enumerate()
            .map(move |(i, v)| (ArenaSlot::new(start + i), v))
    }
}

impl<T> FromIterator<T> for Arena<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { pool: iter.into_iter().collect() }
    }
}
