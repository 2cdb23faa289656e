//! Slab of nodes addressed by stable handles, with a free list for reuse.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Handle(usize);

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<usize> },
}

#[derive(Debug, Clone)]
pub(crate) struct Pool<T> {
    slots: Vec<Slot<T>>,
    first_free: Option<usize>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            slots: vec![],
            first_free: None,
            len: 0,
        }
    }
}

impl<T> Pool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        match self.first_free {
            Some(index) => {
                if let Slot::Vacant { next_free } = self.slots[index] {
                    self.first_free = next_free;
                }
                self.slots[index] = Slot::Occupied(value);
                Handle(index)
            }
            None => {
                self.slots.push(Slot::Occupied(value));
                Handle(self.slots.len() - 1)
            }
        }
    }

    /// Frees the slot of `handle`, which must be occupied.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.0)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }
        let vacant = Slot::Vacant {
            next_free: self.first_free,
        };
        let Slot::Occupied(value) = std::mem::replace(slot, vacant) else {
            return None;
        };
        self.first_free = Some(handle.0);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.slots.get_mut(handle.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.first_free = None;
        self.len = 0;
    }
}

impl<T> std::ops::Index<Handle> for Pool<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        self.get(handle).expect("Handle points to a freed slot")
    }
}

impl<T> std::ops::IndexMut<Handle> for Pool<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        self.get_mut(handle).expect("Handle points to a freed slot")
    }
}

#[cfg(test)]
mod tests {
    use super::Pool;

    #[test]
    fn test_slots_are_reused() {
        let mut pool = Pool::default();
        let a = pool.insert('a');
        let b = pool.insert('b');
        assert_eq!(pool.remove(a), Some('a'));
        assert_eq!(pool.remove(a), None);
        let c = pool.insert('c');
        assert_eq!(c, a);
        assert_eq!(pool.get(b), Some(&'b'));
        assert_eq!(pool.get(c), Some(&'c'));
        assert_eq!(pool.len(), 2);
    }
}
