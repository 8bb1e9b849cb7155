///
/// Slot table backing every integer handle.
///
/// A handle is an index into `slots`. Allocation takes the lowest free slot;
/// a full table doubles its capacity and hands out the first slot of the new
/// region. Slots are never compacted or renumbered, so a handle keeps naming
/// the same resource until it is released, after which the index is reused.
///
/// Slot states:
/// - Empty: free for allocation, invalid for lookup
/// - Reserved: allocated but not yet holding a resource (an open or prepare
///   in progress, or a resource temporarily taken out for a fallible close)
/// - Occupied: holds a live resource
///

use tracing::debug;

#[derive(Debug)]
enum Slot<T> {
    Empty,
    Reserved,
    Occupied(T),
}

impl<T> Slot<T> {
    fn is_free(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// Why a host-supplied index does not resolve to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    OutOfRange { index: i64, capacity: usize },
    Empty { index: i64 },
}

#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
}

impl<T> HandleTable<T> {
    /// Create a table with `capacity` empty slots (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Empty);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve the lowest free slot, doubling the table when none is free
    pub fn allocate(&mut self) -> usize {
        if let Some(index) = self.slots.iter().position(Slot::is_free) {
            self.slots[index] = Slot::Reserved;
            return index;
        }
        let old = self.slots.len();
        let new = old * 2;
        self.slots.resize_with(new, || Slot::Empty);
        debug!(old_capacity = old, new_capacity = new, "handle table grown");
        self.slots[old] = Slot::Reserved;
        old
    }

    /// Place a resource into a slot returned by `allocate`
    pub fn fill(&mut self, index: usize, value: T) {
        debug_assert!(matches!(self.slots[index], Slot::Reserved));
        self.slots[index] = Slot::Occupied(value);
    }

    pub fn insert(&mut self, value: T) -> usize {
        let index = self.allocate();
        self.fill(index, value);
        index
    }

    /// Allocate a slot and fill it from `create`; on failure the slot is
    /// released before the error is returned.
    pub fn try_insert_with<E>(
        &mut self,
        create: impl FnOnce(usize) -> Result<T, E>,
    ) -> Result<usize, E> {
        let index = self.allocate();
        match create(index) {
            Ok(value) => {
                self.fill(index, value);
                Ok(index)
            }
            Err(e) => {
                self.slots[index] = Slot::Empty;
                Err(e)
            }
        }
    }

    /// Mark a slot empty, returning the resource it held
    pub fn release(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Empty) {
            Slot::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Validate a host-supplied index: in range, then occupied
    pub fn check(&self, index: i64) -> Result<usize, SlotError> {
        let capacity = self.slots.len();
        let i = usize::try_from(index)
            .ok()
            .filter(|&i| i < capacity)
            .ok_or(SlotError::OutOfRange { index, capacity })?;
        match self.slots[i] {
            Slot::Occupied(_) => Ok(i),
            _ => Err(SlotError::Empty { index }),
        }
    }

    pub fn get(&self, index: i64) -> Result<&T, SlotError> {
        let i = self.check(index)?;
        match &self.slots[i] {
            Slot::Occupied(value) => Ok(value),
            _ => Err(SlotError::Empty { index }),
        }
    }

    pub fn get_mut(&mut self, index: i64) -> Result<&mut T, SlotError> {
        let i = self.check(index)?;
        match &mut self.slots[i] {
            Slot::Occupied(value) => Ok(value),
            _ => Err(SlotError::Empty { index }),
        }
    }

    /// Remove a resource but keep its slot reserved, so it can be put back
    /// with `restore` if the operation it was taken for fails.
    pub fn take(&mut self, index: i64) -> Result<(usize, T), SlotError> {
        let i = self.check(index)?;
        match std::mem::replace(&mut self.slots[i], Slot::Reserved) {
            Slot::Occupied(value) => Ok((i, value)),
            _ => unreachable!("check() returned an unoccupied slot"),
        }
    }

    pub fn restore(&mut self, index: usize, value: T) {
        self.fill(index, value);
    }

    /// Free a slot left reserved by `take`
    pub fn discard(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Slot::Empty;
        }
    }

    /// Occupied slots in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| match s {
            Slot::Occupied(value) => Some((i, value)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_lowest_free_slot() {
        let mut table = HandleTable::with_capacity(4);
        assert_eq!(table.insert("a"), 0);
        assert_eq!(table.insert("b"), 1);
        assert_eq!(table.insert("c"), 2);

        assert_eq!(table.release(1), Some("b"));
        assert_eq!(table.insert("d"), 1);
        assert_eq!(table.insert("e"), 3);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_growth_doubles_and_preserves_content() {
        let mut table = HandleTable::with_capacity(2);
        table.insert(10);
        table.insert(20);
        assert_eq!(table.capacity(), 2);

        assert_eq!(table.insert(30), 2);
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.get(0), Ok(&10));
        assert_eq!(table.get(1), Ok(&20));
        assert_eq!(table.get(2), Ok(&30));
        assert_eq!(table.get(3), Err(SlotError::Empty { index: 3 }));

        table.insert(40);
        assert_eq!(table.insert(50), 4);
        assert_eq!(table.capacity(), 8);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut table = HandleTable::with_capacity(0);
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.insert(()), 0);
        assert_eq!(table.insert(()), 1);
        assert_eq!(table.capacity(), 2);
    }

    #[test]
    fn test_range_and_empty_errors() {
        let mut table: HandleTable<u8> = HandleTable::with_capacity(16);
        assert_eq!(
            table.get(99),
            Err(SlotError::OutOfRange { index: 99, capacity: 16 })
        );
        assert_eq!(
            table.get(-1),
            Err(SlotError::OutOfRange { index: -1, capacity: 16 })
        );
        assert_eq!(table.get(3), Err(SlotError::Empty { index: 3 }));
        assert!(table.get_mut(16).is_err());
    }

    #[test]
    fn test_reserved_slot_is_not_resolvable_but_not_reused() {
        let mut table = HandleTable::with_capacity(4);
        let i = table.allocate();
        assert_eq!(i, 0);
        assert_eq!(table.get(0), Err(SlotError::Empty { index: 0 }));
        assert_eq!(table.allocate(), 1);
        table.fill(0, 'x');
        assert_eq!(table.get(0), Ok(&'x'));
    }

    #[test]
    fn test_failed_create_releases_slot() {
        let mut table: HandleTable<&str> = HandleTable::with_capacity(2);
        let err = table.try_insert_with(|_| Err::<&str, _>("boom"));
        assert_eq!(err, Err("boom"));
        assert!(table.is_empty());
        assert_eq!(table.try_insert_with(|i| Ok::<_, ()>(if i == 0 { "zero" } else { "other" })), Ok(0));
        assert_eq!(table.get(0), Ok(&"zero"));
    }

    #[test]
    fn test_take_and_restore_keep_the_index() {
        let mut table = HandleTable::with_capacity(2);
        table.insert("conn");
        let (i, value) = table.take(0).unwrap();
        assert_eq!((i, value), (0, "conn"));
        assert!(table.get(0).is_err());
        assert_eq!(table.allocate(), 1);
        table.restore(i, value);
        assert_eq!(table.get(0), Ok(&"conn"));

        let (i, _) = table.take(0).unwrap();
        table.discard(i);
        assert_eq!(table.allocate(), 0);
    }

    #[test]
    fn test_iter_yields_occupied_in_order() {
        let mut table = HandleTable::with_capacity(4);
        table.insert('a');
        table.insert('b');
        table.insert('c');
        table.release(1);
        let seen: Vec<_> = table.iter().map(|(i, v)| (i, *v)).collect();
        assert_eq!(seen, vec![(0, 'a'), (2, 'c')]);
    }
}
