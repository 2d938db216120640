/// Marks the absence of a neighbour in the recency list
const NIL: usize = usize::MAX;

#[derive(Debug, Copy, Clone)]
struct Slot {
    tag: u32,
    prev: usize,
    next: usize,
}

/// The resident blocks of a single cache set, ordered by recency of use
///
/// Blocks live in a small arena owned by the set and are linked into a doubly linked list through
/// indices into that arena, front being the most recently used block and rear the least recently
/// used. Slots freed by invalidation are kept on a free list and reused by later insertions, so the
/// arena never grows past the associativity
///
/// Presence in the set is validity, there is no separate valid bit
#[derive(Debug, Clone)]
pub struct LruSet {
    slots: Vec<Slot>,
    free: Vec<usize>,
    front: usize,
    rear: usize,
    len: usize,
    capacity: usize,
}

impl LruSet {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "a set must hold at least one block");
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            front: NIL,
            rear: NIL,
            len: 0,
            capacity,
        }
    }

    /// Finds the recency position of a tag, 0 being the most recently used
    ///
    /// # Arguments
    ///
    /// * `tag`: The tag to look for
    ///
    /// returns: Option<usize>, None if the tag is not resident
    pub fn find(&self, tag: u32) -> Option<usize> {
        self.iter().position(|resident| resident == tag)
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.locate(tag).is_some()
    }

    /// Moves a resident tag to the most recently used position, keeping the relative order of the
    /// other blocks
    ///
    /// This doubles as the lookup on the hit path: it returns false, changing nothing, when the tag
    /// isn't resident
    pub fn promote(&mut self, tag: u32) -> bool {
        let Some(index) = self.locate(tag) else {
            return false;
        };
        if index != self.front {
            self.unlink(index);
            self.link_front(index);
        }
        true
    }

    /// Inserts a tag at the most recently used position, evicting the least recently used block
    /// first if the set is full
    ///
    /// The caller must have checked the tag isn't already resident, a duplicate is a defect in the
    /// caller rather than something to recover from
    ///
    /// # Arguments
    ///
    /// * `tag`: The tag of the incoming block
    ///
    /// returns: Option<u32>, the tag of the evicted block if there was one
    pub fn insert(&mut self, tag: u32) -> Option<u32> {
        debug_assert!(!self.contains(tag), "tag {tag:#x} is already resident in the set");
        let mut evicted = None;
        let index = if self.len == self.capacity {
            let victim = self.rear;
            self.unlink(victim);
            evicted = Some(self.slots[victim].tag);
            victim
        } else if let Some(index) = self.free.pop() {
            index
        } else {
            self.slots.push(Slot { tag, prev: NIL, next: NIL });
            self.slots.len() - 1
        };
        self.slots[index].tag = tag;
        self.link_front(index);
        evicted
    }

    /// Removes a tag if it is resident. Absent tags are not an error
    ///
    /// returns: bool, whether a block was removed
    pub fn remove(&mut self, tag: u32) -> bool {
        match self.locate(tag) {
            Some(index) => {
                self.unlink(index);
                self.free.push(index);
                true
            }
            None => false,
        }
    }

    /// The most recently used tag
    pub fn most_recent(&self) -> Option<u32> {
        (self.front != NIL).then(|| self.slots[self.front].tag)
    }

    /// The least recently used tag, which is the next to be evicted when the set is full
    pub fn least_recent(&self) -> Option<u32> {
        (self.rear != NIL).then(|| self.slots[self.rear].tag)
    }

    /// Iterates over resident tags from most to least recently used
    pub fn iter(&self) -> Iter<'_> {
        Iter { set: self, current: self.front }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Walks the list in both directions and checks it is consistent: every block's neighbours
    /// point back at it, front and rear are the two ends, the length matches, the set is within
    /// capacity, and no tag appears twice
    pub fn is_consistent(&self) -> bool {
        let mut seen = Vec::with_capacity(self.len);
        let mut previous = NIL;
        let mut current = self.front;
        while current != NIL {
            let slot = &self.slots[current];
            if slot.prev != previous || seen.contains(&slot.tag) || seen.len() >= self.capacity {
                return false;
            }
            seen.push(slot.tag);
            previous = current;
            current = slot.next;
        }
        previous == self.rear && seen.len() == self.len
    }

    fn locate(&self, tag: u32) -> Option<usize> {
        let mut current = self.front;
        while current != NIL {
            let slot = &self.slots[current];
            if slot.tag == tag {
                return Some(current);
            }
            current = slot.next;
        }
        None
    }

    fn unlink(&mut self, index: usize) {
        let Slot { prev, next, .. } = self.slots[index];
        if prev == NIL {
            self.front = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.rear = prev;
        } else {
            self.slots[next].prev = prev;
        }
        self.len -= 1;
    }

    fn link_front(&mut self, index: usize) {
        self.slots[index].prev = NIL;
        self.slots[index].next = self.front;
        if self.front == NIL {
            self.rear = index;
        } else {
            self.slots[self.front].prev = index;
        }
        self.front = index;
        self.len += 1;
    }
}

/// Iterator over the tags of an [`LruSet`], most recently used first
pub struct Iter<'a> {
    set: &'a LruSet,
    current: usize,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current == NIL {
            return None;
        }
        let slot = &self.set.slots[self.current];
        self.current = slot.next;
        Some(slot.tag)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn tags(set: &LruSet) -> Vec<u32> {
        set.iter().collect()
    }

    fn filled(tags: &[u32], capacity: usize) -> LruSet {
        let mut set = LruSet::new(capacity);
        for tag in tags {
            assert_eq!(set.insert(*tag), None);
        }
        set
    }

    #[test]
    fn insert_orders_most_recent_first() {
        let set = filled(&[1, 2, 3], 4);
        assert_eq!(tags(&set), vec![3, 2, 1]);
        assert_eq!(set.most_recent(), Some(3));
        assert_eq!(set.least_recent(), Some(1));
        assert_eq!(set.find(2), Some(1));
        assert_eq!(set.find(9), None);
        assert!(set.is_consistent());
    }

    #[test]
    fn full_set_evicts_first_inserted() {
        let mut set = filled(&[10, 20, 30, 40], 4);
        assert!(set.is_full());
        assert_eq!(set.insert(50), Some(10));
        assert_eq!(tags(&set), vec![50, 40, 30, 20]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn promote_protects_from_eviction() {
        let mut set = filled(&[10, 20, 30, 40], 4);
        assert!(set.promote(10));
        assert_eq!(tags(&set), vec![10, 40, 30, 20]);
        assert_eq!(set.insert(50), Some(20));
        assert!(set.contains(10));
    }

    #[test]
    fn promote_keeps_relative_order_of_others() {
        let mut set = filled(&[1, 2, 3, 4, 5], 5);
        assert!(set.promote(3));
        assert_eq!(tags(&set), vec![3, 5, 4, 2, 1]);
        assert!(set.promote(3));
        assert_eq!(tags(&set), vec![3, 5, 4, 2, 1]);
        assert!(!set.promote(42));
        assert_eq!(tags(&set), vec![3, 5, 4, 2, 1]);
        assert!(set.is_consistent());
    }

    #[test]
    fn remove_front_middle_and_rear() {
        let mut set = filled(&[1, 2, 3, 4, 5], 5);
        assert!(set.remove(5));
        assert_eq!(tags(&set), vec![4, 3, 2, 1]);
        assert!(set.is_consistent());
        assert!(set.remove(1));
        assert_eq!(tags(&set), vec![4, 3, 2]);
        assert_eq!(set.least_recent(), Some(2));
        assert!(set.is_consistent());
        assert!(set.remove(3));
        assert_eq!(tags(&set), vec![4, 2]);
        assert!(set.is_consistent());
        assert!(!set.remove(3));
        assert!(set.remove(4));
        assert!(set.remove(2));
        assert!(set.is_empty());
        assert_eq!(set.most_recent(), None);
        assert_eq!(set.least_recent(), None);
        assert!(set.is_consistent());
    }

    #[test]
    fn removal_frees_room_without_eviction() {
        let mut set = filled(&[1, 2], 2);
        assert!(set.remove(1));
        assert_eq!(set.insert(3), None);
        assert_eq!(tags(&set), vec![3, 2]);
        assert_eq!(set.insert(4), Some(2));
    }

    #[test]
    fn direct_mapped_set_always_replaces() {
        let mut set = LruSet::new(1);
        assert_eq!(set.insert(7), None);
        assert_eq!(set.insert(8), Some(7));
        assert_eq!(set.insert(9), Some(8));
        assert_eq!(tags(&set), vec![9]);
    }

    #[test]
    fn links_survive_mixed_operations() {
        let mut set = LruSet::new(4);
        let mut rng = StdRng::seed_from_u64(0x2545_F491);
        for _ in 0..10_000 {
            let tag = rng.random_range(0..8u32);
            match rng.random_range(0..3u32) {
                0 => {
                    set.remove(tag);
                }
                1 => {
                    set.promote(tag);
                }
                _ => {
                    if !set.promote(tag) {
                        set.insert(tag);
                    }
                    assert_eq!(set.most_recent(), Some(tag));
                }
            }
            assert!(set.is_consistent());
            assert!(set.len() <= set.capacity());
        }
    }
}
