//! Fixed-capacity ring buffer.
//!
//! Storage is allocated once at construction and never grows; pushing into a
//! full buffer overwrites the oldest element. Every rolling history in the
//! crate uses this so memory stays constant regardless of sequence length.

/// Circular buffer of `Copy` values, iterated oldest to newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T: Copy> {
    slots: Vec<Option<T>>,
    // Index of the oldest element.
    head: usize,
    len: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// Creates a buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is bumped to one; callers validate sizes in their configs.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Appends a value, evicting and returning the oldest one when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let cap = self.slots.len();
        if self.len < cap {
            let idx = (self.head + self.len) % cap;
            self.slots[idx] = Some(value);
            self.len += 1;
            None
        } else {
            let evicted = self.slots[self.head].replace(value);
            self.head = (self.head + 1) % cap;
            evicted
        }
    }

    /// Element `i` counted from the oldest.
    pub fn get(&self, i: usize) -> Option<T> {
        if i >= self.len {
            return None;
        }
        self.slots[(self.head + i) % self.slots.len()]
    }

    pub fn oldest(&self) -> Option<T> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut ring = RingBuffer::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), None);
        assert!(ring.is_full());
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_overwrites_oldest() {
        let mut ring = RingBuffer::new(3);
        for v in 1..=5 {
            ring.push(v);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.oldest(), Some(3));
        assert_eq!(ring.newest(), Some(5));
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_capacity_never_grows() {
        let mut ring = RingBuffer::new(4);
        for v in 0..1000 {
            ring.push(v);
        }
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut ring = RingBuffer::new(2);
        ring.push(1.0);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.newest(), None);
        ring.push(2.0);
        assert_eq!(ring.oldest(), Some(2.0));
    }
}
