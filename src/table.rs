use std::ops::Index;

use crate::utils::MyHash;

#[derive(Debug, Clone, Default)]
struct Entry<T> {
    value: T,
    /// Index of the next entry in the same bucket (0 = end of chain).
    next: usize,
    occupied: bool,
    /// Whether the entry is reachable through the buckets.
    hashed: bool,
}

impl<T> Entry<T> {
    fn new(value: T, hashed: bool) -> Self {
        Self {
            value,
            next: 0,
            occupied: true,
            hashed,
        }
    }
}

/// Unique table with stable indices.
///
/// Indices are handed out in increasing order and are never recycled: a
/// dropped entry stays behind as a tombstone, so a stale index can always be
/// told apart from a live one. Index 0 is a sentry and never occupied.
#[derive(Debug, Clone)]
pub struct Table<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Number of occupied cells.
    real_size: usize,
    /// Number of occupied hashed cells.
    hashed_size: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let buckets_size = 1 << bits;

        Self {
            data: vec![Entry::default()], // sentry
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
            real_size: 0,
            hashed_size: 0,
        }
    }
}

impl<T> Table<T> {
    /// Get the number of issued indices, including the sentry.
    pub fn size(&self) -> usize {
        self.data.len()
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }
    /// Get the number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Check if the cell at the given index is occupied.
    ///
    /// Out-of-range indices and the sentry are reported as free.
    pub fn is_occupied(&self, index: usize) -> bool {
        self.data.get(index).is_some_and(|e| e.occupied)
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert!(self.is_occupied(index), "Index {} is not occupied", index);
        &self.data[index].value
    }

    /// Iterate over the indices of occupied cells, in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.data.len()).filter(move |&i| self.data[i].occupied)
    }

    /// Add a new value that does not take part in hash consing.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.data.len();
        self.data.push(Entry::new(value, false));
        self.real_size += 1;
        index
    }
}

impl<T> Table<T>
where
    T: MyHash,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find the index of a hashed value, if present.
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: Eq,
    {
        let mut index = self.buckets[self.bucket_index(value)];
        while index != 0 {
            if &self.data[index].value == value {
                return Some(index);
            }
            index = self.data[index].next;
        }
        None
    }

    /// Put a value into the table and return its index.
    ///
    /// Returns the index of the existing equal value, if there is one.
    pub fn put(&mut self, value: T) -> usize
    where
        T: Eq,
    {
        if let Some(index) = self.find(&value) {
            return index;
        }

        if self.hashed_size >= 2 * self.buckets.len() {
            self.grow();
        }

        let bucket = self.bucket_index(&value);
        let index = self.data.len();
        let mut entry = Entry::new(value, true);
        // Prepend to the bucket chain.
        entry.next = self.buckets[bucket];
        self.data.push(entry);
        self.buckets[bucket] = index;
        self.real_size += 1;
        self.hashed_size += 1;
        index
    }

    /// Drop the value at the given index, leaving a tombstone behind.
    pub fn drop(&mut self, index: usize) {
        assert!(self.is_occupied(index), "Index {} is not occupied", index);

        if self.data[index].hashed {
            let bucket = self.bucket_index(&self.data[index].value);
            let next = self.data[index].next;
            if self.buckets[bucket] == index {
                self.buckets[bucket] = next;
            } else {
                let mut prev = self.buckets[bucket];
                while self.data[prev].next != index {
                    prev = self.data[prev].next;
                    assert_ne!(prev, 0, "Index {} is missing from its bucket", index);
                }
                self.data[prev].next = next;
            }
            self.hashed_size -= 1;
        }

        let entry = &mut self.data[index];
        entry.occupied = false;
        entry.hashed = false;
        entry.next = 0;
        self.real_size -= 1;
    }

    /// Double the number of buckets and relink every hashed entry.
    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        self.buckets = vec![0; size];
        self.bitmask = (size - 1) as u64;
        for index in 1..self.data.len() {
            if self.data[index].hashed {
                let bucket = self.bucket_index(&self.data[index].value);
                self.data[index].next = self.buckets[bucket];
                self.buckets[bucket] = index;
            }
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_add() {
        let mut table = Table::new(2);
        let index = table.add(Item(42));
        assert_eq!(index, 1);
        assert_eq!(table[index], Item(42));
        assert_eq!(table.find(&Item(42)), None);
    }

    #[test]
    fn test_put() {
        let mut table = Table::new(2);
        let index1 = table.put(Item(5));
        let index2 = table.put(Item(-5));
        assert_ne!(index1, index2);
        assert_eq!(table[index1], Item(5));
        assert_eq!(table[index2], Item(-5));
        assert_eq!(table.put(Item(5)), index1);
        assert_eq!(table.real_size(), 2);
    }

    #[test]
    fn test_drop_leaves_tombstone() {
        let mut table = Table::new(2);
        let index1 = table.put(Item(5));
        let index2 = table.put(Item(-5));
        table.drop(index1);
        assert!(!table.is_occupied(index1));
        assert!(table.is_occupied(index2));
        assert_eq!(table.find(&Item(5)), None);
        assert_eq!(table.find(&Item(-5)), Some(index2));

        // Indices are not recycled.
        let index3 = table.put(Item(5));
        assert_eq!(index3, 3);
        assert_eq!(table.size(), 4);
        assert_eq!(table.real_size(), 2);
    }

    #[test]
    #[should_panic(expected = "is not occupied")]
    fn test_value_of_dropped() {
        let mut table = Table::new(2);
        let index = table.put(Item(1));
        table.drop(index);
        table.value(index);
    }

    #[test]
    fn test_grow_keeps_entries() {
        let mut table = Table::new(1);
        let indices: Vec<_> = (0..100).map(|i| table.put(Item(i))).collect();
        assert!(table.num_buckets() > 2);
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(table.find(&Item(i as i32)), Some(index));
        }
    }

    #[test]
    fn test_sentry() {
        let table = Table::<Item>::new(2);
        assert!(!table.is_occupied(0));
        assert!(!table.is_occupied(17));
        assert_eq!(table.indices().count(), 0);
    }
}
