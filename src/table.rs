use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
    occupied: bool,
}

impl<T> Entry<T> {
    /// Create a new cell with the given value.
    pub fn new(value: T) -> Self {
        Self {
            value,
            next: 0,
            occupied: false,
        }
    }
}

impl<T> Default for Entry<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Hash-consing table: values are stored in a flat vector and chained through
/// `next` indices from a fixed array of buckets.
///
/// Index 0 is a sentinel and is never handed out, so `0` doubles as the
/// end-of-chain marker. The data vector grows on demand; the bucket array does not.
pub struct Table<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Index of the first *possibly* free (non-occupied) cell.
    min_free: usize,
    /// Index of the last occupied cell.
    last_index: usize,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with initial room for `2^bits` values.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data: Vec<Entry<T>> = Vec::with_capacity(capacity);
        data.resize_with(capacity.max(2), Entry::default);
        data[0].occupied = true; // Set 0th cell as occupied (sentry).

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            buckets,
            bitmask,
            min_free: 1,
            last_index: 0,
            real_size: 0,
        }
    }

    /// Allocate a new cell in the table and return its index.
    pub(crate) fn alloc(&mut self) -> usize {
        let index = (self.min_free..=self.last_index)
            .find(|&i| !self.data[i].occupied)
            .unwrap_or_else(|| {
                self.last_index += 1;
                self.last_index
            });

        if index >= self.capacity() {
            let grown = self.capacity() * 2;
            self.data.resize_with(grown, Entry::default);
        }

        self.data[index].occupied = true;
        self.min_free = index + 1;
        self.real_size += 1;

        index
    }

    /// Add a new value to the table and return its index.
    ///
    /// The value is *not* linked into any bucket; use [`Table::put`] for hash-consing.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.alloc();

        self.data[index].value = value;
        self.data[index].next = 0;

        index
    }

    /// Drop the value at the given index.
    ///
    /// The caller is responsible for unlinking it from its bucket chain first.
    pub fn drop(&mut self, index: usize) {
        assert_ne!(index, 0, "Index is 0");
        assert!(self.data[index].occupied, "Index {} is not occupied", index);

        let entry = &mut self.data[index];
        entry.occupied = false;
        entry.next = 0;
        entry.value = T::default();
        self.min_free = min(self.min_free, index);
        self.real_size -= 1;
    }
}

impl<T> Table<T> {
    /// Get the number of allocated cells.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
    /// Get the index of the last occupied.
    pub fn size(&self) -> usize {
        self.last_index
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        assert!(self.data[index].occupied, "Index {} is not occupied", index);
        &self.data[index].value
    }

    /// Check if the cell at the given index is occupied.
    pub fn is_occupied(&self, index: usize) -> bool {
        assert_ne!(index, 0, "Index is 0");
        index < self.data.len() && self.data[index].occupied
    }
    /// Get the index of the next cell.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }
    /// Set the index of the next cell.
    pub fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next = next;
    }

    /// Iterate over the indices of all occupied cells.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.last_index).filter(|&i| self.data[i].occupied)
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find the index of a value equal to the given one, without inserting it.
    pub fn find(&self, value: &T) -> Option<usize> {
        let mut index = self.buckets[self.bucket_index(value)];
        while index != 0 {
            if &self.data[index].value == value {
                return Some(index);
            }
            index = self.data[index].next;
        }
        None
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq + Default,
{
    /// Put a new value into the table and return its index.
    ///
    /// If an equal value is already present, its index is returned instead.
    pub fn put(&mut self, value: T) -> usize {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create new node and put it into the bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                // The node already exists.
                return index;
            }

            let next = self.next(index);

            if next == 0 {
                // Create new node and append it to the bucket.
                let i = self.add(value);
                self.set_next(index, i);
                return i;
            } else {
                // Go to the next node in the bucket.
                index = next;
            }
        }
    }

    /// Drop every chained value for which `keep` returns `false`, relinking the chains.
    ///
    /// Returns the number of dropped values. Indices of kept values are unchanged.
    pub fn sweep(&mut self, mut keep: impl FnMut(usize, &T) -> bool) -> usize {
        let mut dropped = 0;

        for bucket in 0..self.buckets.len() {
            let mut index = self.buckets[bucket];
            let mut prev = 0;

            while index != 0 {
                let next = self.data[index].next;
                if keep(index, &self.data[index].value) {
                    prev = index;
                } else {
                    if prev == 0 {
                        self.buckets[bucket] = next;
                    } else {
                        self.data[prev].next = next;
                    }
                    self.drop(index);
                    dropped += 1;
                }
                index = next;
            }
        }

        dropped
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
