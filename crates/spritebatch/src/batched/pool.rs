//! Buffers pooled by power-of-two size class.
//!
//! A request for `n` elements is rounded up to a power-of-two number of
//! blocks, and the base-2 log of that block count selects the slot. A slot
//! is allocated on first use and then kept for the pool's lifetime, so the
//! pool holds its high-water mark but produces no garbage in steady state.

/// Vertex granularity of attribute buffer size classes.
pub const ATTRIBUTE_BLOCK: usize = 8;

/// Index granularity of index buffer size classes.
pub const INDEX_BLOCK: usize = 12;

/// Slot arena keyed by size class.
#[derive(Debug)]
pub struct SizeClassPool<T> {
    block: usize,
    slots: Vec<Option<T>>,
}

impl<T> SizeClassPool<T> {
    pub fn new(block: usize) -> Self {
        assert!(block > 0, "size class block must be non-zero");
        Self {
            block,
            slots: Vec::new(),
        }
    }

    /// Size class serving `count` elements.
    pub fn class_of(&self, count: usize) -> usize {
        count
            .div_ceil(self.block)
            .max(1)
            .next_power_of_two()
            .trailing_zeros() as usize
    }

    /// Element capacity of buffers in `class`.
    pub fn class_capacity(&self, class: usize) -> usize {
        self.block << class
    }

    /// Return the pooled value for `count` elements, creating it with
    /// `create(capacity)` if its slot is empty.
    pub fn get_or_insert_with(&mut self, count: usize, create: impl FnOnce(usize) -> T) -> &mut T {
        let class = self.class_of(count);
        if self.slots.len() <= class {
            self.slots.resize_with(class + 1, || None);
        }

        let capacity = self.class_capacity(class);
        self.slots[class].get_or_insert_with(|| {
            tracing::debug!(class, capacity, "allocating pooled buffer");
            create(capacity)
        })
    }

    /// Number of allocated slots.
    pub fn allocated(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Drop every pooled value.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_rounding() {
        let pool: SizeClassPool<()> = SizeClassPool::new(ATTRIBUTE_BLOCK);
        assert_eq!(pool.class_of(0), 0);
        assert_eq!(pool.class_of(1), 0);
        assert_eq!(pool.class_of(8), 0);
        assert_eq!(pool.class_of(9), 1);
        assert_eq!(pool.class_of(16), 1);
        assert_eq!(pool.class_of(17), 2);
        assert_eq!(pool.class_of(33), 3);
        assert_eq!(pool.class_capacity(3), 64);
    }

    #[test]
    fn test_index_classes_use_twelve_index_blocks() {
        let pool: SizeClassPool<()> = SizeClassPool::new(INDEX_BLOCK);
        assert_eq!(pool.class_of(12), 0);
        assert_eq!(pool.class_of(13), 1);
        assert_eq!(pool.class_capacity(1), 24);
        assert_eq!(pool.class_of(6 * 2048), 10);
    }

    #[test]
    fn test_slot_is_reused_for_smaller_requests() {
        let mut pool = SizeClassPool::new(ATTRIBUTE_BLOCK);
        let first = pool.get_or_insert_with(10, |cap| vec![0u8; cap]).as_ptr();
        let second = pool
            .get_or_insert_with(12, |_| panic!("slot should be reused"))
            .as_ptr();
        assert_eq!(first, second);
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn test_larger_request_gets_new_slot() {
        let mut pool = SizeClassPool::new(ATTRIBUTE_BLOCK);
        let small = pool.get_or_insert_with(4, |cap| vec![0u8; cap]).len();
        let large = pool.get_or_insert_with(100, |cap| vec![0u8; cap]).len();
        assert_eq!(small, 8);
        assert_eq!(large, 128);
        assert_eq!(pool.allocated(), 2);

        pool.clear();
        assert_eq!(pool.allocated(), 0);
    }
}
