use fecmux_core::GlobalIndex;

const HALF_RANGE: u32 = 1 << 31;

/// Compares global indices with wrapping arithmetic.
pub fn sequence_greater_than(s1: GlobalIndex, s2: GlobalIndex) -> bool {
    ((s1 > s2) && (s1 - s2 <= HALF_RANGE)) || ((s1 < s2) && (s2 - s1 > HALF_RANGE))
}

/// Compares global indices with wrapping arithmetic.
pub fn sequence_less_than(s1: GlobalIndex, s2: GlobalIndex) -> bool {
    sequence_greater_than(s2, s1)
}

/// Monotonic counter handing out global sequence numbers.
///
/// Never resets during its owner's lifetime. It wraps on u32 overflow, which is
/// harmless because reordering windows are tiny compared to the counter range.
#[derive(Debug, Default, Clone)]
pub struct GlobalSequence {
    next: GlobalIndex,
}

impl GlobalSequence {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter starting at `start`.
    pub fn starting_at(start: GlobalIndex) -> Self {
        Self { next: start }
    }

    /// Returns the next index and advances the counter.
    pub fn next_index(&mut self) -> GlobalIndex {
        let idx = self.next;
        self.next = self.next.wrapping_add(1);
        idx
    }

    /// Returns the index the next call to `next_index` will hand out.
    pub fn peek(&self) -> GlobalIndex {
        self.next
    }
}
