//! Interval arithmetic shared by the prefix and range allocators.
//!
//! Intervals are inclusive `[start, last]` pairs over `u128`, which covers
//! IPv4 (widened), IPv6 and integer ranges. Keeping the last covered value
//! instead of an exclusive end means a block ending at `u128::MAX` never
//! overflows.

use std::cmp::Ordering;

use super::count::{checked_sum, Count};

/// An inclusive interval of allocated or allocatable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: u128,
    pub last: u128,
}

impl Interval {
    /// Creates an interval; `None` if `last < start`.
    pub fn new(start: u128, last: u128) -> Option<Self> {
        if last < start {
            None
        } else {
            Some(Interval { start, last })
        }
    }

    /// The aligned block of `2^host_bits` values starting at `start`.
    ///
    /// `None` when the block would run past `u128::MAX`.
    pub fn block(start: u128, host_bits: u32) -> Option<Self> {
        let last = start.checked_add(host_mask(host_bits))?;
        Some(Interval { start, last })
    }

    /// Number of values covered.
    pub fn width(&self) -> Count {
        // last - start <= u128::MAX, so adding one is at most 2^128
        Count::new(self.last - self.start)
            .checked_add(Count::ONE)
            .unwrap_or(Count::MAX)
    }

    pub fn contains(&self, value: u128) -> bool {
        self.start <= value && value <= self.last
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start <= other.last && other.start <= self.last
    }

    pub fn encloses(&self, other: &Interval) -> bool {
        self.start <= other.start && other.last <= self.last
    }
}

/// `2^host_bits - 1`: the mask of host bits below a prefix boundary.
pub fn host_mask(host_bits: u32) -> u128 {
    match host_bits {
        0 => 0,
        1..=127 => (1u128 << host_bits) - 1,
        _ => u128::MAX,
    }
}

/// Width of a block with `total_bits - mask` host bits.
pub fn width(mask: u32, total_bits: u32) -> Option<Count> {
    Count::pow2(total_bits.checked_sub(mask)?)
}

/// Orders intervals by their last covered value.
pub fn compare_by_end(a: &Interval, b: &Interval) -> Ordering {
    a.last.cmp(&b.last)
}

/// Sum of widths; `None` if it would exceed 2^128.
pub fn capacity(intervals: &[Interval]) -> Option<Count> {
    checked_sum(intervals.iter().map(Interval::width))
}

/// Rounds `value` up to the next multiple of `2^host_bits`.
fn align_up(value: u128, host_bits: u32) -> Option<u128> {
    let mask = host_mask(host_bits);
    if value & mask == 0 {
        Some(value)
    } else {
        (value | mask).checked_add(1)
    }
}

/// Finds the first free start inside `root` with room for `required` values.
///
/// `sorted` must be ordered by [`compare_by_end`] and non-overlapping. When
/// `align_bits` is set every candidate start is rounded up to a multiple of
/// `2^align_bits`, as prefixes must sit on their own mask boundary.
pub fn find_gap(
    sorted: &[Interval],
    required: Count,
    root: Interval,
    align_bits: Option<u32>,
) -> Option<u128> {
    if required.is_zero() {
        return None;
    }
    let align = |value: u128| match align_bits {
        Some(bits) => align_up(value, bits),
        None => Some(value),
    };
    let fits = |candidate: u128, limit: u128| {
        candidate <= limit && Count::new(limit - candidate).checked_add(Count::ONE) >= Some(required)
    };

    // `None` once the cursor moves past u128::MAX
    let mut cursor = Some(root.start);
    for allocated in sorted {
        let candidate = align(cursor?)?;
        if candidate > root.last {
            return None;
        }
        if allocated.start > candidate {
            let limit = (allocated.start - 1).min(root.last);
            if fits(candidate, limit) {
                return Some(candidate);
            }
        }
        let next = allocated.last.checked_add(1);
        cursor = match (cursor, next) {
            (Some(current), Some(next)) => Some(current.max(next)),
            _ => None,
        };
    }

    let candidate = align(cursor?)?;
    if fits(candidate, root.last) {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: u128, last: u128) -> Interval {
        Interval::new(start, last).unwrap()
    }

    #[test]
    fn test_width_of_full_space() {
        assert_eq!(iv(0, u128::MAX).width(), Count::MAX);
        assert_eq!(iv(5, 5).width(), Count::ONE);
        assert_eq!(width(0, 128), Some(Count::MAX));
        assert_eq!(width(8, 32), Some(Count::new(16_777_216)));
        assert_eq!(width(33, 32), None);
    }

    #[test]
    fn test_block_and_host_mask() {
        assert_eq!(host_mask(0), 0);
        assert_eq!(host_mask(4), 15);
        assert_eq!(host_mask(128), u128::MAX);
        assert_eq!(Interval::block(16, 4), Some(iv(16, 31)));
        assert_eq!(Interval::block(u128::MAX, 1), None);
    }

    #[test]
    fn test_compare_by_end() {
        let mut intervals = vec![iv(32, 63), iv(0, 15), iv(16, 17)];
        intervals.sort_by(compare_by_end);
        assert_eq!(intervals, vec![iv(0, 15), iv(16, 17), iv(32, 63)]);
        assert_eq!(compare_by_end(&iv(0, 7), &iv(4, 7)), Ordering::Equal);
    }

    #[test]
    fn test_capacity_sums_widths() {
        assert_eq!(capacity(&[iv(0, 15), iv(16, 17)]), Some(Count::new(18)));
        assert_eq!(capacity(&[]), Some(Count::ZERO));
    }

    #[test]
    fn test_find_gap_empty_root() {
        let root = iv(0, 255);
        assert_eq!(find_gap(&[], Count::new(16), root, Some(4)), Some(0));
        assert_eq!(find_gap(&[], Count::new(256), root, Some(8)), Some(0));
        assert_eq!(find_gap(&[], Count::new(257), root, Some(9)), None);
    }

    #[test]
    fn test_find_gap_before_first_interval() {
        let root = iv(0, 255);
        assert_eq!(find_gap(&[iv(16, 31)], Count::new(16), root, Some(4)), Some(0));
    }

    #[test]
    fn test_find_gap_aligns_after_interval() {
        let root = iv(0, 255);
        // a /31 at 16 pushes a /29 request to 24
        let allocated = [iv(0, 15), iv(16, 17), iv(32, 63)];
        assert_eq!(find_gap(&allocated, Count::new(8), root, Some(3)), Some(24));
        // unaligned search takes the first free value
        assert_eq!(find_gap(&allocated, Count::new(8), root, None), Some(18));
    }

    #[test]
    fn test_find_gap_respects_root_end() {
        let root = iv(100, 199);
        assert_eq!(find_gap(&[iv(100, 189)], Count::new(10), root, None), Some(190));
        assert_eq!(find_gap(&[iv(100, 189)], Count::new(11), root, None), None);
        // an interval beyond the root does not open a gap outside it
        assert_eq!(find_gap(&[iv(100, 195), iv(300, 310)], Count::new(10), root, None), None);
    }

    #[test]
    fn test_find_gap_at_top_of_space() {
        let root = iv(0, u128::MAX);
        let allocated = [iv(0, u128::MAX - 1)];
        assert_eq!(find_gap(&allocated, Count::ONE, root, None), Some(u128::MAX));
        let full = [iv(0, u128::MAX)];
        assert_eq!(find_gap(&full, Count::ONE, root, None), None);
        assert_eq!(find_gap(&[], Count::MAX, root, Some(128)), Some(0));
    }
}
