//! Lower-bound search over ascending sequences.

/// Returns the index in `sequence` for which all elements at or after the
/// index are at least `min`. If every element is less than `min`, returns
/// `sequence.len()`.
///
/// `sequence` must be sorted ascending. Duplicates resolve to the leftmost
/// matching position.
pub fn search<T: Ord>(sequence: &[T], min: &T) -> usize {
    // Closed range [lo, hi]; `hi` goes negative when everything is >= min.
    let mut lo: isize = 0;
    let mut hi: isize = sequence.len() as isize - 1;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        if sequence[mid as usize] >= *min {
            hi = mid - 1;
        } else {
            lo = mid + 1;
        }
    }

    (lo as usize).min(sequence.len())
}
