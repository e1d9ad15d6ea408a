use std::ops::Range;

use fastrand::Rng;

pub(crate) fn usize_range(rng: &mut Rng, range: Range<usize>) -> usize {
    rng.usize(range)
}

pub(crate) fn usize_range_excl(rng: &mut Rng, range: Range<usize>, exclude: usize) -> usize {
    assert!(range.start < range.end);
    let len = range.end - range.start;
    assert!(len > 1);
    if exclude < range.start || exclude >= range.end {
        usize_range(rng, range)
    } else {
        let exclude_idx = exclude - range.start;
        let r = rng.usize(0..(len - 1));
        range.start + if r >= exclude_idx { r + 1 } else { r }
    }
}

pub(crate) fn shuffle<T>(rng: &mut Rng, values: &mut [T]) {
    if values.len() <= 1 {
        return;
    }
    for i in (1..values.len()).rev() {
        let j = rng.usize(0..=i);
        values.swap(i, j);
    }
}
