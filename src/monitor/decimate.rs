//! Stride decimation for the chart.
//!
//! With `len > budget`, `stride = ceil(len / budget)` and every
//! `stride`-th element is kept starting at index 0, giving
//! `ceil(len / stride)` points.  The result never exceeds `budget`.

/// Stride used for `len` items under a point `budget`.  `1` when the
/// items already fit.
pub fn stride(len: usize, budget: usize) -> usize {
    let budget = budget.max(1);
    if len <= budget {
        1
    } else {
        len.div_ceil(budget)
    }
}

/// Keep every `stride(len, budget)`-th item, oldest first.
pub fn decimate<T>(items: impl ExactSizeIterator<Item = T>, budget: usize) -> Vec<T> {
    let step = stride(items.len(), budget);
    items.step_by(step).collect()
}
