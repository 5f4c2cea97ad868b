//! Conditional data-parallel mapping for bulk analysis.
//!
//! Uses rayon when the `parallel` feature is enabled and the batch is larger
//! than the threshold; otherwise maps sequentially. Output order always
//! matches input order.

/// Batches at or below this size are mapped sequentially.
pub const PARALLEL_THRESHOLD: usize = 64;

/// Maps `f` over `items`, in parallel when enabled and worthwhile.
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], threshold: usize, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if items.len() > threshold {
            return items.par_iter().enumerate().map(|(i, t)| f(i, t)).collect();
        }
    }

    items.iter().enumerate().map(|(i, t)| f(i, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved_above_threshold() {
        let items: Vec<u32> = (0..500).collect();
        let out = maybe_parallel_map(&items, 10, |i, v| (i, v * 2));
        assert_eq!(out.len(), 500);
        assert!(out.iter().enumerate().all(|(i, (j, v))| i == *j && *v == i as u32 * 2));
    }

    #[test]
    fn test_small_batch_sequential() {
        let out = maybe_parallel_map(&[1, 2, 3], PARALLEL_THRESHOLD, |_, v| v + 1);
        assert_eq!(out, vec![2, 3, 4]);
    }
}
