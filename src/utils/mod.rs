/// Lower-bound search over a non-decreasing prefix-sum table.
///
/// Returns the index of the first bucket whose cumulative value is >= `value`,
/// i.e. the bucket a uniform draw in `[0, table.last()]` falls into. An exact
/// hit on a boundary belongs to the bucket ending at that boundary; an `Err`
/// insertion point from the binary search is already the containing bucket.
///
/// # Panics
/// Panics if `table` is empty.
pub fn cumulative_search(table: &[f64], value: f64) -> usize {
    assert!(!table.is_empty(), "cumulative table must not be empty");
    match table.binary_search_by(|entry| entry.total_cmp(&value)) {
        Ok(index) => index,
        // Clamp for draws that land past the last entry through rounding.
        Err(index) => index.min(table.len() - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_entries() {
        let table = [1.0, 3.0, 6.0, 10.0];
        assert_eq!(cumulative_search(&table, 0.5), 0);
        assert_eq!(cumulative_search(&table, 2.0), 1);
        assert_eq!(cumulative_search(&table, 5.9), 2);
        assert_eq!(cumulative_search(&table, 9.99), 3);
    }

    #[test]
    fn test_exact_hits() {
        let table = [1.0, 3.0, 6.0];
        assert_eq!(cumulative_search(&table, 1.0), 0);
        assert_eq!(cumulative_search(&table, 3.0), 1);
        assert_eq!(cumulative_search(&table, 6.0), 2);
    }

    #[test]
    fn test_clamps_past_total() {
        let table = [2.0, 4.0];
        assert_eq!(cumulative_search(&table, 4.0 + 1e-12), 1);
    }

    #[test]
    fn test_zero_width_buckets_skipped() {
        // Repeated cumulative values mean empty buckets; a draw strictly above
        // the shared boundary lands past them.
        let table = [1.0, 1.0, 1.0, 2.0];
        assert_eq!(cumulative_search(&table, 1.5), 3);
    }
}
