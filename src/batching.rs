//! Partitioning of the work list into bounded-size batches.

/// Split `items` into consecutive batches of `size` elements.
///
/// Every batch except the last holds exactly `size` items; the last holds
/// the remainder. Order is preserved and an empty input yields no batches.
/// A `size` of 0 is clamped to 1.
pub fn batch<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }

    batches
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_items_with_size_four_gives_four_then_one() {
        let batches = batch(vec!["a", "b", "c", "d", "e"], 4);

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 1]);
        assert_eq!(batches[1], vec!["e"]);
    }

    #[test]
    fn empty_input_gives_no_batches() {
        let batches: Vec<Vec<u32>> = batch(Vec::new(), 8);
        assert!(batches.is_empty());
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let batches = batch((0..32).collect::<Vec<_>>(), 8);
        assert_eq!(batches.len(), 4);
        assert!(batches.iter().all(|b| b.len() == 8));
    }

    #[test]
    fn concatenation_reproduces_input_for_every_valid_size() {
        let items: Vec<usize> = (0..101).collect();

        for size in 4..=32 {
            let batches = batch(items.clone(), size);

            let (last, full) = batches.split_last().expect("non-empty input");
            assert!(
                full.iter().all(|b| b.len() == size),
                "all but the last batch must hold exactly {size} items"
            );
            assert!(!last.is_empty() && last.len() <= size);

            let flattened: Vec<usize> = batches.into_iter().flatten().collect();
            assert_eq!(flattened, items, "size {size} must preserve order");
        }
    }

    #[test]
    fn zero_size_is_clamped_to_one() {
        let batches = batch(vec![1, 2, 3], 0);
        assert_eq!(batches, vec![vec![1], vec![2], vec![3]]);
    }
}
