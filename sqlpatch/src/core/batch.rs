//! Batch numbering.

/// Batch number for the next run: one past the highest recorded batch.
///
/// An empty ledger reports `0`, so the first batch is `1`.
pub fn next_batch(max_batch: i64) -> i64 {
    max_batch.max(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_batch_is_one() {
        assert_eq!(next_batch(0), 1);
    }

    #[test]
    fn increments_highest_batch() {
        assert_eq!(next_batch(4), 5);
    }
}
