use crate::domain::model::FlightRecord;

/// Stable price-ascending sort, truncated to `top_n`, ranks reassigned 1..=N.
pub fn rank(mut records: Vec<FlightRecord>, top_n: usize) -> Vec<FlightRecord> {
    // sort_by 是穩定排序，同價時保留原始順序
    records.sort_by(|a, b| a.price.amount.total_cmp(&b.price.amount));
    records.truncate(top_n);

    for (position, record) in records.iter_mut().enumerate() {
        record.rank = position as u32 + 1;
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Price;

    fn offers(prices: &[(f64, &str)]) -> Vec<FlightRecord> {
        prices
            .iter()
            .map(|(amount, airline)| FlightRecord::new(Price::eur(*amount), *airline))
            .collect()
    }

    #[test]
    fn test_rank_sorts_and_numbers() {
        let ranked = rank(offers(&[(200.0, "A"), (45.0, "B"), (80.0, "C")]), 5);

        let prices: Vec<f64> = ranked.iter().map(|r| r.price.amount).collect();
        assert_eq!(prices, vec![45.0, 80.0, 200.0]);
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_truncates_to_top_n() {
        let ranked = rank(
            offers(&[(5.0, "A"), (4.0, "B"), (3.0, "C"), (2.0, "D"), (1.0, "E"), (0.5, "F")]),
            5,
        );
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].airline, "F");
        assert_eq!(ranked[4].airline, "B");
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let ranked = rank(offers(&[(99.0, "first"), (50.0, "cheap"), (99.0, "second")]), 5);
        assert_eq!(ranked[1].airline, "first");
        assert_eq!(ranked[2].airline, "second");
    }

    #[test]
    fn test_rank_empty_batch() {
        assert!(rank(Vec::new(), 5).is_empty());
    }

    #[test]
    fn test_rank_output_is_sorted_for_many_batches() {
        // 簡單的偽隨機序列，檢查排序與長度不變式
        let mut seed: u64 = 42;
        for batch_size in 0..40 {
            let batch: Vec<FlightRecord> = (0..batch_size)
                .map(|_| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    FlightRecord::new(Price::eur((seed >> 33) as f64 % 500.0), "X")
                })
                .collect();

            let top_n = batch_size % 7 + 1;
            let ranked = rank(batch, top_n);

            assert!(ranked.len() <= top_n);
            assert!(ranked
                .windows(2)
                .all(|w| w[0].price.amount <= w[1].price.amount));
            assert!(ranked
                .iter()
                .enumerate()
                .all(|(i, r)| r.rank as usize == i + 1));
        }
    }
}
