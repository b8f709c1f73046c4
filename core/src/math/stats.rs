pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Percentage of `part` in `total`, capped at 100 and zero for an empty total.
    pub fn share_percent(part: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (part as f64 / total as f64 * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_sequence_is_zero() {
        assert_eq!(StatsHelper::mean(&[]), 0.0);
    }

    #[test]
    fn mean_averages_values() {
        assert!((StatsHelper::mean(&[0.35, 0.55]) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn share_handles_zero_total() {
        assert_eq!(StatsHelper::share_percent(3, 0), 0.0);
        assert_eq!(StatsHelper::share_percent(1, 4), 25.0);
    }
}
