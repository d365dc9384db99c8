use crate::models::ZoneStatistics;

/// Compute the full battery over the valid cell values of one zone. The
/// slice is sorted in place.
pub fn compute_statistics(values: &mut [f64]) -> ZoneStatistics {
    if values.is_empty() {
        return ZoneStatistics::empty();
    }

    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    let min = values[0];
    let max = values[values.len() - 1];
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let median = percentile(values, 50.0);

    ZoneStatistics {
        count: values.len(),
        min: Some(min),
        max: Some(max),
        mean: Some(mean),
        median: Some(median),
        std: Some(variance.sqrt()),
        p25: Some(percentile(values, 25.0)),
        p50: Some(median),
        p75: Some(percentile(values, 75.0)),
        p95: Some(percentile(values, 95.0)),
        p99: Some(percentile(values, 99.0)),
        range: Some(max - min),
    }
}

/// Linear interpolation between closest ranks over an ascending slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_battery_on_four_values() {
        let mut values = vec![40.0, 10.0, 30.0, 20.0];
        let stats = compute_statistics(&mut values);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(40.0));
        assert!(close(stats.mean, 25.0));
        assert!(close(stats.median, 25.0));
        assert!(close(stats.std, 125.0_f64.sqrt()));
        assert!(close(stats.p25, 17.5));
        assert!(close(stats.p75, 32.5));
        assert!(close(stats.p95, 38.5));
        assert!(close(stats.p99, 39.7));
        assert_eq!(stats.range, Some(30.0));
    }

    #[test]
    fn test_single_value() {
        let stats = compute_statistics(&mut [7.0]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.std, Some(0.0));
        assert_eq!(stats.p99, Some(7.0));
        assert_eq!(stats.range, Some(0.0));
    }

    #[test]
    fn test_no_values_is_all_missing() {
        let stats = compute_statistics(&mut []);
        assert_eq!(stats, ZoneStatistics::empty());
    }
}
