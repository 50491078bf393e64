/// Sample standard deviation (`n - 1` denominator).
///
/// Returns `0.0` for fewer than two values, where the sample deviation is
/// undefined.
///
/// ```
/// # use tetrevo_stats::dispersion::sample_std_dev;
/// assert_eq!(sample_std_dev(&[1.0, 3.0]), 2.0_f32.sqrt());
/// assert_eq!(sample_std_dev(&[5.0]), 0.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn sample_std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let sum_sq = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>();
    #[expect(clippy::cast_possible_truncation)]
    let std_dev = (sum_sq / (n - 1.0)).sqrt() as f32;
    std_dev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_values_have_zero_spread() {
        assert_eq!(sample_std_dev(&[0.25; 10]), 0.0);
        assert_eq!(sample_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_uses_sample_denominator() {
        // population std of [2, 4, 4, 4, 5, 5, 7, 9] is 2; sample std is sqrt(32 / 7)
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0_f32 / 7.0).sqrt();
        assert!((sample_std_dev(&values) - expected).abs() < 1e-6);
    }
}
