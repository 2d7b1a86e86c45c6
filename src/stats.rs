//! Series statistics over nullable daily data.
//!
//! Missing observations are `None` throughout; nothing is imputed here.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}

/// Rolling mean and sample std over the trailing `window` rows.
///
/// A row is defined once its window holds at least `min_periods` valid values.
pub fn rolling_mean_std(
    values: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Vec<(Option<f64>, Option<f64>)> {
    let mut out = Vec::with_capacity(values.len());
    let mut buf: Vec<f64> = Vec::with_capacity(window);

    for i in 0..values.len() {
        let lo = (i + 1).saturating_sub(window);
        buf.clear();
        buf.extend(values[lo..=i].iter().flatten().copied());

        if buf.len() < min_periods.max(1) {
            out.push((None, None));
        } else {
            out.push((mean(&buf), sample_std(&buf)));
        }
    }
    out
}

/// Daily log return `ln(p[t] / p[t-1])`.
pub fn log_returns(prices: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(prices.len());
    for i in 0..prices.len() {
        let r = if i == 0 {
            None
        } else {
            match (prices[i - 1], prices[i]) {
                (Some(prev), Some(cur)) if prev > 0.0 && cur > 0.0 => Some((cur / prev).ln()),
                _ => None,
            }
        };
        out.push(r);
    }
    out
}

/// Sum of the next `horizon` values after each row.
///
/// Row `t` holds `x[t+1] + ... + x[t+horizon]`, defined only when all of them are.
pub fn forward_sum(values: &[Option<f64>], horizon: usize) -> Vec<Option<f64>> {
    let n = values.len();
    (0..n)
        .map(|t| {
            if horizon == 0 || t + horizon >= n {
                return None;
            }
            values[t + 1..=t + horizon]
                .iter()
                .try_fold(0.0, |acc, v| v.map(|x| acc + x))
        })
        .collect()
}

/// Running sum with missing values counted as zero.
pub fn cumsum_fill_zero(values: &[Option<f64>]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|v| {
            total += v.unwrap_or(0.0);
            total
        })
        .collect()
}

/// Forward-fill `None` gaps from the most recent known value.
pub fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        if v.is_some() {
            last = *v;
        } else {
            *v = last;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        // Sample variance = 32 / 7
        let sd = sample_std(&values).unwrap();
        assert!((sd - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);

        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_rolling_respects_min_periods() {
        let values: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let out = rolling_mean_std(&values, 5, 3);

        assert_eq!(out[0], (None, None));
        assert_eq!(out[1], (None, None));
        assert_eq!(out[2].0, Some(1.0));
        // Full window [5..=9]
        assert_eq!(out[9].0, Some(7.0));
        let sd = out[9].1.unwrap();
        assert!((sd - 2.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_counts_only_valid_values() {
        let values = vec![Some(1.0), None, None, Some(3.0), Some(5.0)];
        let out = rolling_mean_std(&values, 5, 3);
        assert_eq!(out[3], (None, None));
        assert_eq!(out[4].0, Some(3.0));
    }

    #[test]
    fn test_log_returns() {
        let prices = vec![Some(100.0), Some(110.0), None, Some(121.0)];
        let r = log_returns(&prices);
        assert_eq!(r[0], None);
        assert!((r[1].unwrap() - 1.1_f64.ln()).abs() < 1e-12);
        assert_eq!(r[2], None);
        assert_eq!(r[3], None);
    }

    #[test]
    fn test_forward_sum_looks_ahead() {
        let values = vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let out = forward_sum(&values, 2);
        assert_eq!(out, vec![Some(3.0), Some(5.0), Some(7.0), None, None]);

        let gappy = vec![Some(1.0), Some(1.0), None, Some(1.0)];
        assert_eq!(forward_sum(&gappy, 2), vec![None, None, None, None]);
    }

    #[test]
    fn test_cumsum_treats_missing_as_zero() {
        let values = vec![None, Some(0.1), None, Some(-0.3)];
        let out = cumsum_fill_zero(&values);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.1).abs() < 1e-12);
        assert!((out[2] - 0.1).abs() < 1e-12);
        assert!((out[3] + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_forward_fill() {
        let mut values = vec![None, Some(1.0), None, None, Some(2.0), None];
        forward_fill(&mut values);
        assert_eq!(values, vec![None, Some(1.0), Some(1.0), Some(1.0), Some(2.0), Some(2.0)]);
    }
}
