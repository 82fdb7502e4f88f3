//! Probability Primitives
//!
//! Log-space arithmetic and distribution checks shared by the HMM engine.
//! `ln(0)` is represented as `f64::NEG_INFINITY` throughout.

use crate::constants::DISTRIBUTION_TOLERANCE;

/// Natural log that maps 0 to -inf instead of producing NaN warnings
#[inline]
pub fn safe_ln(p: f64) -> f64 {
    if p <= 0.0 {
        f64::NEG_INFINITY
    } else {
        p.ln()
    }
}

/// Stable log-sum-exp over a slice
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if max_val.is_infinite() {
        return max_val;
    }

    let sum: f64 = values.iter().map(|&x| (x - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Index and value of the maximum; ties go to the lowest index
///
/// Returns `None` for an empty slice. A slice of all `-inf` yields index 0.
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    let mut iter = values.iter().copied().enumerate();
    let first = iter.next()?;
    Some(iter.fold(first, |best, (i, v)| if v > best.1 { (i, v) } else { best }))
}

/// Scale values in place so they sum to 1; returns the original sum
///
/// A zero (or non-finite) sum leaves the values untouched.
pub fn normalize(values: &mut [f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
    sum
}

/// Check that `values` is a probability distribution
///
/// Every entry must be finite and non-negative, and the sum must be within
/// `DISTRIBUTION_TOLERANCE` of 1.
pub fn check_distribution<'a, I>(values: I, what: &str) -> Result<(), String>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut sum = 0.0;
    let mut len = 0usize;
    for (i, &p) in values.into_iter().enumerate() {
        if !p.is_finite() || p < 0.0 {
            return Err(format!("{} has invalid entry {} at index {}", what, p, i));
        }
        sum += p;
        len += 1;
    }
    if len == 0 {
        return Err(format!("{} is empty", what));
    }
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(format!("{} sums to {}, expected 1.0", what, sum));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ln() {
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert_eq!(safe_ln(1.0), 0.0);
        assert!((safe_ln(0.5) - 0.5f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn test_log_sum_exp() {
        let values = vec![1.0, 2.0, 3.0];
        let expected = (1.0_f64.exp() + 2.0_f64.exp() + 3.0_f64.exp()).ln();
        assert!((log_sum_exp(&values) - expected).abs() < 1e-10);

        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_log_sum_exp_avoids_underflow() {
        // e^-1000 underflows to 0 in linear space
        let values = [-1000.0, -1000.0];
        let result = log_sum_exp(&values);
        assert!((result - (-1000.0 + 2f64.ln())).abs() < 1e-10);
    }

    #[test]
    fn test_argmax_ties_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5, 0.1]), Some((1, 0.5)));
        assert_eq!(argmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY]).map(|r| r.0), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_normalize() {
        let mut v = [1.0, 3.0];
        let sum = normalize(&mut v);
        assert_eq!(sum, 4.0);
        assert_eq!(v, [0.25, 0.75]);

        let mut zeros = [0.0, 0.0];
        normalize(&mut zeros);
        assert_eq!(zeros, [0.0, 0.0]);
    }

    #[test]
    fn test_check_distribution() {
        assert!(check_distribution(&[0.6, 0.4], "pi").is_ok());
        assert!(check_distribution(&[1.0], "pi").is_ok());

        let err = check_distribution(&[0.7, 0.5], "row 0").unwrap_err();
        assert!(err.contains("sums to"));

        assert!(check_distribution(&[1.2, -0.2], "row").is_err());
        assert!(check_distribution(&[f64::NAN, 1.0], "row").is_err());
        assert!(check_distribution(&[], "row").is_err());
    }
}
