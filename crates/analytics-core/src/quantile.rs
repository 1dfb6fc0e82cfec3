// ── Quantile helpers ──────────────────────────────────────────────────────────

/// Quantile used by the high-value user panel.
pub const HIGH_VALUE_QUANTILE: f64 = 0.9;

/// Compute the `q`-th quantile (`0.0..=1.0`) of a **sorted** slice using
/// linear interpolation between the two nearest ranks.
///
/// Returns `None` for an empty slice. `q` is clamped into `[0, 1]`.
pub fn quantile_sorted(sorted_data: &[f64], q: f64) -> Option<f64> {
    let len = sorted_data.len();
    if len == 0 {
        return None;
    }
    if len == 1 {
        return Some(sorted_data[0]);
    }
    let rank = q.clamp(0.0, 1.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted_data[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo]))
}

/// Sort a copy of `values` (NaN dropped) and return its `q`-th quantile.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// `true` when `q` is a usable quantile.
pub fn is_valid_quantile(q: f64) -> bool {
    (0.0..=1.0).contains(&q)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_empty_is_none() {
        assert_eq!(quantile_sorted(&[], 0.9), None);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_quantile_single_element() {
        assert_eq!(quantile_sorted(&[42.0], 0.9), Some(42.0));
        assert_eq!(quantile_sorted(&[42.0], 0.0), Some(42.0));
    }

    #[test]
    fn test_quantile_median_even() {
        let q = quantile_sorted(&[1.0, 2.0, 3.0, 4.0], 0.5).unwrap();
        assert!((q - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_extremes() {
        let data = [10.0, 20.0, 30.0];
        assert_eq!(quantile_sorted(&data, 0.0), Some(10.0));
        assert_eq!(quantile_sorted(&data, 1.0), Some(30.0));
    }

    #[test]
    fn test_quantile_p90_one_to_hundred() {
        // rank = 0.9 * 99 = 89.1 → 90 + 0.1 * (91 - 90)
        let data: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let q = quantile_sorted(&data, 0.9).unwrap();
        assert!((q - 90.1).abs() < 1e-9, "q = {q}");
    }

    #[test]
    fn test_quantile_sorts_unsorted_input() {
        let q = quantile(&[5.0, 1.0, f64::NAN, 3.0], 0.5).unwrap();
        assert!((q - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_is_valid_quantile() {
        assert!(is_valid_quantile(0.0));
        assert!(is_valid_quantile(0.9));
        assert!(is_valid_quantile(1.0));
        assert!(!is_valid_quantile(1.5));
        assert!(!is_valid_quantile(-0.1));
        assert!(!is_valid_quantile(f64::NAN));
    }
}
