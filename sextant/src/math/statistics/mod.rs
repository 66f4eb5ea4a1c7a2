//! Statistical functions: median, MAD, normalized MAD, dispersion.


/// MAD (Median Absolute Deviation) to standard deviation conversion factor.
///
/// For a normal distribution, σ ≈ 1.4826 × MAD.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Calculate the median of f64 values in-place.
///
/// Mutates the input buffer (partial sort via quickselect). Even lengths
/// average the two middle elements.
#[inline]
pub fn median_f64_mut(data: &mut [f64]) -> f64 {
    debug_assert!(!data.is_empty());

    let len = data.len();
    let mid = len / 2;

    if len & 1 == 1 {
        let (_, median, _) = data.select_nth_unstable_by(mid, f64::total_cmp);
        *median
    } else {
        let (left_part, right_median, _) = data.select_nth_unstable_by(mid, f64::total_cmp);
        let right = *right_median;
        let left = left_part.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (left + right) * 0.5
    }
}

/// Median of a slice, `None` when empty. Copies the input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut scratch = values.to_vec();
    Some(median_f64_mut(&mut scratch))
}

/// Compute median and MAD (Median Absolute Deviation) together.
///
/// Mutates the input buffer.
pub fn median_and_mad_f64_mut(data: &mut [f64]) -> (f64, f64) {
    debug_assert!(!data.is_empty());

    let median = median_f64_mut(data);
    for v in data.iter_mut() {
        *v = (*v - median).abs();
    }
    let mad = median_f64_mut(data);

    (median, mad)
}

/// Normalized median absolute deviation: `1.4826 * median(|x - median(x)|)`.
///
/// Returns 0.0 for an empty slice.
pub fn nmad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut scratch = values.to_vec();
    let (_, mad) = median_and_mad_f64_mut(&mut scratch);
    mad * MAD_TO_SIGMA
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N), 0.0 for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
