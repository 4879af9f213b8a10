use std::cmp::Ordering;

use crate::mass::Tolerance;
use crate::scan::Centroid;

/// Return the (`left`, `right`) indices that bound the region of `slice`
/// lying between `low` and `high`. The region may include one extra element
/// on the left, so callers still filter by value.
///
/// * `0 <= left <= right <= slice.len()`
#[inline]
pub fn binary_search_slice<T, F, S>(slice: &[T], key: F, low: S, high: S) -> (usize, usize)
where
    F: Fn(&T, &S) -> Ordering,
{
    let left_idx = match slice.binary_search_by(|a| key(a, &low)) {
        Ok(idx) | Err(idx) => {
            let mut idx = idx.saturating_sub(1);
            while idx > 0 && key(&slice[idx], &low) != Ordering::Less {
                idx -= 1;
            }
            idx
        }
    };

    let right_idx = match slice[left_idx..].binary_search_by(|a| key(a, &high)) {
        Ok(idx) | Err(idx) => {
            let mut idx = idx + left_idx;
            while idx < slice.len() && key(&slice[idx], &high) != Ordering::Greater {
                idx = idx.saturating_add(1);
            }
            idx.min(slice.len())
        }
    };
    (left_idx, right_idx)
}

/// Binary search followed by linear search to select the index of the peak
/// closest to `mz` within `tolerance`
pub fn match_peak(peaks: &[Centroid], mz: f64, tolerance: Tolerance) -> Option<usize> {
    let (lo, hi) = tolerance.bounds(mz);
    let (i, j) = binary_search_slice(peaks, |peak, query| peak.mz.total_cmp(query), lo, hi);

    let mut best = None;
    let mut min_eps = f64::MAX;
    for (idx, peak) in peaks[i..j]
        .iter()
        .enumerate()
        .filter(|(_, peak)| peak.mz >= lo && peak.mz <= hi)
    {
        let eps = (peak.mz - mz).abs();
        if eps <= min_eps {
            min_eps = eps;
            best = Some(i + idx);
        }
    }
    best
}

/// Select the index of the most intense peak within `tolerance` of `mz`
pub fn most_intense_peak(peaks: &[Centroid], mz: f64, tolerance: Tolerance) -> Option<usize> {
    let (lo, hi) = tolerance.bounds(mz);
    let (i, j) = binary_search_slice(peaks, |peak, query| peak.mz.total_cmp(query), lo, hi);

    let mut best = None;
    let mut max_int = f64::MIN;
    for (idx, peak) in peaks[i..j]
        .iter()
        .enumerate()
        .filter(|(_, peak)| peak.mz >= lo && peak.mz <= hi)
    {
        if peak.intensity > max_int {
            max_int = peak.intensity;
            best = Some(i + idx);
        }
    }
    best
}
