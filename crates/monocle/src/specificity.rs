//! Estimate how much of an isolation window belongs to the selected precursor

use crate::mass::{Tolerance, AVERAGINE_DIFF};
use crate::peak::{binary_search_slice, match_peak};
use crate::scan::Centroid;

/// Half width assumed when the isolation width is not known
pub const DEFAULT_HALF_WIDTH: f64 = 1.5;

/// Tolerance for assigning a peak of the window to the precursor's envelope
const ISOTOPE_TOLERANCE_PPM: f64 = 10.0;

/// Fraction of the ion current within the isolation window that is explained
/// by the isotopic envelope of the precursor at `mz` with `charge`.
///
/// The window is centered on `isolation_mz` (or on `mz` if unset) and is
/// `isolation_width` wide. Returns 0 when the window holds no signal.
pub fn isolation_specificity(
    peaks: &[Centroid],
    isolation_mz: f64,
    mz: f64,
    charge: Option<u8>,
    isolation_width: f64,
) -> f64 {
    let center = if isolation_mz >= 1.0 { isolation_mz } else { mz };
    let half_width = if isolation_width > 0.0 {
        isolation_width / 2.0
    } else {
        DEFAULT_HALF_WIDTH
    };
    let (lo, hi) = Tolerance::da(half_width).bounds(center);

    let (i, j) = binary_search_slice(peaks, |peak, query| peak.mz.total_cmp(query), lo, hi);
    let window = &peaks[i..j];
    let total = window
        .iter()
        .filter(|peak| peak.mz >= lo && peak.mz <= hi)
        .map(|peak| peak.intensity)
        .sum::<f64>();
    if total <= 0.0 {
        return 0.0;
    }

    let spacing = AVERAGINE_DIFF / charge.unwrap_or(1).max(1) as f64;
    let tolerance = Tolerance::ppm(ISOTOPE_TOLERANCE_PPM);

    // Walk the precursor's isotopes from the monoisotopic peak to the end of
    // the window; isotopes left of the window edge are skipped
    let mut assigned = 0.0;
    let mut isotope = mz;
    while isotope <= hi {
        if isotope >= lo {
            if let Some(idx) = match_peak(window, isotope, tolerance) {
                let peak = window[idx];
                if peak.mz >= lo && peak.mz <= hi {
                    assigned += peak.intensity;
                }
            }
        }
        isotope += spacing;
    }

    (assigned / total).clamp(0.0, 1.0)
}
