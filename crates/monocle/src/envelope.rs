use crate::mass::{Tolerance, AVERAGINE_DIFF};
use crate::peak::match_peak;
use crate::scan::Scan;
use crate::vector;

/// Observed isotopic envelope of a peptide, averaged across nearby scans
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeptideEnvelope {
    /// Mean intensity at each isotope position, across all searched scans
    pub average_intensity: Vec<f64>,
    /// Per position: m/z of the matching peak in every scan that had one
    pub mzs: Vec<Vec<f64>>,
    /// Per position: intensity of the matching peak in every scan that had one
    pub intensities: Vec<Vec<f64>>,
}

impl PeptideEnvelope {
    /// Extract `isotopes` consecutive isotope positions, starting `left`
    /// positions away from `target_mz`, from every scan in `scans`.
    ///
    /// Scans without a matching peak contribute zero intensity to the average,
    /// so sparsely observed isotopes are not inflated.
    pub fn extract(
        scans: &[&Scan],
        target_mz: f64,
        charge: u8,
        left: i32,
        isotopes: usize,
        tolerance: Tolerance,
    ) -> Self {
        let spacing = AVERAGINE_DIFF / charge as f64;
        let mut envelope = PeptideEnvelope {
            average_intensity: Vec::with_capacity(isotopes),
            mzs: Vec::with_capacity(isotopes),
            intensities: Vec::with_capacity(isotopes),
        };

        for position in (left..).take(isotopes) {
            let mz = target_mz + position as f64 * spacing;
            let mut mzs = Vec::with_capacity(scans.len());
            let mut intensities = Vec::with_capacity(scans.len());
            let mut summed = 0.0;

            for scan in scans {
                if let Some(idx) = match_peak(&scan.centroids, mz, tolerance) {
                    let peak = scan.centroids[idx];
                    summed += peak.intensity;
                    mzs.push(peak.mz);
                    intensities.push(peak.intensity);
                }
            }

            let average = match scans.len() {
                0 => 0.0,
                n => summed / n as f64,
            };
            envelope.average_intensity.push(average);
            envelope.mzs.push(mzs);
            envelope.intensities.push(intensities);
        }
        envelope
    }

    pub fn len(&self) -> usize {
        self.average_intensity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.average_intensity.is_empty()
    }

    /// Intensity-weighted m/z of the peaks observed at `position`, if any
    pub fn weighted_mz(&self, position: usize) -> Option<f64> {
        let mzs = self.mzs.get(position)?;
        if mzs.is_empty() {
            return None;
        }
        Some(vector::weighted_average(mzs, &self.intensities[position]))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scan::Centroid;

    fn scan(peaks: &[(f64, f64)]) -> Scan {
        Scan {
            ms_order: 1,
            centroids: peaks.iter().map(|&(mz, i)| Centroid::new(mz, i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn averages_over_searched_scans() {
        let step = AVERAGINE_DIFF / 2.0;
        let a = scan(&[(600.0, 100.0), (600.0 + step, 80.0)]);
        let b = scan(&[(600.0002, 300.0)]);
        let c = scan(&[(200.0, 1.0)]);
        let scans = [&a, &b, &c];

        let env = PeptideEnvelope::extract(&scans, 600.0, 2, -1, 3, Tolerance::ppm(10.0));
        assert_eq!(env.len(), 3);
        assert_eq!(env.average_intensity[0], 0.0);
        assert_eq!(env.average_intensity[1], 400.0 / 3.0);
        assert_eq!(env.average_intensity[2], 80.0 / 3.0);
        assert_eq!(env.mzs[1], vec![600.0, 600.0002]);
        assert_eq!(env.intensities[1], vec![100.0, 300.0]);
        assert!(env.mzs[0].is_empty());

        let mz = env.weighted_mz(1).unwrap();
        assert!((mz - 600.00015).abs() < 1e-9);
        assert_eq!(env.weighted_mz(0), None);
        assert_eq!(env.weighted_mz(7), None);
    }

    #[test]
    fn no_scans() {
        let env = PeptideEnvelope::extract(&[], 600.0, 2, -3, 7, Tolerance::ppm(10.0));
        assert_eq!(env.average_intensity, vec![0.0; 7]);
    }
}
