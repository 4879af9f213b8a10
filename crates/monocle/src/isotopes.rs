use crate::mass::{C13_ABUNDANCE, PROTON, SELENIUM_ISOTOPES};

/// Neutral masses at which the isotope window widens
pub const LOW_MASS_BAND: f64 = 1200.0;
pub const HIGH_MASS_BAND: f64 = 2900.0;

/// Average residue mass and average number of carbons per residue, used to
/// estimate the carbon count of an unknown peptide
const AVERAGE_RESIDUE_MASS: f64 = 111.0;
const AVERAGE_RESIDUE_CARBONS: f64 = 5.1;

/// How many isotopic positions to extract around a precursor, and how many of
/// them take part in a single comparison against the theoretical envelope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IsotopeRange {
    /// Total number of isotope positions to consider
    pub isotopes: usize,
    /// Offset of the first extracted position relative to the nominal
    /// monoisotopic peak. Always negative: we also test peaks to the left.
    pub left: i32,
    /// Number of consecutive positions compared at a time
    pub compare_size: usize,
}

impl IsotopeRange {
    /// Build the isotope range for a charge-corrected neutral `mass`.
    ///
    /// Heavier peptides have wider isotope distributions, and their
    /// monoisotopic peak is more often under-called, so each mass band
    /// extends further to the left and compares more positions.
    pub fn new(mass: f64, heavy_atom: bool) -> Self {
        let (isotopes, left, compare_size) = if mass > HIGH_MASS_BAND {
            match heavy_atom {
                true => (23, -10, 13),
                false => (14, -7, 7),
            }
        } else if mass > LOW_MASS_BAND {
            match heavy_atom {
                true => (19, -8, 11),
                false => (10, -5, 5),
            }
        } else {
            match heavy_atom {
                true => (13, -5, 8),
                false => (7, -3, 4),
            }
        };
        Self {
            isotopes,
            left,
            compare_size,
        }
    }

    /// Index of the nominal monoisotopic peak within the extracted positions
    pub fn monoisotopic_index(&self) -> usize {
        (-self.left) as usize
    }

    /// Number of window origins tested when sliding `compare_size` positions
    /// across all `isotopes`
    pub fn windows(&self) -> usize {
        (self.isotopes + 1).saturating_sub(self.compare_size)
    }
}

/// Estimate the number of carbons of a peptide from its m/z and charge
pub fn estimate_carbons(mz: f64, charge: u8) -> u32 {
    let z = charge as f64;
    let carbons = ((mz * z - PROTON * z) / AVERAGE_RESIDUE_MASS * AVERAGE_RESIDUE_CARBONS).floor();
    carbons.max(0.0) as u32
}

/// Binomial probability of exactly `k` successes out of `n` trials
pub fn binomial(n: u32, k: u32, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    // ln(n choose k), accumulated term by term to stay finite for large `n`
    let ln_choose = (0..k).fold(0.0, |acc, i| {
        acc + ((n - i) as f64).ln() - ((i + 1) as f64).ln()
    });
    (ln_choose + k as f64 * p.ln() + (n - k) as f64 * (1.0 - p).ln()).exp()
}

/// Full discrete convolution of `source` with `kernel`. The output has
/// `source.len() + kernel.len() - 1` positions, so no probability is lost.
pub fn convolve(source: &[f64], kernel: &[f64]) -> Vec<f64> {
    if source.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let mut output = vec![0.0; source.len() + kernel.len() - 1];
    for (i, k) in kernel.iter().enumerate() {
        for (j, s) in source.iter().enumerate() {
            output[i + j] += k * s;
        }
    }
    output
}

/// Add a single selenium atom to the model: convolve the carbon envelope with
/// the natural selenium isotopes, keeping the length of `source`.
///
/// The selenium isotopes are treated as consecutive positions, so the
/// most abundant one (Se-80) lands four positions to the right of Se-74.
pub fn incorporate_selenium(source: &[f64]) -> Vec<f64> {
    let kernel = SELENIUM_ISOTOPES.iter().map(|(_, a)| *a).collect::<Vec<_>>();
    let mut output = convolve(source, &kernel);
    output.truncate(source.len());
    output
}

/// Relative intensities of the isotopic peaks of a peptide observed at
/// `mz` with `charge`, based on the binomial probability of carrying carbon-13.
///
/// Position 0 is always zero: when comparing, we don't expect a peak to the
/// left of the monoisotopic candidate.
pub fn theoretical_envelope(mz: f64, charge: u8, compare_size: usize, heavy_atom: bool) -> Vec<f64> {
    let carbons = estimate_carbons(mz, charge);
    let mut output = vec![0.0; compare_size];
    for (k, value) in output.iter_mut().enumerate().skip(1) {
        *value = binomial(carbons, k as u32 - 1, C13_ABUNDANCE);
    }

    match heavy_atom {
        true => incorporate_selenium(&output),
        false => output,
    }
}
