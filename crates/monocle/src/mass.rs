use serde::{Deserialize, Serialize};

pub const PROTON: f64 = 1.007276466879;

/// Average mass difference between successive isotopic peaks of a peptide
pub const AVERAGINE_DIFF: f64 = 1.00286864;

/// Natural abundance of carbon-13
pub const C13_ABUNDANCE: f64 = 0.011;

/// Natural isotopes of selenium, lightest first, as (mass, abundance)
pub const SELENIUM_ISOTOPES: [(f64, f64); 6] = [
    (73.922477, 0.0009),
    (75.919207, 0.0900),
    (76.919908, 0.0760),
    (77.917304, 0.2350),
    (79.916521, 0.4960),
    (81.916709, 0.0940),
];

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f64, f64),
    Da(f64, f64),
}

impl Tolerance {
    /// Symmetric tolerance of `ppm` parts-per-million
    pub fn ppm(ppm: f64) -> Self {
        Tolerance::Ppm(-ppm.abs(), ppm.abs())
    }

    /// Symmetric tolerance of `da` mass units
    pub fn da(da: f64) -> Self {
        Tolerance::Da(-da.abs(), da.abs())
    }

    /// Compute the (`lower`, `upper`) window (in m/z) around `center`
    pub fn bounds(&self, center: f64) -> (f64, f64) {
        match self {
            Tolerance::Ppm(lo, hi) => {
                let delta_lo = center * lo / 1_000_000.0;
                let delta_hi = center * hi / 1_000_000.0;
                (center + delta_lo, center + delta_hi)
            }
            Tolerance::Da(lo, hi) => (center + lo, center + hi),
        }
    }
}

/// Neutral mass of an ion observed at `mz` with charge `charge`
pub fn neutral_mass(mz: f64, charge: u8) -> f64 {
    (mz - PROTON) * charge as f64
}
