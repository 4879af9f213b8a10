use serde::{Deserialize, Serialize};

use crate::mass::Tolerance;
use crate::scoring::ScoreType;

/// Which survey scans around the parent scan are averaged
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AveragingVector {
    Before,
    After,
    Both,
}

impl AveragingVector {
    pub fn includes_before(&self) -> bool {
        matches!(self, AveragingVector::Before | AveragingVector::Both)
    }

    pub fn includes_after(&self) -> bool {
        matches!(self, AveragingVector::After | AveragingVector::Both)
    }
}

/// Inclusive range of charge states
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRange {
    pub low: u8,
    pub high: u8,
}

impl ChargeRange {
    pub fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// A range containing only `charge`
    pub fn single(charge: u8) -> Self {
        Self::new(charge, charge)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> {
        self.low..=self.high
    }

    pub fn len(&self) -> usize {
        (self.high as usize + 1).saturating_sub(self.low as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<(u8, u8)> for ChargeRange {
    fn from((low, high): (u8, u8)) -> Self {
        Self::new(low, high)
    }
}

/// Settings for a monoisotopic assignment run. Read-only for the duration of
/// a run, and shared by reference between all workers.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonocleSettings {
    pub averaging_vector: AveragingVector,
    /// Number of survey scans to average on each side of the parent scan
    pub number_of_scans_to_average: usize,
    /// Search `charge_range` even when the instrument reported a charge
    pub charge_detection: bool,
    /// Charges searched when a precursor's charge is unknown
    pub charge_range: ChargeRange,
    /// Charges enumerated for low resolution or forced precursors
    pub charge_range_unknown: ChargeRange,
    /// MSn level of the scans whose precursors are assigned
    pub ms_level: u8,
    /// Re-center the precursor on the most intense peak of the isolation window
    pub use_most_intense: bool,
    /// Replace every precursor with one copy per charge in `charge_range_unknown`
    pub force_charges: bool,
    /// Only enumerate charges, don't search for the monoisotopic peak
    pub skip_mono: bool,
    /// Also test an isotope model with a single selenium atom
    pub search_for_selenium: bool,
    pub score_type: ScoreType,
    /// Tolerance used when extracting isotopic peaks from survey scans
    pub extraction_tolerance: Tolerance,
}

impl Default for MonocleSettings {
    fn default() -> Self {
        Self {
            averaging_vector: AveragingVector::Both,
            number_of_scans_to_average: 6,
            charge_detection: false,
            charge_range: ChargeRange::new(2, 6),
            charge_range_unknown: ChargeRange::new(2, 6),
            ms_level: 2,
            use_most_intense: false,
            force_charges: false,
            skip_mono: false,
            search_for_selenium: false,
            score_type: ScoreType::DotProduct,
            extraction_tolerance: Tolerance::ppm(10.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn charge_ranges() {
        let range = ChargeRange::new(2, 6);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6]);
        assert_eq!(range.len(), 5);
        assert_eq!(ChargeRange::single(3).len(), 1);
        assert!(ChargeRange::new(4, 3).is_empty());
        assert_eq!(ChargeRange::new(4, 3).iter().count(), 0);
    }

    #[test]
    fn partial_settings() {
        let settings: MonocleSettings = serde_json::from_str(
            r#"{
                "averaging_vector": "before",
                "charge_range": { "low": 1, "high": 4 },
                "score_type": "ChiSquared",
                "extraction_tolerance": { "ppm": [-5.0, 5.0] }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.averaging_vector, AveragingVector::Before);
        assert_eq!(settings.charge_range, ChargeRange::new(1, 4));
        assert_eq!(settings.score_type, ScoreType::ChiSquared);
        assert_eq!(settings.extraction_tolerance, Tolerance::Ppm(-5.0, 5.0));
        assert_eq!(settings.number_of_scans_to_average, 6);
        assert_eq!(settings.ms_level, 2);
    }
}
