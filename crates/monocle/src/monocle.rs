use log::{debug, info};
use rayon::prelude::*;

use crate::envelope::PeptideEnvelope;
use crate::isotopes::{theoretical_envelope, IsotopeRange};
use crate::mass::{neutral_mass, Tolerance};
use crate::peak::{match_peak, most_intense_peak};
use crate::processor::CancelToken;
use crate::scan::{Precursor, Scan, ScanIndex};
use crate::scoring::{ChiSquared, DotProduct, EnvelopeScorer, ScoreType};
use crate::selector::nearby_scans;
use crate::settings::{ChargeRange, MonocleSettings};
use crate::specificity::isolation_specificity;
use crate::Error;

/// Tolerance for re-anchoring the target m/z onto a peak of the parent scan
const PARENT_TOLERANCE_PPM: f64 = 50.0;

/// Offset from a window origin to its monoisotopic position. The plain
/// carbon model expects no peak at the origin itself.
const PLAIN_OFFSET: usize = 1;

/// With a selenium atom the all-light peak is pushed right by the
/// Se-74 -> Se-80 gap as well.
const HEAVY_ATOM_OFFSET: usize = 5;

/// Winning hypothesis for a single precursor
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Assignment {
    /// `None` if no hypothesis was accepted
    pub charge: Option<u8>,
    /// Monoisotopic m/z
    pub mz: f64,
    pub heavy_atom: bool,
    pub score: Option<f64>,
}

#[derive(Copy, Clone, Debug)]
struct Candidate {
    score: f64,
    charge: u8,
    heavy_atom: bool,
    /// Intensity-weighted m/z of the monoisotopic position, if observed
    mz: Option<f64>,
}

/// Counters describing one pass over a file
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fragment_scans: usize,
    /// Scans without a usable parent scan
    pub skipped_scans: usize,
    /// Scans whose precursors were replaced by one per candidate charge
    pub expanded_scans: usize,
    pub searched_precursors: usize,
    pub assigned_precursors: usize,
}

/// Result of planning a single fragmentation scan, committed afterwards
struct Planned {
    position: usize,
    precursors: Vec<Precursor>,
    expanded: bool,
    searched: usize,
    assigned: usize,
}

pub struct Monocle<'a> {
    settings: &'a MonocleSettings,
}

impl<'a> Monocle<'a> {
    pub fn new(settings: &'a MonocleSettings) -> Self {
        Self { settings }
    }

    /// Assign a monoisotopic m/z and charge to every precursor of every
    /// fragmentation scan in `scans`.
    ///
    /// Precursors are resolved in parallel against an immutable view of the
    /// scans; the new precursor lists are only written back once all of them
    /// were determined.
    pub fn run(&self, scans: &mut [Scan], cancel: &CancelToken) -> Result<RunSummary, Error> {
        match self.settings.score_type {
            ScoreType::DotProduct => self.run_with(&DotProduct, scans, cancel),
            ScoreType::ChiSquared => self.run_with(&ChiSquared, scans, cancel),
        }
    }

    fn run_with<S: EnvelopeScorer>(
        &self,
        scorer: &S,
        scans: &mut [Scan],
        cancel: &CancelToken,
    ) -> Result<RunSummary, Error> {
        let index = ScanIndex::new(scans);
        let view: &[Scan] = scans;

        let planned = view
            .par_iter()
            .enumerate()
            .filter(|(_, scan)| scan.ms_order == self.settings.ms_level)
            .map(|(position, scan)| self.plan(scorer, view, &index, position, scan, cancel))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut summary = RunSummary {
            fragment_scans: planned.len(),
            ..Default::default()
        };
        for plan in planned {
            match plan {
                Some(plan) => {
                    summary.expanded_scans += plan.expanded as usize;
                    summary.searched_precursors += plan.searched;
                    summary.assigned_precursors += plan.assigned;
                    scans[plan.position].precursors = plan.precursors;
                }
                None => summary.skipped_scans += 1,
            }
        }
        Ok(summary)
    }

    fn plan<S: EnvelopeScorer>(
        &self,
        scorer: &S,
        scans: &[Scan],
        index: &ScanIndex,
        position: usize,
        scan: &Scan,
        cancel: &CancelToken,
    ) -> Result<Option<Planned>, Error> {
        cancel.check()?;

        let parent_position = match scan.parent_scan() {
            Some(number) => match index.position(number) {
                Some(idx) => idx,
                None => {
                    info!(
                        "Scan {} refers to precursor scan {}, which is missing.",
                        scan.scan_number, number
                    );
                    return Ok(None);
                }
            },
            None => {
                info!(
                    "Scan {} does not have a precursor scan number assigned.",
                    scan.scan_number
                );
                return Ok(None);
            }
        };
        let parent = &scans[parent_position];

        // Low resolution parents, or forced charges, get one precursor per
        // charge in the unknown charge range. Their charge is never resolved.
        let low_res = parent.is_low_resolution();
        let expanded = low_res || self.settings.force_charges;
        let mut precursors = if expanded {
            expand_charges(&scan.precursors, self.settings.charge_range_unknown)
        } else {
            scan.precursors.clone()
        };

        let mut searched = 0;
        let mut assigned = 0;
        if !self.settings.skip_mono && !low_res {
            let nearby = nearby_scans(scans, parent_position, self.settings);
            for precursor in precursors.iter_mut() {
                cancel.check()?;
                if !self.settings.charge_detection && matches!(precursor.charge, None | Some(0)) {
                    info!(
                        "Scan {} does not have a charge state assigned. Charge detection enabled.",
                        scan.scan_number
                    );
                }
                let assignment = self.assign(scorer, &nearby, parent, precursor);
                searched += 1;
                assigned += assignment.charge.is_some() as usize;
            }
        }

        Ok(Some(Planned {
            position,
            precursors,
            expanded,
            searched,
            assigned,
        }))
    }

    /// [`Monocle::assign`] using the configured score type
    pub fn assign_precursor(
        &self,
        nearby: &[&Scan],
        parent: &Scan,
        precursor: &mut Precursor,
    ) -> Assignment {
        match self.settings.score_type {
            ScoreType::DotProduct => self.assign(&DotProduct, nearby, parent, precursor),
            ScoreType::ChiSquared => self.assign(&ChiSquared, nearby, parent, precursor),
        }
    }

    /// Resolve a single precursor against the averaged `nearby` survey scans
    /// and commit the winning hypothesis onto it.
    ///
    /// The charge is only overwritten if a hypothesis was accepted; the m/z
    /// falls back to the re-anchored target m/z if the monoisotopic position
    /// holds no peaks.
    pub fn assign<S: EnvelopeScorer>(
        &self,
        scorer: &S,
        nearby: &[&Scan],
        parent: &Scan,
        precursor: &mut Precursor,
    ) -> Assignment {
        let target_mz = self.target_mz(parent, precursor);
        let assignment = self.search(scorer, nearby, target_mz, precursor.charge);

        if let Some(charge) = assignment.charge {
            precursor.charge = Some(charge);
        }
        precursor.mz = assignment.mz;
        precursor.heavy_atom = assignment.heavy_atom;
        precursor.isolation_specificity = isolation_specificity(
            &parent.centroids,
            precursor.isolation_mz,
            precursor.mz,
            precursor.charge,
            precursor.isolation_width,
        );
        assignment
    }

    /// Pick the m/z the isotope search is anchored on: the isolation center
    /// (or the reported m/z if unset), optionally moved onto the most intense
    /// peak of the isolation window, then snapped to the closest parent peak.
    pub fn target_mz(&self, parent: &Scan, precursor: &Precursor) -> f64 {
        let mut mz = if precursor.isolation_mz < 1.0 {
            precursor.mz
        } else {
            precursor.isolation_mz
        };

        if self.settings.use_most_intense && precursor.isolation_width > 0.0 {
            let window = Tolerance::da(precursor.isolation_width / 2.0);
            if let Some(idx) = most_intense_peak(&parent.centroids, mz, window) {
                mz = parent.centroids[idx].mz;
            }
        }

        if let Some(idx) = match_peak(&parent.centroids, mz, Tolerance::ppm(PARENT_TOLERANCE_PPM)) {
            mz = parent.centroids[idx].mz;
        }
        mz
    }

    fn charge_range(&self, reported: Option<u8>) -> ChargeRange {
        match reported {
            Some(charge) if charge > 0 && !self.settings.charge_detection => {
                ChargeRange::single(charge)
            }
            _ => self.settings.charge_range,
        }
    }

    /// Evaluate every (charge, isotope model, window origin) hypothesis for an
    /// ion at `target_mz` and return the winner.
    pub fn search<S: EnvelopeScorer>(
        &self,
        scorer: &S,
        nearby: &[&Scan],
        target_mz: f64,
        reported: Option<u8>,
    ) -> Assignment {
        let models: &[bool] = match self.settings.search_for_selenium {
            true => &[false, true],
            false => &[false],
        };

        let mut best_score = scorer.initial();
        let mut best: Option<Candidate> = None;
        let mut best_plain: Option<Candidate> = None;
        let mut scores = Vec::new();

        for charge in self.charge_range(reported).iter() {
            let mass = neutral_mass(target_mz, charge);
            for &heavy_atom in models {
                let range = IsotopeRange::new(mass, heavy_atom);
                let mut expected = theoretical_envelope(target_mz, charge, range.compare_size, heavy_atom);
                scorer.prepare(&mut expected);

                let envelope = PeptideEnvelope::extract(
                    nearby,
                    target_mz,
                    charge,
                    range.left,
                    range.isotopes,
                    self.settings.extraction_tolerance,
                );
                let offset = match heavy_atom {
                    true => HEAVY_ATOM_OFFSET,
                    false => PLAIN_OFFSET,
                };

                for origin in 0..range.windows() {
                    let slice = &envelope.average_intensity[origin..origin + range.compare_size];
                    if slice.iter().all(|intensity| *intensity == 0.0) {
                        continue;
                    }
                    let mut observed = slice.to_vec();
                    scorer.prepare(&mut observed);

                    let score = scorer.score(&observed, &expected);
                    if !score.is_finite() {
                        debug!(
                            "rejecting degenerate score {} at m/z {:.4}, z={}, origin {}",
                            score, target_mz, charge, origin
                        );
                        continue;
                    }
                    scores.push(score);

                    let candidate = Candidate {
                        score,
                        charge,
                        heavy_atom,
                        mz: envelope.weighted_mz(origin + offset),
                    };

                    if scorer.improves(score, best_score) {
                        best_score = score;
                        if scorer.accept(score) {
                            best = Some(candidate);
                        }
                    }
                    if !heavy_atom
                        && scorer.accept(score)
                        && best_plain.map_or(true, |plain| scorer.improves(score, plain.score))
                    {
                        best_plain = Some(candidate);
                    }
                }
            }
        }

        if let (Some(winner), Some(plain)) = (best, best_plain) {
            if winner.heavy_atom && !scorer.keep_heavy_atom(winner.score, plain.score) {
                debug!(
                    "heavy atom hypothesis at m/z {:.4} not distinct enough ({} vs {})",
                    target_mz, winner.score, plain.score
                );
                best = Some(plain);
            }
        }

        if log::log_enabled!(log::Level::Debug) && scores.len() > 1 {
            scores.sort_by(|a, b| a.total_cmp(b));
            let margin = match scorer.higher_is_better() {
                true => scores[scores.len() - 1] - scores[scores.len() - 2],
                false => scores[1] - scores[0],
            };
            debug!("winning margin at m/z {:.4}: {}", target_mz, margin);
        }

        match best {
            Some(winner) => Assignment {
                charge: Some(winner.charge),
                mz: winner.mz.unwrap_or(target_mz),
                heavy_atom: winner.heavy_atom,
                score: Some(winner.score),
            },
            None => Assignment {
                charge: None,
                mz: target_mz,
                heavy_atom: false,
                score: None,
            },
        }
    }
}

/// Replace each precursor by one copy per charge in `range`
fn expand_charges(precursors: &[Precursor], range: ChargeRange) -> Vec<Precursor> {
    precursors
        .iter()
        .flat_map(|precursor| {
            range.iter().map(move |charge| Precursor {
                charge: Some(charge),
                ..precursor.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isotopes::{binomial, estimate_carbons};
    use crate::mass::{AVERAGINE_DIFF, C13_ABUNDANCE, PROTON};
    use crate::scan::Centroid;

    fn survey(scan_number: u32, peaks: Vec<Centroid>) -> Scan {
        Scan {
            scan_number,
            ms_order: 1,
            filter_line: "FTMS + p NSI Full ms [350.0000-1800.0000]".into(),
            centroids: peaks,
            ..Default::default()
        }
    }

    /// Noise-free carbon envelope with its monoisotopic peak at `mono`
    fn envelope(mono: f64, charge: u8) -> Vec<Centroid> {
        let carbons = estimate_carbons(mono, charge);
        (0..9)
            .map(|k| {
                Centroid::new(
                    mono + k as f64 * AVERAGINE_DIFF / charge as f64,
                    binomial(carbons, k, C13_ABUNDANCE) * 1e6,
                )
            })
            .collect()
    }

    #[test]
    fn charge_range_collapses_to_reported() {
        let settings = MonocleSettings::default();
        let monocle = Monocle::new(&settings);
        assert_eq!(monocle.charge_range(Some(3)), ChargeRange::single(3));
        assert_eq!(monocle.charge_range(None), ChargeRange::new(2, 6));
        assert_eq!(monocle.charge_range(Some(0)), ChargeRange::new(2, 6));

        let settings = MonocleSettings {
            charge_detection: true,
            ..Default::default()
        };
        let monocle = Monocle::new(&settings);
        assert_eq!(monocle.charge_range(Some(3)), ChargeRange::new(2, 6));
    }

    #[test]
    fn target_mz_resolution() {
        let mono = 2447.06 / 3.0 + PROTON;
        let parent = survey(1, envelope(mono, 3));
        let settings = MonocleSettings::default();
        let monocle = Monocle::new(&settings);

        // Isolation center unset: reported m/z is snapped onto the parent peak
        let precursor = Precursor {
            mz: mono + 0.01,
            ..Default::default()
        };
        assert_eq!(monocle.target_mz(&parent, &precursor), mono);

        // Nothing within 50 ppm: keep the isolation center
        let precursor = Precursor {
            mz: 500.0,
            isolation_mz: 816.5,
            isolation_width: 2.0,
            ..Default::default()
        };
        assert_eq!(monocle.target_mz(&parent, &precursor), 816.5);

        // Re-centered on the most intense peak of the window (M+1)
        let settings = MonocleSettings {
            use_most_intense: true,
            ..Default::default()
        };
        let monocle = Monocle::new(&settings);
        let apex = parent.centroids[1].mz;
        assert_eq!(monocle.target_mz(&parent, &precursor), apex);
    }

    #[test]
    fn recovers_injected_charge() {
        let mono = 2447.06 / 3.0 + PROTON;
        let ms1 = survey(1, envelope(mono, 3));
        let settings = MonocleSettings::default();
        let monocle = Monocle::new(&settings);

        for score_type in [ScoreType::DotProduct, ScoreType::ChiSquared] {
            let settings = MonocleSettings {
                score_type,
                ..Default::default()
            };
            let monocle = Monocle::new(&settings);
            let mut precursor = Precursor {
                mz: mono,
                isolation_mz: mono,
                isolation_width: 1.6,
                ..Default::default()
            };
            let assignment = monocle.assign_precursor(&[&ms1], &ms1, &mut precursor);
            assert_eq!(assignment.charge, Some(3), "{:?}", score_type);
            assert_eq!(precursor.charge, Some(3));
            assert!((precursor.mz - mono).abs() < 1e-9);
            assert!(!precursor.heavy_atom);
            assert!(precursor.isolation_specificity > 0.99);
        }

        // Isolated on the M+1 peak: the monoisotopic peak is one to the left
        let mut precursor = Precursor {
            mz: ms1.centroids[1].mz,
            isolation_mz: ms1.centroids[1].mz,
            ..Default::default()
        };
        monocle.assign_precursor(&[&ms1], &ms1, &mut precursor);
        assert_eq!(precursor.charge, Some(3));
        assert!((precursor.mz - mono).abs() < 1e-9);
    }

    #[test]
    fn empty_window_falls_back() {
        let ms1 = survey(1, vec![Centroid::new(500.0, 100.0)]);
        let settings = MonocleSettings {
            search_for_selenium: true,
            ..Default::default()
        };
        let monocle = Monocle::new(&settings);
        let mut precursor = Precursor {
            mz: 816.0,
            isolation_mz: 816.0,
            isolation_width: 2.0,
            heavy_atom: true,
            ..Default::default()
        };
        let assignment = monocle.assign_precursor(&[&ms1], &ms1, &mut precursor);
        assert_eq!(assignment.charge, None);
        assert_eq!(precursor.charge, None);
        assert_eq!(precursor.mz, 816.0);
        assert!(!precursor.heavy_atom);
        assert_eq!(precursor.isolation_specificity, 0.0);
    }

    #[test]
    fn expansion() {
        let precursors = vec![
            Precursor {
                mz: 600.0,
                ..Default::default()
            },
            Precursor {
                mz: 700.0,
                charge: Some(2),
                ..Default::default()
            },
        ];
        let expanded = expand_charges(&precursors, ChargeRange::new(2, 4));
        assert_eq!(expanded.len(), 6);
        assert_eq!(
            expanded.iter().map(|p| p.charge).collect::<Vec<_>>(),
            vec![Some(2), Some(3), Some(4), Some(2), Some(3), Some(4)]
        );
        assert!(expanded[..3].iter().all(|p| p.mz == 600.0));
    }
}
