use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Filter-line marker of an ion trap (low resolution) acquisition
const LOW_RES_MARKER: &str = "ITMS";

/// A centroided peak
#[derive(PartialEq, PartialOrd, Copy, Clone, Default, Debug, Serialize, Deserialize)]
pub struct Centroid {
    pub mz: f64,
    pub intensity: f64,
}

impl Centroid {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaimsState {
    On,
    Off,
    #[default]
    Unknown,
}

/// An ion selected for fragmentation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    /// Reported (and, after assignment, monoisotopic) m/z
    pub mz: f64,
    #[serde(default)]
    pub intensity: f64,
    /// Charge state, `None` if the instrument did not report one
    #[serde(default)]
    pub charge: Option<u8>,
    /// Center of the isolation window, 0 if unset
    #[serde(default)]
    pub isolation_mz: f64,
    /// Full width of the isolation window, 0 if unknown
    #[serde(default)]
    pub isolation_width: f64,
    /// Whether the assigned isotope model carries a selenium atom
    #[serde(default)]
    pub heavy_atom: bool,
    /// Fraction of the isolation window's intensity explained by this precursor
    #[serde(default)]
    pub isolation_specificity: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scan {
    /// 1-based scan number, strictly increasing within a file
    pub scan_number: u32,
    /// MSn level
    pub ms_order: u8,
    /// Retention time, in minutes
    #[serde(default)]
    pub retention_time: f64,
    /// Instrument filter line, e.g. "FTMS + p NSI Full ms [350.00-1800.00]"
    #[serde(default)]
    pub filter_line: String,
    #[serde(default)]
    pub faims_state: FaimsState,
    /// FAIMS compensation voltage
    #[serde(default)]
    pub faims_cv: f64,
    /// Scan number of the parent survey scan, `<= 0` if not assigned
    #[serde(default)]
    pub precursor_scan_number: i32,
    /// Selected ions, if `ms_order > 1`
    #[serde(default)]
    pub precursors: Vec<Precursor>,
    /// Peaks, sorted by m/z in ascending order
    #[serde(default)]
    pub centroids: Vec<Centroid>,
}

impl Scan {
    /// Parent survey scan number, if one was assigned
    pub fn parent_scan(&self) -> Option<u32> {
        u32::try_from(self.precursor_scan_number)
            .ok()
            .filter(|n| *n > 0)
    }

    /// Was this scan acquired in a low-resolution analyzer?
    pub fn is_low_resolution(&self) -> bool {
        self.filter_line.contains(LOW_RES_MARKER)
    }

    /// Is this a full (survey) scan, as opposed to a targeted SIM/MSX scan?
    pub fn is_full_scan(&self) -> bool {
        self.filter_line.to_lowercase().contains("full")
    }

    pub fn faims_active(&self) -> bool {
        self.faims_state == FaimsState::On
    }

    /// Restore m/z ordering of the centroids after in-place edits
    pub fn sort_centroids(&mut self) {
        self.centroids.sort_by(|a, b| a.mz.total_cmp(&b.mz));
    }
}

/// Stable handles from scan number to position within a file's scan list.
///
/// Built once per file, so that lookups stay correct even if the scan
/// numbers are not contiguous.
#[derive(Debug, Default)]
pub struct ScanIndex {
    positions: FnvHashMap<u32, usize>,
}

impl ScanIndex {
    pub fn new(scans: &[Scan]) -> Self {
        let positions = scans
            .iter()
            .enumerate()
            .map(|(idx, scan)| (scan.scan_number, idx))
            .collect();
        Self { positions }
    }

    pub fn position(&self, scan_number: u32) -> Option<usize> {
        self.positions.get(&scan_number).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parent_linkage() {
        let mut scan = Scan {
            precursor_scan_number: 12,
            ..Default::default()
        };
        assert_eq!(scan.parent_scan(), Some(12));
        scan.precursor_scan_number = 0;
        assert_eq!(scan.parent_scan(), None);
        scan.precursor_scan_number = -1;
        assert_eq!(scan.parent_scan(), None);
    }

    #[test]
    fn filter_line() {
        let scan = Scan {
            filter_line: "ITMS + c NSI r d Full ms2 600.34@cid35.00".into(),
            ..Default::default()
        };
        assert!(scan.is_low_resolution());
        assert!(scan.is_full_scan());

        let sim = Scan {
            filter_line: "FTMS + p NSI SIM ms [500.00-520.00]".into(),
            ..Default::default()
        };
        assert!(!sim.is_low_resolution());
        assert!(!sim.is_full_scan());
    }

    #[test]
    fn index_handles_gaps() {
        let scans = [1, 2, 5, 9]
            .iter()
            .map(|&n| Scan {
                scan_number: n,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let index = ScanIndex::new(&scans);
        assert_eq!(index.len(), 4);
        assert_eq!(index.position(5), Some(2));
        assert_eq!(index.position(9), Some(3));
        assert_eq!(index.position(3), None);
    }

    #[test]
    fn deserialize_with_defaults() {
        let json = r#"{
            "scan_number": 3,
            "ms_order": 2,
            "precursor_scan_number": 1,
            "precursors": [{ "mz": 816.69, "isolation_width": 1.6 }]
        }"#;
        let scan: Scan = serde_json::from_str(json).unwrap();
        assert_eq!(scan.faims_state, FaimsState::Unknown);
        assert_eq!(scan.precursors[0].charge, None);
        assert_eq!(scan.precursors[0].isolation_mz, 0.0);
        assert!(scan.centroids.is_empty());
    }
}
