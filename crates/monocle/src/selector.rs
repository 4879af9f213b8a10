use crate::scan::Scan;
use crate::settings::MonocleSettings;

/// Should `scan` be averaged together with the parent scan `parent`?
///
/// Only survey scans qualify. Under FAIMS, the compensation voltage must match
/// the parent's, and targeted (SIM/MSX) survey scans are never mixed in.
pub fn include_scan(scan: &Scan, parent: &Scan) -> bool {
    if scan.ms_order != 1 {
        return false;
    }
    if scan.faims_active() && scan.faims_cv != parent.faims_cv {
        return false;
    }
    // The filter line is used here since the scan type is not always known
    if scan.scan_number != parent.scan_number && !scan.is_full_scan() {
        return false;
    }
    true
}

/// Collect the survey scans to average around the parent scan at position
/// `parent` of `scans`.
///
/// Walks backward from the parent (which counts towards the "before" side)
/// and then forward, stopping on each side once
/// `number_of_scans_to_average` eligible scans were found. The result is
/// ordered by increasing scan number and holds at most twice the window.
pub fn nearby_scans<'s>(scans: &'s [Scan], parent: usize, settings: &MonocleSettings) -> Vec<&'s Scan> {
    let target = match scans.get(parent) {
        Some(target) => target,
        None => return Vec::new(),
    };
    let window = settings.number_of_scans_to_average.max(1);
    let direction = settings.averaging_vector;

    let mut before = Vec::with_capacity(window);
    if direction.includes_before() {
        before.extend(
            scans[..=parent]
                .iter()
                .rev()
                .filter(|scan| include_scan(scan, target))
                .take(window),
        );
        before.reverse();
    } else if include_scan(target, target) {
        before.push(target);
    }

    let mut output = before;
    if direction.includes_after() {
        output.extend(
            scans[parent + 1..]
                .iter()
                .filter(|scan| include_scan(scan, target))
                .take(window),
        );
    }
    output
}
