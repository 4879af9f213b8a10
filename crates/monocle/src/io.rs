//! Boundary with the file formats. Assignment never performs I/O itself:
//! readers produce a file's scans in acquisition order and writers receive
//! them back once precursors were updated.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::scan::Scan;
use crate::Error;

pub trait ScanReader: Send + Sync {
    /// Read every scan of the file at `path`, ordered by scan number
    fn read(&self, path: &Path) -> Result<Vec<Scan>, Error>;
}

pub trait ScanWriter: Send + Sync {
    /// Where the output for `input` should be written, inside `directory`
    fn output_path(&self, input: &Path, directory: &Path) -> PathBuf;

    fn write(&self, path: &Path, scans: &[Scan]) -> Result<(), Error>;
}

/// Scans serialized as a JSON array
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonScans;

impl JsonScans {
    pub const EXTENSION: &'static str = "json";
}

impl ScanReader for JsonScans {
    fn read(&self, path: &Path) -> Result<Vec<Scan>, Error> {
        let reader = BufReader::new(File::open(path)?);
        let mut scans: Vec<Scan> = serde_json::from_reader(reader)?;
        for scan in scans.iter_mut() {
            scan.sort_centroids();
        }
        scans.sort_by_key(|scan| scan.scan_number);
        Ok(scans)
    }
}

impl ScanWriter for JsonScans {
    fn output_path(&self, input: &Path, directory: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scans".into());
        directory.join(format!("{}.monocle.{}", stem, Self::EXTENSION))
    }

    fn write(&self, path: &Path, scans: &[Scan]) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, scans)?;
        writer.flush()?;
        Ok(())
    }
}

/// Pick a reader for `path` based on its extension
pub fn reader_for(path: &Path) -> Result<Box<dyn ScanReader>, Error> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        JsonScans::EXTENSION => Ok(Box::new(JsonScans)),
        _ => Err(Error::Unsupported(path.display().to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scan::Centroid;
    use tempfile::TempDir;

    #[test]
    fn output_naming() {
        let path = JsonScans.output_path(Path::new("/data/run_01.json"), Path::new("/out"));
        assert_eq!(path, PathBuf::from("/out/run_01.monocle.json"));
    }

    #[test]
    fn reader_dispatch() {
        assert!(reader_for(Path::new("run.JSON")).is_ok());
        assert!(matches!(
            reader_for(Path::new("run.raw")),
            Err(Error::Unsupported(_))
        ));
        assert!(reader_for(Path::new("run")).is_err());
    }

    #[test]
    fn round_trip_restores_order() -> Result<(), Error> {
        let dir = TempDir::new()?;
        let path = dir.path().join("scans.json");

        let scans = vec![
            Scan {
                scan_number: 2,
                ms_order: 1,
                centroids: vec![Centroid::new(600.0, 1.0), Centroid::new(400.0, 2.0)],
                ..Default::default()
            },
            Scan {
                scan_number: 1,
                ms_order: 1,
                ..Default::default()
            },
        ];
        JsonScans.write(&path, &scans)?;
        let read = JsonScans.read(&path)?;

        assert_eq!(read.len(), 2);
        assert_eq!(read[0].scan_number, 1);
        assert_eq!(read[1].centroids[0].mz, 400.0);
        Ok(())
    }
}
