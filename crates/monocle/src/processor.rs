use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use log::{error, info};

use crate::io::{reader_for, ScanReader, ScanWriter};
use crate::monocle::{Monocle, RunSummary};
use crate::settings::MonocleSettings;
use crate::Error;

/// Cooperative cancellation flag, checked between files and between precursors
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), Error> {
        match self.is_cancelled() {
            true => Err(Error::Cancelled),
            false => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Started,
    Read,
    Processed,
    Written,
    Finished,
    /// The file could not be processed, and was skipped
    Failed,
    /// Sent once, after the last file
    AllFinished,
}

impl Stage {
    /// Position of the stage within a single file's pipeline
    fn step(&self) -> usize {
        match self {
            Stage::Started => 0,
            Stage::Read => 1,
            Stage::Processed => 2,
            Stage::Written => 3,
            Stage::Finished | Stage::Failed | Stage::AllFinished => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    pub path: PathBuf,
    pub stage: Stage,
    /// Overall completion across all files, in [0, 1]
    pub fraction: f64,
}

/// Summary of a processed file
#[derive(Clone, Debug, PartialEq)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub scans: usize,
    pub summary: RunSummary,
}

/// Outcome of a batch of files. A file that fails is skipped, and the
/// remaining files are still processed.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<FileReport>,
    pub failures: Vec<(PathBuf, Error)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs read -> assign -> write for each file in turn
pub struct FileProcessor<W> {
    pub settings: MonocleSettings,
    pub writer: W,
    pub output_directory: PathBuf,
    /// Only convert files, don't assign precursors
    pub convert_only: bool,
    cancel: CancelToken,
}

impl<W: ScanWriter> FileProcessor<W> {
    pub fn new(settings: MonocleSettings, writer: W, output_directory: PathBuf) -> Self {
        Self {
            settings,
            writer,
            output_directory,
            convert_only: false,
            cancel: CancelToken::new(),
        }
    }

    /// Token that can be used to stop the processor from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn progress(path: &Path, stage: Stage, completed: usize, files: usize) -> Progress {
        let fraction = match files {
            0 => 1.0,
            n => ((stage.step() + 4 * completed) as f64 / (4 * n) as f64).min(1.0),
        };
        Progress {
            path: path.to_path_buf(),
            stage,
            fraction,
        }
    }

    /// Process every file in `paths`, reporting progress through `on_progress`.
    ///
    /// Errors only abort the file they occurred in. Cancellation stops the
    /// whole batch and is returned as `Err`.
    pub fn run<P, F>(&self, paths: &[P], mut on_progress: F) -> Result<BatchReport, Error>
    where
        P: AsRef<Path>,
        F: FnMut(Progress),
    {
        let mut batch = BatchReport::default();
        for (completed, path) in paths.iter().enumerate() {
            self.cancel.check()?;
            let path = path.as_ref();
            on_progress(Self::progress(path, Stage::Started, completed, paths.len()));

            let result = reader_for(path).and_then(|reader| {
                self.process_file(&*reader, path, |stage| {
                    on_progress(Self::progress(path, stage, completed, paths.len()))
                })
            });
            match result {
                Ok(report) => batch.reports.push(report),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    error!("failed to process {}: {}", path.display(), e);
                    on_progress(Self::progress(path, Stage::Failed, completed, paths.len()));
                    batch.failures.push((path.to_path_buf(), e));
                }
            }
        }
        if let Some(last) = paths.last() {
            on_progress(Self::progress(
                last.as_ref(),
                Stage::AllFinished,
                paths.len() - 1,
                paths.len(),
            ));
        }
        Ok(batch)
    }

    /// Read, assign and write a single file. The file's scans are dropped
    /// before this returns, so nothing is shared with the next file.
    pub fn process_file<R, F>(&self, reader: &R, path: &Path, mut on_stage: F) -> Result<FileReport, Error>
    where
        R: ScanReader + ?Sized,
        F: FnMut(Stage),
    {
        let start = Instant::now();
        let mut scans = reader.read(path)?;
        info!("read {} scans from {} in {:#?}", scans.len(), path.display(), start.elapsed());
        on_stage(Stage::Read);

        let summary = if self.convert_only {
            RunSummary::default()
        } else {
            let start = Instant::now();
            let summary = Monocle::new(&self.settings).run(&mut scans, &self.cancel)?;
            info!(
                "assigned {}/{} precursors of {} MS{} scans in {:#?} ({} skipped, {} expanded)",
                summary.assigned_precursors,
                summary.searched_precursors,
                summary.fragment_scans,
                self.settings.ms_level,
                start.elapsed(),
                summary.skipped_scans,
                summary.expanded_scans
            );
            summary
        };
        on_stage(Stage::Processed);

        let output = self.writer.output_path(path, &self.output_directory);
        self.writer.write(&output, &scans)?;
        info!("wrote {}", output.display());
        on_stage(Stage::Written);

        let report = FileReport {
            input: path.to_path_buf(),
            output,
            scans: scans.len(),
            summary,
        };
        drop(scans);
        on_stage(Stage::Finished);
        Ok(report)
    }
}

impl<W: ScanWriter + 'static> FileProcessor<W> {
    /// Run the whole pipeline on a background thread, so that the caller
    /// stays responsive. Progress is pushed through `on_progress`.
    pub fn spawn<F>(self, paths: Vec<PathBuf>, on_progress: F) -> JoinHandle<Result<BatchReport, Error>>
    where
        F: FnMut(Progress) + Send + 'static,
    {
        std::thread::spawn(move || self.run(&paths, on_progress))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::JsonScans;
    use crate::scan::Scan;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory writer, keeps the last written scans
    #[derive(Default)]
    struct Capture(Mutex<Vec<Scan>>);

    impl ScanWriter for Capture {
        fn output_path(&self, input: &Path, directory: &Path) -> PathBuf {
            directory.join(input.file_name().unwrap_or_default())
        }

        fn write(&self, _: &Path, scans: &[Scan]) -> Result<(), Error> {
            *self.0.lock().unwrap() = scans.to_vec();
            Ok(())
        }
    }

    struct Fixed(Vec<Scan>);

    impl ScanReader for Fixed {
        fn read(&self, _: &Path) -> Result<Vec<Scan>, Error> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn stages_in_order() -> Result<(), Error> {
        let scans = vec![Scan {
            scan_number: 1,
            ms_order: 1,
            ..Default::default()
        }];
        let processor = FileProcessor::new(MonocleSettings::default(), Capture::default(), "/out".into());

        let mut stages = Vec::new();
        let report = processor.process_file(&Fixed(scans), Path::new("a.json"), |s| stages.push(s))?;
        assert_eq!(stages, vec![Stage::Read, Stage::Processed, Stage::Written, Stage::Finished]);
        assert_eq!(report.output, PathBuf::from("/out/a.json"));
        assert_eq!(report.scans, 1);
        assert_eq!(processor.writer.0.lock().unwrap().len(), 1);
        Ok(())
    }

    #[test]
    fn progress_fraction() {
        let p = FileProcessor::<Capture>::progress(Path::new("a"), Stage::Read, 0, 2);
        assert_eq!(p.fraction, 1.0 / 8.0);
        let p = FileProcessor::<Capture>::progress(Path::new("b"), Stage::Finished, 1, 2);
        assert_eq!(p.fraction, 1.0);
    }

    #[test]
    fn cancelled_before_start() {
        let processor = FileProcessor::new(MonocleSettings::default(), Capture::default(), "/out".into());
        let token = processor.cancel_token();
        token.cancel();
        let mut seen = 0;
        let result = processor.run(&["a.json"], |_| seen += 1);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(seen, 0);
    }

    #[test]
    fn unsupported_file() -> Result<(), Error> {
        let processor = FileProcessor::new(MonocleSettings::default(), Capture::default(), "/out".into());
        let batch = processor.run(&["a.raw"], |_| {})?;
        assert!(batch.reports.is_empty());
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[0].1, Error::Unsupported(_)));
        Ok(())
    }

    #[test]
    fn failed_file_does_not_stop_batch() -> Result<(), Error> {
        let dir = TempDir::new()?;
        let missing = dir.path().join("missing.json");
        let good = dir.path().join("good.json");
        let scans = vec![Scan {
            scan_number: 1,
            ms_order: 1,
            ..Default::default()
        }];
        JsonScans.write(&good, &scans)?;

        let processor = FileProcessor::new(MonocleSettings::default(), JsonScans, dir.path().into());
        let mut stages = Vec::new();
        let batch = processor.run(&[&missing, &good], |p| stages.push(p.stage))?;

        assert!(!batch.is_complete());
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].0, missing);
        assert!(matches!(batch.failures[0].1, Error::Io(_)));

        assert_eq!(batch.reports.len(), 1);
        assert_eq!(batch.reports[0].input, good);
        assert!(dir.path().join("good.monocle.json").exists());
        assert_eq!(stages[..2], [Stage::Started, Stage::Failed]);
        assert_eq!(stages.last(), Some(&Stage::AllFinished));
        Ok(())
    }
}
