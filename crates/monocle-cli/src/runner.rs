use super::input::Search;
use anyhow::{anyhow, ensure, Context};
use log::info;
use monocle_core::io::JsonScans;
use monocle_core::monocle::RunSummary;
use monocle_core::processor::{BatchReport, FileProcessor, Progress, Stage};
use std::path::PathBuf;
use std::time::Instant;

pub struct Runner {
    pub parameters: Search,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();
        log::trace!("{}", serde_json::to_string_pretty(&parameters.settings)?);
        Ok(Self { parameters, start })
    }

    fn log_progress(progress: Progress) {
        match progress.stage {
            Stage::Started => info!("- processing {}", progress.path.display()),
            Stage::AllFinished => info!("all files processed"),
            Stage::Failed => log::warn!("- skipped {}", progress.path.display()),
            stage => log::debug!(
                "{}: {:?} ({:.0}%)",
                progress.path.display(),
                stage,
                progress.fraction * 100.0
            ),
        }
    }

    /// Process every input file on a background worker and wait for it.
    /// `results.json` is written even if some files failed; the failures are
    /// then reported as an error.
    pub fn run(mut self) -> anyhow::Result<BatchReport> {
        let mut processor = FileProcessor::new(
            self.parameters.settings,
            JsonScans,
            self.parameters.output_directory.clone(),
        );
        processor.convert_only = self.parameters.convert_only;

        let paths = self
            .parameters
            .input_paths
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<_>>();

        let batch = processor
            .spawn(paths, Self::log_progress)
            .join()
            .map_err(|_| anyhow!("processing thread panicked"))??;

        let total = batch.reports.iter().fold(RunSummary::default(), |acc, r| RunSummary {
            fragment_scans: acc.fragment_scans + r.summary.fragment_scans,
            skipped_scans: acc.skipped_scans + r.summary.skipped_scans,
            expanded_scans: acc.expanded_scans + r.summary.expanded_scans,
            searched_precursors: acc.searched_precursors + r.summary.searched_precursors,
            assigned_precursors: acc.assigned_precursors + r.summary.assigned_precursors,
        });
        info!(
            "assigned {}/{} precursors across {} files",
            total.assigned_precursors,
            total.searched_precursors,
            batch.reports.len()
        );

        self.parameters.output_paths = batch
            .reports
            .iter()
            .map(|r| r.output.display().to_string())
            .collect();

        let path = self.parameters.output_directory.join("results.json");
        let json = serde_json::to_string_pretty(&self.parameters)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        info!("wrote {}", path.display());

        let run_time = (Instant::now() - self.start).as_secs_f32();
        info!("finished in {}s", run_time);

        ensure!(
            batch.is_complete(),
            "{} of {} files could not be processed: {}",
            batch.failures.len(),
            batch.failures.len() + batch.reports.len(),
            batch
                .failures
                .iter()
                .map(|(path, e)| format!("`{}` ({})", path.display(), e))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(batch)
    }
}
