use anyhow::{ensure, Context};
use clap::ArgMatches;
use monocle_core::mass::Tolerance;
use monocle_core::scoring::ScoreType;
use monocle_core::settings::{AveragingVector, ChargeRange, MonocleSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub settings: MonocleSettings,
    pub convert_only: bool,
    pub input_paths: Vec<String>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Default)]
/// Input parameters deserialized from JSON file
pub struct Input {
    averaging_vector: Option<AveragingVector>,
    number_of_scans_to_average: Option<usize>,
    charge_detection: Option<bool>,
    charge_range: Option<(u8, u8)>,
    charge_range_unknown: Option<(u8, u8)>,
    ms_level: Option<u8>,
    use_most_intense: Option<bool>,
    force_charges: Option<bool>,
    skip_mono: Option<bool>,
    #[serde(alias = "selenium")]
    search_for_selenium: Option<bool>,
    score_type: Option<ScoreType>,
    extraction_tol: Option<Tolerance>,
    convert_only: Option<bool>,
    output_directory: Option<String>,
    input_paths: Option<Vec<String>>,
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let mut input = match matches.get_one::<String>("parameters") {
            Some(path) => Input::load(path)
                .with_context(|| format!("Failed to read parameters from `{path}`"))?,
            None => Input::default(),
        };

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(input_paths) = matches.get_many::<String>("input_paths") {
            log::trace!("overriding `input_paths` parameter.");
            input.input_paths = Some(input_paths.into_iter().map(|p| p.into()).collect());
        }

        // Switches can only turn an option on
        let switches = [
            ("charge-detection", &mut input.charge_detection),
            ("use-most-intense", &mut input.use_most_intense),
            ("selenium", &mut input.search_for_selenium),
            ("convert-only", &mut input.convert_only),
        ];
        for (name, field) in switches {
            if matches.get_flag(name) {
                log::trace!("overriding `{}` parameter.", name);
                *field = Some(true);
            }
        }

        ensure!(
            input.input_paths.as_ref().map_or(false, |p| !p.is_empty()),
            "`input_paths` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        monocle_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    fn check_tolerance(tolerance: &Tolerance) {
        let (lo, hi) = match tolerance {
            Tolerance::Ppm(lo, hi) => (*lo, *hi),
            Tolerance::Da(lo, hi) => (*lo, *hi),
        };
        if lo > hi {
            log::warn!("Extraction tolerance is empty: [{} - {}]", lo, hi);
        }
        if let Tolerance::Ppm(..) = tolerance {
            if hi - lo > 100.0 {
                log::warn!(
                    "Extraction tolerance of [{} - {}] ppm is wider than expected for survey scans",
                    lo,
                    hi
                );
            }
        }
    }

    fn charge_range(range: Option<(u8, u8)>, default: ChargeRange, name: &str) -> anyhow::Result<ChargeRange> {
        let range = range.map(ChargeRange::from).unwrap_or(default);
        ensure!(range.low > 0, "`{}` must start at a charge of at least 1", name);
        if range.is_empty() {
            log::warn!(
                "`{}` is empty ({} > {}), no charge will be searched",
                name,
                range.low,
                range.high
            );
        }
        Ok(range)
    }

    pub fn build(self) -> anyhow::Result<Search> {
        let default = MonocleSettings::default();

        let number_of_scans_to_average = self
            .number_of_scans_to_average
            .unwrap_or(default.number_of_scans_to_average);
        if number_of_scans_to_average == 0 {
            log::warn!("`number_of_scans_to_average: 0` averages the parent scan only");
        }

        let ms_level = self.ms_level.unwrap_or(default.ms_level);
        ensure!(ms_level >= 2, "`ms_level` must be 2 or higher, got {}", ms_level);

        let extraction_tolerance = self.extraction_tol.unwrap_or(default.extraction_tolerance);
        Self::check_tolerance(&extraction_tolerance);

        let settings = MonocleSettings {
            averaging_vector: self.averaging_vector.unwrap_or(default.averaging_vector),
            number_of_scans_to_average,
            charge_detection: self.charge_detection.unwrap_or(default.charge_detection),
            charge_range: Self::charge_range(self.charge_range, default.charge_range, "charge_range")?,
            charge_range_unknown: Self::charge_range(
                self.charge_range_unknown,
                default.charge_range_unknown,
                "charge_range_unknown",
            )?,
            ms_level,
            use_most_intense: self.use_most_intense.unwrap_or(default.use_most_intense),
            force_charges: self.force_charges.unwrap_or(default.force_charges),
            skip_mono: self.skip_mono.unwrap_or(default.skip_mono),
            search_for_selenium: self.search_for_selenium.unwrap_or(default.search_for_selenium),
            score_type: self.score_type.unwrap_or(default.score_type),
            extraction_tolerance,
        };

        if settings.skip_mono && !settings.force_charges {
            log::warn!("`skip_mono: true` without `force_charges` only affects low resolution scans");
        }

        let input_paths = self.input_paths.unwrap_or_default();
        let output_directory = PathBuf::from(self.output_directory.unwrap_or_else(|| ".".into()));
        std::fs::create_dir_all(&output_directory).with_context(|| {
            format!("Failed to create output directory `{}`", output_directory.display())
        })?;

        Ok(Search {
            version: clap::crate_version!().into(),
            settings,
            convert_only: self.convert_only.unwrap_or(false),
            input_paths,
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
