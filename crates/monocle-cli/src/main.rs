use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use monocle_cli::input::Input;
use monocle_cli::runner::Runner;
use rayon::ThreadPoolBuilder;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("monocle")
        .version(clap::crate_version!())
        .about("Assign monoisotopic m/z and charge state to MS/MS precursors")
        .arg(
            Arg::new("input_paths")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Paths to scan files to process. Overrides input files listed in the \
                     configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("parameters")
                .short('p')
                .long("parameters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output-directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where updated scan files will be written. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of worker threads (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("charge-detection")
                .long("charge-detection")
                .action(ArgAction::SetTrue)
                .help("Search all charges in `charge_range`, even if one was reported"),
        )
        .arg(
            Arg::new("use-most-intense")
                .long("use-most-intense")
                .action(ArgAction::SetTrue)
                .help("Re-center precursors on the most intense peak of the isolation window"),
        )
        .arg(
            Arg::new("selenium")
                .long("selenium")
                .action(ArgAction::SetTrue)
                .help("Also test isotope envelopes carrying a selenium atom"),
        )
        .arg(
            Arg::new("convert-only")
                .long("convert-only")
                .action(ArgAction::SetTrue)
                .help("Only convert the input files, without assigning precursors"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("debug")
                .help("Only log errors"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Log scoring diagnostics"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let filter = match (matches.get_flag("quiet"), matches.get_flag("debug")) {
        (true, _) => "error",
        (_, true) => "error,monocle=debug",
        _ => "error,monocle=info",
    };
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("MONOCLE_LOG", filter))
        .init();

    let threads = matches
        .get_one::<u16>("threads")
        .copied()
        .map(usize::from)
        .unwrap_or_else(num_cpus::get);
    ThreadPoolBuilder::new().num_threads(threads).build_global()?;

    let input = Input::from_arguments(matches)?;

    let batch = input.build().and_then(Runner::new)?.run()?;
    log::debug!("processed {} files", batch.reports.len());

    Ok(())
}
