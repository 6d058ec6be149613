//! Oxyfloat cache loader.
//!
//! Fills a fixed cache file with float profiles. The file is named after the constraints used to
//! build it, so later queries against it can not ask for more than it holds.

use std::{error::Error, path::PathBuf};

use clap::{crate_version, value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use oxyfloat::{
    default_cache_file, fixed_cache_file_name, CacheConstraints, Collector, Config, Constraint,
    OxyfloatErr, Verbosity,
};

fn main() {
    if let Err(ref e) = run() {
        println!("error: {}", e);

        let mut err: &dyn Error = e;
        while let Some(cause) = err.source() {
            println!("caused by: {}", cause);
            err = cause;
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), OxyfloatErr> {
    let matches = new_app().get_matches();

    let constraints = constraints(&matches);
    let cache_file = cache_file(&matches, &constraints);
    let verbosity = matches
        .get_one::<u8>("verbose")
        .copied()
        .map(Verbosity::from_level)
        .unwrap_or_default();

    println!("Loading cache file {}...", cache_file.display());
    let config = Config::default()
        .with_verbosity(verbosity)
        .with_cache_file(&cache_file);
    let collector = Collector::new(config)?;

    let wmos: Vec<String> = match matches.get_one::<i64>("age") {
        Some(&age) => collector.oxygen_floats(age)?,
        None => matches
            .get_many::<String>("wmos")
            .map(|ids| ids.cloned().collect())
            .unwrap_or_default(),
    };

    collector.collect(
        &wmos,
        constraints.get(Constraint::Profiles),
        constraints.get(Constraint::Pressure),
        false,
    )?;

    println!("Finished loading cache file {}", cache_file.display());

    Ok(())
}

fn new_app() -> Command {
    Command::new("oxyload")
        .about("Load a local cache file with Argo float oxygen data.")
        .long_about(concat!(
            "Load a local cache file with Argo float oxygen data.\n\n",
            "The default cache file is put in the directory of the default cache and is named ",
            "with the constraints used to build it."
        ))
        .version(crate_version!())
        .arg(
            Arg::new("age")
                .long("age")
                .value_name("AGE")
                .value_parser(value_parser!(i64))
                .help("Select floats with an age greater than or equal to this."),
        )
        .arg(
            Arg::new("wmos")
                .long("wmos")
                .value_name("WMO")
                .num_args(1..)
                .action(ArgAction::Append)
                .help("One or more WMO numbers."),
        )
        .group(
            ArgGroup::new("floats")
                .args(["age", "wmos"])
                .required(true),
        )
        .arg(
            Arg::new("profiles")
                .long("profiles")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Maximum number of profiles per float."),
        )
        .arg(
            Arg::new("pressure")
                .long("pressure")
                .value_name("DBAR")
                .value_parser(value_parser!(u64))
                .help("Select pressures less than this value."),
        )
        .arg(
            Arg::new("cache-file")
                .long("cache-file")
                .value_name("NAME")
                .help("Override the constructed cache file name."),
        )
        .arg(
            Arg::new("cache-dir")
                .long("cache-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory for the cache file.")
                .long_help("Directory for the cache file. Defaults to '${HOME}/oxyfloat/'"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_name("LEVEL")
                .num_args(0..=1)
                .default_value("0")
                .default_missing_value("2")
                .value_parser(value_parser!(u8).range(0..=3))
                .help("0: ERROR, 1: WARN, 2: INFO, 3: DEBUG"),
        )
        .after_help(concat!(
            "Examples:\n",
            "  oxyload --age 340 --profiles 20\n",
            "  oxyload --age 340 --pressure 10\n",
            "  oxyload --wmos 1900650 1901157 --profiles 5"
        ))
}

fn constraints(matches: &ArgMatches) -> CacheConstraints {
    let mut constraints = CacheConstraints::default();
    constraints.set(Constraint::Age, matches.get_one::<i64>("age").map(|&a| a.max(0) as u64));
    constraints.set(Constraint::Profiles, matches.get_one::<u64>("profiles").copied());
    constraints.set(Constraint::Pressure, matches.get_one::<u64>("pressure").copied());
    constraints
}

fn cache_file(matches: &ArgMatches, constraints: &CacheConstraints) -> PathBuf {
    let name = matches
        .get_one::<String>("cache-file")
        .cloned()
        .unwrap_or_else(|| fixed_cache_file_name(constraints));

    let dir = matches
        .get_one::<PathBuf>("cache-dir")
        .cloned()
        .or_else(|| default_cache_file().parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    dir.join(name)
}
