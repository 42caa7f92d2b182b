//! CLI orchestration: argument parsing, optional configuration file,
//! logger init, then compile-and-search against the public `Regex`
//! facade.

mod configuration;
mod logger;

use std::{fs, path::Path, process};

use clap::{App, Arg, ArgMatches};
use colored::Colorize;
use log::info;

use crate::core::error::Error;
use crate::core::regex::{Options, Regex};

pub fn run() {
    let matches = build_app();

    logger::init(&matches);

    let options = resolve_options(&matches);

    let pattern = matches.value_of("pattern").unwrap();
    let input = match read_input(&matches) {
        Ok(input) => input,
        Err(message) => logger::fatal(&message),
    };

    let regex = match Regex::with_options(pattern, options) {
        Ok(regex) => regex,
        Err(err) => print_error_and_exit(&err),
    };

    info!("compiled pattern \"{}\"", pattern);

    let found = match regex.matches(&input) {
        Ok(found) => found,
        Err(err) => print_error_and_exit(&err),
    };

    if found.is_empty() {
        println!("{}", "no matches".yellow());
        return;
    }

    for (i, m) in found.iter().enumerate() {
        logger::match_found(&format!(
            "[{}..{}) {}",
            m.range.start,
            m.range.end,
            m.text.bright_green()
        ));

        for (group_index, group) in m.groups.iter().enumerate() {
            match group {
                Some(group) => println!(
                    "  group {}: [{}..{}) {}",
                    group_index + 1,
                    group.range.start,
                    group.range.end,
                    group.text.cyan()
                ),
                None => println!("  group {}: (did not participate)", group_index + 1),
            }
        }

        if i + 1 != found.len() {
            println!();
        }
    }
}

fn resolve_options(matches: &ArgMatches) -> Options {
    let mut options = match matches.value_of("config") {
        None => Options::default(),
        Some(path) => match configuration::read_configuration(Path::new(path)) {
            Ok(config) => config.into_options(),
            Err(err) => logger::fatal(&format!(
                "Failed to load configuration \"{}\": {}",
                path, err
            )),
        },
    };

    if matches.is_present("case-insensitive") {
        options.case_insensitive = true;
    }
    if matches.is_present("multiline") {
        options.multiline = true;
    }
    if matches.is_present("dot-all") {
        options.dot_matches_line_separators = true;
    }
    if let Some(budget) = matches.value_of("iteration-budget") {
        match budget.parse::<usize>() {
            Ok(budget) => options.iteration_budget = budget,
            Err(_) => logger::err(&format!(
                "Invalid iteration budget '{}', keeping default",
                budget
            )),
        }
    }

    options
}

fn read_input(matches: &ArgMatches) -> Result<String, String> {
    if let Some(text) = matches.value_of("input") {
        return Ok(text.to_string());
    }

    if let Some(path) = matches.value_of("file") {
        return fs::read_to_string(path)
            .map_err(|err| format!("Could not read input file \"{}\": {}", path, err));
    }

    Err("one of INPUT or --file is required".to_string())
}

fn print_error_and_exit(err: &Error) -> ! {
    logger::err(&err.render());
    process::exit(1);
}

fn build_app<'a>() -> ArgMatches<'a> {
    App::new("regex")
        .version("0.1.0")
        .author("regex crate contributors")
        .about("Matches a pattern against text using a backtracking regex engine")
        .arg(
            Arg::with_name("pattern")
                .help("Pattern to compile")
                .value_name("PATTERN")
                .required(true),
        )
        .arg(
            Arg::with_name("input")
                .help("Text to search (mutually exclusive with --file)")
                .value_name("INPUT")
                .conflicts_with("file"),
        )
        .arg(
            Arg::with_name("file")
                .short("f")
                .long("file")
                .help("Reads the search text from a file instead of INPUT")
                .takes_value(true)
                .value_name("PATH"),
        )
        .arg(
            Arg::with_name("case-insensitive")
                .short("i")
                .long("case-insensitive")
                .help("Matches case-insensitively"),
        )
        .arg(
            Arg::with_name("multiline")
                .short("m")
                .long("multiline")
                .help("Anchors '^' to the start of each line instead of the whole input"),
        )
        .arg(
            Arg::with_name("dot-all")
                .short("s")
                .long("dot-all")
                .help("Makes '.' match line separators too"),
        )
        .arg(
            Arg::with_name("iteration-budget")
                .long("iteration-budget")
                .help("Overrides the matcher's per-search iteration ceiling")
                .takes_value(true)
                .value_name("N"),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("Loads default options from a YAML configuration file")
                .takes_value(true)
                .value_name("PATH"),
        )
        .arg(
            Arg::with_name("logfile")
                .long("logfile")
                .help("Writes structured logs to this file")
                .takes_value(true)
                .value_name("PATH"),
        )
        .arg(
            Arg::with_name("loglevel")
                .long("loglevel")
                .help("Sets the log level when --logfile is given")
                .takes_value(true)
                .possible_values(&["error", "warn", "info", "debug", "trace"]),
        )
        .get_matches()
}
