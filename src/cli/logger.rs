//! Logger setup: file logging via `log4rs`, plus small colored-output
//! helpers for the CLI's own messages.

use clap::ArgMatches;
use colored::{ColoredString, Colorize};
use lazy_static::lazy_static;
use log::{info, LevelFilter};
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

static DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

lazy_static! {
    static ref PREFIX_ERR: ColoredString = "error".bright_red();
    static ref PREFIX_FATAL: ColoredString = "fatal".on_bright_red();
    static ref PREFIX_MATCH: ColoredString = "match".bright_green();
}

/// Initializes file logging if `--logfile` was passed; a no-op
/// otherwise (the CLI still prints its own output via `println!`).
pub fn init(matches: &ArgMatches) {
    let log_file = match matches.value_of("logfile") {
        Some(path) => path,
        None => return,
    };

    let log_level = match matches.value_of("loglevel") {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => DEFAULT_LOG_LEVEL,
    };

    let encoder = PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} - {m}{n}");
    let appender = match FileAppender::builder().encoder(Box::new(encoder)).build(log_file) {
        Ok(appender) => appender,
        Err(err) => panic!("Failed to build log file appender: {}", err),
    };

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(appender)))
        .build(Root::builder().appender("file").build(log_level));

    match config {
        Ok(config) => {
            if let Err(err) = log4rs::init_config(config) {
                panic!("Failed to initialize logger: {}", err);
            }
        }
        Err(err) => panic!("Failed to build logger configuration: {}", err),
    }

    info!("regex CLI logging initialized at {:?}", log_level);
}

pub fn err(string: &str) {
    eprintln!("{}: {}", *PREFIX_ERR, string);
}

pub fn fatal(string: &str) -> ! {
    eprintln!("{}: {}", *PREFIX_FATAL, string);
    std::process::exit(1);
}

pub fn match_found(string: &str) {
    println!("{}| {}", *PREFIX_MATCH, string);
}
