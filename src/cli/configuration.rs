//! Optional CLI configuration file, read with `serde_yaml`: a flat set
//! of `Options` overrides layered over the built-in defaults.

use std::{
    error, fmt,
    fs::File,
    io::Read,
    path::Path,
};

use serde::Deserialize;

use crate::core::regex::Options;

#[derive(Debug, Deserialize, Default)]
pub struct Configuration {
    pub case_insensitive: Option<bool>,
    pub multiline: Option<bool>,
    pub dot_matches_line_separators: Option<bool>,
    pub iteration_budget: Option<usize>,
}

impl Configuration {
    /// Layers this configuration's set fields over `Options::default()`.
    pub fn into_options(self) -> Options {
        let defaults = Options::default();
        Options {
            case_insensitive: self.case_insensitive.unwrap_or(defaults.case_insensitive),
            multiline: self.multiline.unwrap_or(defaults.multiline),
            dot_matches_line_separators: self
                .dot_matches_line_separators
                .unwrap_or(defaults.dot_matches_line_separators),
            iteration_budget: self.iteration_budget.unwrap_or(defaults.iteration_budget),
        }
    }
}

pub fn read_configuration(path: &Path) -> Result<Configuration, ConfigurationError> {
    let mut conf_str = String::new();

    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut conf_str))
        .map_err(|err| {
            ConfigurationError::Io(format!(
                "Could not read configuration file \"{}\": {}",
                path.to_string_lossy(),
                err
            ))
        })?;

    Ok(serde_yaml::from_str(&conf_str)?)
}

#[derive(Debug)]
pub enum ConfigurationError {
    Io(String),
    Deserialization(serde_yaml::Error),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigurationError::Io(ref err) => write!(f, "{}", err),
            ConfigurationError::Deserialization(ref err) => {
                write!(f, "Failed to parse configuration file: {}", err)
            }
        }
    }
}

impl error::Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ConfigurationError::Io(_) => None,
            ConfigurationError::Deserialization(ref err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for ConfigurationError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigurationError::Deserialization(err)
    }
}
