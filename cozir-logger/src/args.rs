//! Command-line arguments

use std::path::PathBuf;

use anyhow::{bail, Result};

pub const USAGE: &str = "usage: cozir-logger <config.json> [--simulate]";

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Path to the JSON driver configuration
    pub config_path: PathBuf,
    /// Run against the in-process virtual sensor instead of the serial port
    pub simulate: bool,
}

impl Args {
    /// Parse arguments, excluding the program name
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut config_path = None;
        let mut simulate = false;

        for arg in args.into_iter().map(Into::into) {
            match arg.as_str() {
                "--simulate" => simulate = true,
                "-h" | "--help" => bail!(USAGE),
                flag if flag.starts_with('-') => bail!("unknown option {}\n{}", flag, USAGE),
                _ if config_path.is_some() => bail!("unexpected argument {}\n{}", arg, USAGE),
                _ => config_path = Some(PathBuf::from(arg)),
            }
        }

        let Some(config_path) = config_path else {
            bail!(USAGE);
        };
        Ok(Self {
            config_path,
            simulate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_only() {
        let args = Args::parse(["lab.json"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("lab.json"));
        assert!(!args.simulate);
    }

    #[test]
    fn test_simulate_flag_in_any_position() {
        assert!(Args::parse(["--simulate", "lab.json"]).unwrap().simulate);
        assert!(Args::parse(["lab.json", "--simulate"]).unwrap().simulate);
    }

    #[test]
    fn test_missing_config_path() {
        assert!(Args::parse(Vec::<String>::new()).is_err());
        assert!(Args::parse(["--simulate"]).is_err());
    }

    #[test]
    fn test_rejects_extra_arguments() {
        assert!(Args::parse(["a.json", "b.json"]).is_err());
        assert!(Args::parse(["a.json", "--verbose"]).is_err());
    }
}
