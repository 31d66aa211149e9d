use std::path::PathBuf;

use crate::errors::ConfigError;
use crate::matcher::MatchPolicy;

pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_SLEEP_MIN: f64 = 0.0;
pub const DEFAULT_SLEEP_MAX: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub templates_dir: PathBuf,
    /// lower bound of the random pause before each cycle, seconds
    pub sleep_min: f64,
    /// upper bound of the random pause before each cycle, seconds
    pub sleep_max: f64,
    pub match_policy: MatchPolicy,
    /// stop after this many cycles, run forever when None
    pub max_cycles: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            sleep_min: DEFAULT_SLEEP_MIN,
            sleep_max: DEFAULT_SLEEP_MAX,
            match_policy: MatchPolicy::AbsoluteDistance,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(RunConfig),
    Help,
    Version,
}

impl RunConfig {
    /// Parses flags (program name already skipped)
    pub fn parse<I, S>(args: I) -> Result<Command, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = RunConfig::default();

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                return Ok(Command::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Command::Version);
            } else if let Some(val) = arg.strip_prefix("--templates=") {
                if val.is_empty() {
                    return Err(invalid("--templates", val));
                }
                config.templates_dir = PathBuf::from(val);
            } else if let Some(val) = strip_either(arg, "--sleep_min=", "--sleep-min=") {
                config.sleep_min = parse_seconds("--sleep_min", val)?;
            } else if let Some(val) = strip_either(arg, "--sleep_max=", "--sleep-max=") {
                config.sleep_max = parse_seconds("--sleep_max", val)?;
            } else if let Some(val) = arg.strip_prefix("--ratio-test=") {
                let ratio: f32 = val.parse().map_err(|_| invalid("--ratio-test", val))?;
                if !(ratio > 0.0 && ratio <= 1.0) {
                    return Err(invalid("--ratio-test", val));
                }
                config.match_policy = MatchPolicy::RatioTest { ratio };
            } else if let Some(val) = arg.strip_prefix("--max-cycles=") {
                let cycles: u64 = val.parse().map_err(|_| invalid("--max-cycles", val))?;
                config.max_cycles = Some(cycles);
            } else {
                return Err(ConfigError::UnknownArgument(arg.to_string()));
            }
        }

        if config.sleep_min > config.sleep_max {
            return Err(ConfigError::SleepRange {
                min: config.sleep_min,
                max: config.sleep_max,
            });
        }
        Ok(Command::Run(config))
    }
}

fn strip_either<'a>(arg: &'a str, first: &str, second: &str) -> Option<&'a str> {
    arg.strip_prefix(first).or_else(|| arg.strip_prefix(second))
}

fn parse_seconds(flag: &str, val: &str) -> Result<f64, ConfigError> {
    match val.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(invalid(flag, val)),
    }
}

fn invalid(flag: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

pub fn help_text() -> String {
    [
        "siftclick - clicks on the highest priority template found on screen",
        "",
        "USAGE:",
        "    siftclick [FLAGS]",
        "",
        "FLAGS:",
        "    --templates=<dir>     Directory of <priority>_<threshold>_<name>.png files (default: templates)",
        "    --sleep_min=<secs>    Minimum random pause between cycles (default: 0)",
        "    --sleep_max=<secs>    Maximum random pause between cycles (default: 5)",
        "    --ratio-test=<r>      Also require nearest < r * second nearest distance (off by default)",
        "    --max-cycles=<n>      Exit after n cycles instead of running forever",
        "    --help, -h            Show this help message",
        "    --version, -v         Show version information",
        "",
        "Set RUST_LOG=debug for per-template match counts.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> RunConfig {
        match RunConfig::parse(args.iter()).unwrap() {
            Command::Run(config) => config,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn defaults_without_flags() {
        let config = run(&[]);
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.sleep_min, 0.0);
        assert_eq!(config.sleep_max, 5.0);
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
    }

    #[test]
    fn parses_all_flags() {
        let config = run(&[
            "--templates=/tmp/tpl",
            "--sleep_min=0.5",
            "--sleep-max=2",
            "--ratio-test=0.75",
            "--max-cycles=3",
        ]);
        assert_eq!(config.templates_dir, PathBuf::from("/tmp/tpl"));
        assert_eq!(config.sleep_min, 0.5);
        assert_eq!(config.sleep_max, 2.0);
        assert_eq!(config.match_policy, MatchPolicy::RatioTest { ratio: 0.75 });
        assert_eq!(config.max_cycles, Some(3));
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(RunConfig::parse(["--help", "--bogus"]).unwrap(), Command::Help);
        assert_eq!(RunConfig::parse(["-v"]).unwrap(), Command::Version);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            RunConfig::parse(["--bogus"]),
            Err(ConfigError::UnknownArgument(_))
        ));
        assert!(matches!(
            RunConfig::parse(["--sleep_min=-1"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RunConfig::parse(["--ratio-test=1.5"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RunConfig::parse(["--sleep_min=4", "--sleep_max=1"]),
            Err(ConfigError::SleepRange { .. })
        ));
    }
}
