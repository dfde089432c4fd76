//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that the autometrics
//! binary can consume and use as configuration data.

use clap::{App, Arg};
use environment::StaticEnvironment;
use metric::TagMap;
use normalize::{NormalizerConfig, Policy};
use serde_json;
use std::env;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::str::FromStr;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// How records are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document per line.
    Json,
    /// One tcollector line per record. See `line::to_line`.
    Line,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<OutputFormat, ConfigError> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "line" => Ok(OutputFormat::Line),
            _ => Err(ConfigError::InvalidKey {
                key: "format".into(),
                expected: "json or line",
            }),
        }
    }
}

/// Errors from reading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Parse(toml::de::Error),
    /// A key held a value of the wrong type or an unknown setting.
    InvalidKey {
        /// The offending key, dotted.
        key: String,
        /// What the key should have held.
        expected: &'static str,
    },
    /// A value was to be read from an environment variable that is unset
    /// or not unicode.
    MissingEnvironmentVariable(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "could not read config file: {}", e),
            ConfigError::Parse(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::InvalidKey {
                ref key,
                expected,
            } => write!(f, "{} must be {}", key, expected),
            ConfigError::MissingEnvironmentVariable(ref var) => {
                write!(f, "{} could not be read from the environment", var)
            }
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ConfigError::Io(ref e) => Some(e),
            ConfigError::Parse(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError::Parse(e)
    }
}

/// Big configuration struct for the autometrics executable
///
/// This struct is what we construct from parsing the command line and the
/// optional configuration file. Please see documentation on `parse_args` in
/// this module for more details.
#[derive(Debug, PartialEq)]
pub struct Args {
    /// The verbosity setting. The higher the value the more chatty
    /// autometrics gets.
    pub verbose: u64,
    /// Autometrics version string. This is set automatically.
    pub version: String,
    /// How records are written to stdout.
    pub format: OutputFormat,
    /// Fold records into data sets and report on them at end of input.
    pub summarize: bool,
    /// See `normalize::NormalizerConfig`.
    pub normalizer: NormalizerConfig,
    /// See `environment::StaticEnvironment`.
    pub environment: StaticEnvironment,
}

impl Default for Args {
    fn default() -> Self {
        let mut environment = StaticEnvironment::default();
        environment.version = Some(default_version());
        Args {
            verbose: 0,
            version: default_version(),
            format: OutputFormat::Json,
            summarize: false,
            normalizer: NormalizerConfig::default(),
            environment: environment,
        }
    }
}

/// Parse the autometrics configuration arguments
///
/// This function will read the process arguments and construct an `Args`.
/// Settings given on the command line win over those in the configuration
/// file. See `autometrics --help` for more information.
pub fn parse_args() -> Result<Args, ConfigError> {
    let args = App::new("autometrics")
        .version(VERSION.unwrap_or("unknown"))
        .about("normalize events into metric records, read from stdin")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .arg(
            Arg::with_name("format")
                .long("format")
                .value_name("format")
                .possible_values(&["json", "line"])
                .help("Write records as json documents or tcollector lines.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("summarize")
                .long("summarize")
                .help("Report on every series at end of input."),
        )
        .get_matches();

    let verb = if args.is_present("verbose") {
        args.occurrences_of("verbose")
    } else {
        0
    };

    let mut parsed = match args.value_of("config-file") {
        Some(filename) => {
            let mut fp = File::open(filename)?;
            let mut buffer = String::new();
            fp.read_to_string(&mut buffer)?;
            parse_config_file(&buffer, verb)?
        }
        None => {
            let mut parsed = Args::default();
            parsed.verbose = verb;
            parsed
        }
    };

    if let Some(format) = args.value_of("format") {
        parsed.format = format.parse()?;
    }
    if args.is_present("summarize") {
        parsed.summarize = true;
    }
    Ok(parsed)
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidKey {
        key: key.to_string(),
        expected: expected,
    }
}

fn get_str(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<String>, ConfigError> {
    match tbl.get(key) {
        None => Ok(None),
        Some(v) => v.as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid(path, "a string")),
    }
}

fn get_bool(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<bool>, ConfigError> {
    match tbl.get(key) {
        None => Ok(None),
        Some(v) => v.as_bool().map(Some).ok_or_else(|| invalid(path, "a boolean")),
    }
}

/// Resolve a value that is either a plain string or a table
/// `{ environment = true, value = "VAR" }` naming an environment variable.
fn resolve_str(v: &toml::Value, path: &str) -> Result<String, ConfigError> {
    if let Some(s) = v.as_str() {
        return Ok(s.to_string());
    }
    let tbl = v.as_table()
        .ok_or_else(|| invalid(path, "a string or a table"))?;
    let from_env = tbl.get("environment")
        .map_or(false, |ev| ev.as_bool().unwrap_or(false));
    if !from_env {
        return Err(invalid(path, "a table with environment = true"));
    }
    let env_key = tbl.get("value")
        .and_then(|k| k.as_str())
        .ok_or_else(|| invalid(path, "a table with a string value key"))?;
    env::var(env_key).map_err(|_| ConfigError::MissingEnvironmentVariable(env_key.to_string()))
}

fn toml_to_json(v: &toml::Value) -> serde_json::Value {
    match *v {
        toml::Value::String(ref s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(i) => serde_json::Value::from(i),
        toml::Value::Float(f) => serde_json::Value::from(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(ref d) => serde_json::Value::String(d.to_string()),
        toml::Value::Array(ref a) => serde_json::Value::Array(a.iter().map(toml_to_json).collect()),
        toml::Value::Table(ref t) => serde_json::Value::Object(
            t.iter().map(|(k, v)| (k.clone(), toml_to_json(v))).collect(),
        ),
    }
}

/// Parse the autometrics configuration file.
///
/// Every key is optional. An absent key keeps its default; a key of the
/// wrong type is an error.
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, ConfigError> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)?;

    args.verbose = verbosity;

    if let Some(format) = get_str(&value, "format", "format")? {
        args.format = format.parse()?;
    }
    args.summarize = get_bool(&value, "summarize", "summarize")?.unwrap_or(args.summarize);

    if let Some(tbl) = value.get("normalizer") {
        let normalizer = &mut args.normalizer;
        if let Some(policy) = get_str(tbl, "policy", "normalizer.policy")? {
            normalizer.policy = Policy::from_str(&policy)
                .map_err(|_| invalid("normalizer.policy", "strict or lenient"))?;
        }
        normalizer.optimistic_creation = get_bool(
            tbl,
            "optimistic-creation",
            "normalizer.optimistic-creation",
        )?.unwrap_or(normalizer.optimistic_creation);
        if let Some(name) = get_str(tbl, "default-event-name", "normalizer.default-event-name")? {
            normalizer.default_event_name = name;
        }
        if let Some(re) = get_str(tbl, "server-type-regex", "normalizer.server-type-regex")? {
            normalizer.server_type_regex = re;
        }
        if let Some(unknown) = get_str(tbl, "unknown", "normalizer.unknown")? {
            normalizer.unknown = unknown;
        }
    }

    if let Some(tbl) = value.get("environment") {
        let tbl = tbl.as_table()
            .ok_or_else(|| invalid("environment", "a table"))?;
        for (k, v) in tbl.iter() {
            let path = format!("environment.{}", k);
            let val = Some(resolve_str(v, &path)?);
            let environment = &mut args.environment;
            match k.as_str() {
                "hostname" => environment.hostname = val,
                "env" => environment.environment = val,
                "version" => environment.version = val,
                "api-key" => environment.api_key = val,
                "request-id" => environment.request_id = val,
                "ip-addr" => environment.client_ip = val,
                "country-code" => environment.country_code = val,
                _ => return Err(invalid(&path, "a known environment key")),
            }
        }
    }

    if let Some(tbl) = value.get("tags") {
        let tbl = tbl.as_table().ok_or_else(|| invalid("tags", "a table"))?;
        let mut tags = TagMap::default();
        for (k, v) in tbl.iter() {
            tags.insert(k.clone(), resolve_str(v, &format!("tags.{}", k))?);
        }
        args.environment.tags = tags;
    }

    if let Some(tbl) = value.get("metadata") {
        match toml_to_json(tbl) {
            serde_json::Value::Object(map) => args.environment.metadata = map,
            _ => return Err(invalid("metadata", "a table")),
        }
    }

    Ok(args)
}
