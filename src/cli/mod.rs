//! Command line interface definition using clap.
//!
//! [`Cli`] doubles as the layered configuration: built-in defaults are
//! overridden by a discovered `testsession` configuration file, then by
//! `TESTSESSION_*` environment variables, then by flags given on the command
//! line.

use clap::builder::ValueParser;
use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoError, OrthoMergeExt, OrthoResult,
    sanitize_value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_env::{CONFIG_PATH_ENV, ENV_PREFIX};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{AjaxWatcher, BrowserError, ScreenshotRecorder};
use camino::Utf8PathBuf;

mod parsing;

use parsing::{check_timeout_ms, parse_assignment, parse_non_empty, parse_timeout_ms};

/// Default AJAX wait, in milliseconds.
pub const DEFAULT_AJAX_TIMEOUT_MS: u64 = 5000;

/// Fields that may be overridden from the command line.
const CLI_FIELDS: [&str; 6] = [
    "state_dir",
    "verbose",
    "ajax_timeout_ms",
    "ajax_steps",
    "screenshot_path",
    "catalog",
];

/// Inspect and drive cross-process test session state.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None, subcommand_required = true)]
#[ortho_config(prefix = "TESTSESSION")]
pub struct Cli {
    /// Directory that receives new state files.
    ///
    /// Defaults to the system temporary directory.
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Upper bound for AJAX waits after matching steps, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_AJAX_TIMEOUT_MS, value_parser = ValueParser::new(parse_timeout_ms))]
    #[ortho_config(default = DEFAULT_AJAX_TIMEOUT_MS)]
    pub ajax_timeout_ms: u64,

    /// Step text fragments that trigger an AJAX wait.
    ///
    /// Values from every configuration layer are combined.
    #[arg(long = "ajax-step", value_name = "REGEX")]
    #[ortho_config(merge_strategy = "append")]
    pub ajax_steps: Vec<String>,

    /// Directory for failure screenshots; screenshots are skipped when unset.
    #[arg(long, value_name = "DIR")]
    pub screenshot_path: Option<PathBuf>,

    /// YAML type catalog used to resolve fixture type labels.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Subcommand to execute.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            state_dir: None,
            verbose: false,
            ajax_timeout_ms: DEFAULT_AJAX_TIMEOUT_MS,
            ajax_steps: Vec::new(),
            screenshot_path: None,
            catalog: None,
            command: None,
        }
    }
}

impl Cli {
    /// Watcher for the configured AJAX step fragments and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::InvalidAjaxPattern`] when the fragments do not
    /// form a valid expression.
    pub fn ajax_watcher(&self) -> Result<AjaxWatcher, BrowserError> {
        AjaxWatcher::new(&self.ajax_steps, Duration::from_millis(self.ajax_timeout_ms))
    }

    /// Recorder writing into the configured screenshot directory, if any.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Screenshot`] when the directory is not valid
    /// UTF-8.
    pub fn screenshot_recorder(&self) -> Result<ScreenshotRecorder, BrowserError> {
        let dir = self
            .screenshot_path
            .clone()
            .map(|path| {
                Utf8PathBuf::from_path_buf(path).map_err(|original| BrowserError::Screenshot {
                    path: Utf8PathBuf::from(original.to_string_lossy().into_owned()),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
                })
            })
            .transpose()?;
        Ok(ScreenshotRecorder::new(dir))
    }
}

/// One `KEY=VALUE` pair for `set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// State key.
    pub key: String,
    /// Parsed value.
    pub value: Value,
}

/// Arguments accepted by the `start` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct StartArgs {
    /// Name of the temporary database.
    #[arg(long, value_name = "NAME", value_parser = ValueParser::new(parse_non_empty))]
    pub database: String,

    /// Fixture file the application loads at session start.
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Database dump the application imports at session start.
    #[arg(long, value_name = "FILE")]
    pub import_database: Option<PathBuf>,

    /// Ask the application to create its default records.
    #[arg(long)]
    pub require_default_records: bool,

    /// Mail transport reference, overriding the test mailer.
    #[arg(long, value_name = "MAILER")]
    pub mailer: Option<String>,
}

/// Arguments accepted by the `emails` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct EmailArgs {
    /// State file to inspect.
    #[arg(value_name = "STATE")]
    pub state: PathBuf,

    /// Recipient; exact text or `/regex/flags`.
    #[arg(long)]
    pub to: Option<String>,

    /// Sender; exact text or `/regex/flags`.
    #[arg(long)]
    pub from: Option<String>,

    /// Subject; exact text or `/regex/flags`.
    #[arg(long)]
    pub subject: Option<String>,

    /// Body; exact text or `/regex/flags`.
    #[arg(long)]
    pub content: Option<String>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Create a state file and print its path.
    Start(StartArgs),

    /// Print a state file as JSON.
    Show {
        /// State file to read.
        #[arg(value_name = "STATE")]
        state: PathBuf,
    },

    /// Merge `KEY=VALUE` pairs into a state file.
    Set {
        /// State file to update.
        #[arg(value_name = "STATE")]
        state: PathBuf,
        /// Pairs to apply; values are parsed as JSON when possible.
        #[arg(value_name = "KEY=VALUE", required = true, value_parser = ValueParser::new(parse_assignment))]
        assignments: Vec<Assignment>,
    },

    /// Set the simulated current date, keeping the time of day.
    Date {
        /// State file to update.
        #[arg(value_name = "STATE")]
        state: PathBuf,
        /// Date as `YYYY-MM-DD`.
        #[arg(value_name = "DATE")]
        date: String,
    },

    /// Set the simulated current time, keeping the date.
    Time {
        /// State file to update.
        #[arg(value_name = "STATE")]
        state: PathBuf,
        /// Time as `HH:MM:SS`.
        #[arg(value_name = "TIME")]
        time: String,
    },

    /// Print the most recent email matching every given predicate.
    Emails(EmailArgs),

    /// Drop every recorded email.
    ClearEmails {
        /// State file to update.
        #[arg(value_name = "STATE")]
        state: PathBuf,
    },

    /// Remove a state file.
    End {
        /// State file to remove.
        #[arg(value_name = "STATE")]
        state: PathBuf,
    },

    /// Resolve a YAML fixture file in memory and list the records it defines.
    CheckFixtures {
        /// Fixture file to check.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Parse CLI arguments.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|clap_err| clap_err.with_cmd(&command))?;
    Ok((cli, matches_for_merge))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
}

fn config_discovery() -> ConfigDiscovery {
    ConfigDiscovery::builder("testsession")
        .env_var(CONFIG_PATH_ENV)
        .build()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Value> {
    let mut map = match sanitize_value(cli)? {
        Value::Object(map) => map,
        other => {
            return Err(Arc::new(OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    for field in CLI_FIELDS {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails, or when a file or environment layer sets an AJAX timeout outside
/// the range the `--ajax-timeout-ms` flag accepts.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let command = cli.command.clone();
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    match sanitize_value(&Cli::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    let mut file_layers = config_discovery().compose_layers();
    errors.append(&mut file_layers.required_errors);
    if file_layers.value.is_empty() {
        errors.append(&mut file_layers.optional_errors);
    }
    for layer in file_layers.value {
        composer.push_layer(layer);
    }

    let env_provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    match Figment::from(env_provider)
        .extract::<Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    match cli_overrides_from_matches(cli, matches) {
        Ok(value) if !is_empty_value(&value) => composer.push_cli(value),
        Ok(_) => {}
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    let mut merged = composition.into_merge_result(Cli::merge_from_layers)?;
    check_timeout_ms(merged.ajax_timeout_ms).map_err(|message| {
        Arc::new(OrthoError::Validation {
            key: "ajax_timeout_ms".to_owned(),
            message,
        })
    })?;
    merged.command = command;
    Ok(merged)
}
