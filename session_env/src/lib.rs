#![forbid(unsafe_code)]

//! Shared environment variable names used across testsession crates (library,
//! command-line tool, and test helpers).

/// Run-specific session parameters encoded as a URL query string.
///
/// Values are merged over the default `database` and `mailer` parameters when
/// a session starts.
///
/// # Examples
///
/// ```
/// use session_env::TESTSESSION_PARAMS_ENV;
/// assert_eq!(TESTSESSION_PARAMS_ENV, "TESTSESSION_PARAMS");
/// ```
pub const TESTSESSION_PARAMS_ENV: &str = "TESTSESSION_PARAMS";

/// Browser window size applied at session start, formatted as `WIDTHxHEIGHT`.
pub const SCREEN_SIZE_ENV: &str = "BEHAT_SCREEN_SIZE";

/// Explicit path to a configuration file, bypassing discovery.
pub const CONFIG_PATH_ENV: &str = "TESTSESSION_CONFIG_PATH";

/// Prefix shared by every environment variable that configures the CLI.
pub const ENV_PREFIX: &str = "TESTSESSION_";
