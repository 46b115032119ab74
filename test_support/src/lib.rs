//! Test utilities shared by the `testsession` test suites.
//!
//! Provides environment guards, temporary state directories, a helper for
//! running the built binary, and error-chain formatting.

pub mod env_lock;
pub mod env_var_guard;
pub mod error;
pub mod session_cli;
pub mod state_dir;

pub use env_var_guard::EnvVarGuard;
pub use error::display_error_chain;
pub use session_cli::{SessionRun, run_testsession_in};
pub use state_dir::StateDir;
