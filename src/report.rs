//! Human-readable summary of a failed step.

use camino::Utf8PathBuf;
use std::fmt;

/// What a failed scenario reports: the originating error plus any captured
/// diagnostics.
///
/// ```
/// use testsession::report::FailureReport;
///
/// let report = FailureReport::new("element not found")
///     .with_screenshot("shots/login_12.png".into())
///     .with_script_errors(vec!["TypeError: x is undefined".to_owned()]);
/// assert_eq!(
///     report.to_string(),
///     "element not found\n\
///      screenshot: shots/login_12.png\n\
///      script errors:\n  TypeError: x is undefined"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    /// Originating error message.
    pub message: String,
    /// Saved screenshot, if one was taken.
    pub screenshot: Option<Utf8PathBuf>,
    /// Client-side script errors observed during the step.
    pub script_errors: Vec<String>,
}

impl FailureReport {
    /// Report carrying only `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Report for an error, rendering its whole source chain.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(message)
    }

    /// Attach a screenshot path.
    #[must_use]
    pub fn with_screenshot(mut self, path: Utf8PathBuf) -> Self {
        self.screenshot = Some(path);
        self
    }

    /// Attach captured script errors.
    #[must_use]
    pub fn with_script_errors(mut self, errors: Vec<String>) -> Self {
        self.script_errors = errors;
        self
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(path) = &self.screenshot {
            write!(f, "\nscreenshot: {path}")?;
        }
        if !self.script_errors.is_empty() {
            f.write_str("\nscript errors:")?;
            for error in &self.script_errors {
                write!(f, "\n  {error}")?;
            }
        }
        Ok(())
    }
}
