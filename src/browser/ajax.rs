//! Waits for in-flight AJAX requests after steps that trigger them.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{BrowserDriver, BrowserError};

/// Default upper bound for one wait.
pub const DEFAULT_AJAX_TIMEOUT: Duration = Duration::from_millis(5000);
/// Extra delay after a wait so the page can render the response.
pub const AJAX_SETTLE_DELAY: Duration = Duration::from_millis(100);

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const WAITING: &str = "waiting";

const INSTALL_HOOKS: &str = r"if (typeof window.jQuery !== 'undefined' && typeof window.jQuery.fn.on !== 'undefined') {
    window.jQuery(document).on('ajaxStart.testsession', function () {
        window.__ajaxStatus = function () { return 'waiting'; };
    });
    window.jQuery(document).on('ajaxComplete.testsession', function (e, xhr) {
        if (xhr.getResponseHeader('X-ControllerURL') === null) {
            window.__ajaxStatus = function () { return 'no ajax'; };
        }
    });
    window.jQuery(document).on('ajaxSuccess.testsession', function (e, xhr) {
        if (xhr.getResponseHeader('X-ControllerURL') === null) {
            window.__ajaxStatus = function () { return 'success'; };
        }
    });
}";

const REMOVE_HOOKS: &str = r"if (typeof window.jQuery !== 'undefined' && typeof window.jQuery.fn.off !== 'undefined') {
    window.jQuery(document).off('ajaxStart.testsession');
    window.jQuery(document).off('ajaxComplete.testsession');
    window.jQuery(document).off('ajaxSuccess.testsession');
}";

const STATUS_EXPRESSION: &str =
    "typeof window.__ajaxStatus !== 'undefined' ? window.__ajaxStatus() : 'no ajax'";

/// Result of waiting for AJAX activity to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The page reported no pending request.
    Settled,
    /// The timeout elapsed first. The step carries on regardless.
    TimedOut,
}

/// Installs status hooks before matching steps and waits after them.
#[derive(Debug, Clone)]
pub struct AjaxWatcher {
    pattern: Option<Regex>,
    timeout: Duration,
    settle: Duration,
    poll_interval: Duration,
}

impl AjaxWatcher {
    /// Watch steps whose text matches any of `step_patterns`,
    /// case-insensitively. Blank fragments are ignored; with none left the
    /// watcher never applies.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::InvalidAjaxPattern`] when the fragments do not
    /// compile.
    pub fn new<S: AsRef<str>>(step_patterns: &[S], timeout: Duration) -> Result<Self, BrowserError> {
        let fragments: Vec<&str> = step_patterns
            .iter()
            .map(|fragment| fragment.as_ref().trim())
            .filter(|fragment| !fragment.is_empty())
            .collect();
        let pattern = if fragments.is_empty() {
            None
        } else {
            let combined = format!("({})", fragments.join("|"));
            let compiled = RegexBuilder::new(&combined)
                .case_insensitive(true)
                .build()
                .map_err(|source| BrowserError::InvalidAjaxPattern {
                    pattern: combined.clone(),
                    source,
                })?;
            Some(compiled)
        };
        Ok(Self {
            pattern,
            timeout,
            settle: AJAX_SETTLE_DELAY,
            poll_interval: POLL_INTERVAL,
        })
    }

    /// Override the settle delay.
    #[must_use]
    pub const fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Override the interval between status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Maximum time spent polling.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether `step_text` should be watched.
    #[must_use]
    pub fn applies_to(&self, step_text: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(step_text))
    }

    /// Install the status hooks when `step_text` is watched. Returns whether
    /// hooks were installed.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] when the script cannot run.
    pub fn before_step<D: BrowserDriver + ?Sized>(
        &self,
        driver: &mut D,
        step_text: &str,
    ) -> Result<bool, BrowserError> {
        if !self.applies_to(step_text) {
            return Ok(false);
        }
        driver
            .execute_script(INSTALL_HOOKS)
            .map_err(BrowserError::driver("install AJAX hooks"))?;
        Ok(true)
    }

    /// Wait for pending requests and remove the hooks when `step_text` is
    /// watched. Returns `None` for other steps.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] when a script cannot run.
    pub fn after_step<D: BrowserDriver + ?Sized>(
        &self,
        driver: &mut D,
        step_text: &str,
    ) -> Result<Option<WaitOutcome>, BrowserError> {
        if !self.applies_to(step_text) {
            return Ok(None);
        }
        let outcome = self.wait(driver)?;
        driver
            .execute_script(REMOVE_HOOKS)
            .map_err(BrowserError::driver("remove AJAX hooks"))?;
        Ok(Some(outcome))
    }

    /// Poll the page status until it stops reporting `waiting` or the
    /// timeout elapses, then pause for the settle delay.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] when the status cannot be read.
    pub fn wait<D: BrowserDriver + ?Sized>(&self, driver: &mut D) -> Result<WaitOutcome, BrowserError> {
        let deadline = Instant::now() + self.timeout;
        let outcome = loop {
            let status = driver
                .evaluate_script(STATUS_EXPRESSION)
                .map_err(BrowserError::driver("read AJAX status"))?;
            if status.as_str() != Some(WAITING) {
                debug!(target: "testsession::browser", status = %display_status(&status), "AJAX settled");
                break WaitOutcome::Settled;
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    target: "testsession::browser",
                    timeout_ms = %self.timeout.as_millis(),
                    "timed out waiting for AJAX requests"
                );
                break WaitOutcome::TimedOut;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        };
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        Ok(outcome)
    }
}

fn display_status(status: &Value) -> String {
    status
        .as_str()
        .map_or_else(|| status.to_string(), ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowserDriver;
    use rstest::rstest;

    fn watcher(timeout_ms: u64) -> AjaxWatcher {
        AjaxWatcher::new(&["press", "follow \"Save\"", " "], Duration::from_millis(timeout_ms))
            .expect("valid patterns")
            .with_settle(Duration::ZERO)
            .with_poll_interval(Duration::from_millis(1))
    }

    #[rstest]
    #[case("I PRESS the \"Go\" button", true)]
    #[case("I follow \"save\"", true)]
    #[case("I fill in \"Title\"", false)]
    fn step_matching_is_case_insensitive(#[case] step: &str, #[case] expected: bool) {
        assert_eq!(watcher(10).applies_to(step), expected);
    }

    #[test]
    fn empty_pattern_list_never_applies() {
        let none: [&str; 0] = [];
        let watcher = AjaxWatcher::new(&none, DEFAULT_AJAX_TIMEOUT).expect("empty list");
        assert!(!watcher.applies_to("I press anything"));
    }

    #[test]
    fn invalid_fragment_is_reported() {
        let err = AjaxWatcher::new(&["(unclosed"], DEFAULT_AJAX_TIMEOUT).expect_err("bad regex");
        assert!(matches!(err, BrowserError::InvalidAjaxPattern { .. }));
    }

    #[test]
    fn waits_until_status_changes() {
        let mut driver = MockBrowserDriver::new();
        let mut polls = 0;
        driver.expect_evaluate_script().times(3).returning(move |_| {
            polls += 1;
            Ok(Value::from(if polls < 3 { "waiting" } else { "success" }))
        });
        let outcome = watcher(1000).wait(&mut driver).expect("wait");
        assert_eq!(outcome, WaitOutcome::Settled);
    }

    #[test]
    fn timeout_is_not_an_error() {
        let mut driver = MockBrowserDriver::new();
        driver
            .expect_evaluate_script()
            .returning(|_| Ok(Value::from("waiting")));
        let outcome = watcher(5).wait(&mut driver).expect("wait");
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[test]
    fn unmatched_steps_do_not_touch_the_driver() {
        let mut driver = MockBrowserDriver::new();
        let watch = watcher(10);
        assert!(!watch.before_step(&mut driver, "I see \"x\"").expect("before"));
        assert_eq!(watch.after_step(&mut driver, "I see \"x\"").expect("after"), None);
    }

    #[test]
    fn matched_steps_install_and_remove_hooks() {
        let mut driver = MockBrowserDriver::new();
        driver
            .expect_execute_script()
            .withf(|script: &str| script.contains(".on('ajaxStart.testsession'"))
            .times(1)
            .returning(|_| Ok(()));
        driver
            .expect_execute_script()
            .withf(|script: &str| script.contains(".off('ajaxStart.testsession')"))
            .times(1)
            .returning(|_| Ok(()));
        driver
            .expect_evaluate_script()
            .returning(|_| Ok(Value::from("no ajax")));
        let watch = watcher(10);
        assert!(watch.before_step(&mut driver, "I press \"Save\"").expect("before"));
        assert_eq!(
            watch.after_step(&mut driver, "I press \"Save\"").expect("after"),
            Some(WaitOutcome::Settled)
        );
    }
}
