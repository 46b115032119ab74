//! Browser window dimensions.

use session_env::SCREEN_SIZE_ENV;
use std::fmt;
use std::str::FromStr;

use super::{BrowserDriver, BrowserError};

/// Window size applied at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

impl ScreenSize {
    /// Parse `WIDTHxHEIGHT`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::InvalidScreenSize`] for malformed or zero
    /// dimensions.
    pub fn from_env_value(value: &str) -> Result<Self, BrowserError> {
        let invalid = |reason| BrowserError::InvalidScreenSize {
            value: value.to_owned(),
            reason,
        };
        let (width, height) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| invalid("expected WIDTHxHEIGHT"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("dimensions must be positive integers"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }

    /// Read `BEHAT_SCREEN_SIZE`, falling back to 1024x768 when it is unset
    /// or blank.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::InvalidScreenSize`] when the variable is set
    /// to a malformed value.
    pub fn from_env() -> Result<Self, BrowserError> {
        match std::env::var(SCREEN_SIZE_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::from_env_value(&value),
            _ => Ok(Self::default()),
        }
    }

    /// Resize the browser window.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] when the driver refuses.
    pub fn apply<D: BrowserDriver + ?Sized>(self, driver: &mut D) -> Result<(), BrowserError> {
        driver
            .resize_window(self)
            .map_err(BrowserError::driver("resize the window"))
    }
}

impl FromStr for ScreenSize {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_env_value(s)
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
