//! Page placement targets for the countdown page.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Where a page is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageHost {
    Tab,
    Window,
}

impl PageHost {
    pub fn as_str(self) -> &'static str {
        match self {
            PageHost::Tab => "tab",
            PageHost::Window => "window",
        }
    }
}

impl fmt::Display for PageHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageHost {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tab" => Ok(PageHost::Tab),
            "window" => Ok(PageHost::Window),
            other => Err(ValidationError::InvalidHost(other.to_string())),
        }
    }
}

impl TryFrom<u8> for PageHost {
    type Error = ValidationError;

    /// Numeric form used by older callers: 0 is a tab, 1 a window.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PageHost::Tab),
            1 => Ok(PageHost::Window),
            other => Err(ValidationError::InvalidHost(other.to_string())),
        }
    }
}
