use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::settings::SettingsError;

/// Listing sort order offered by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Hot,
    New,
    Top,
    Rising,
}

impl SortMode {
    /// Returns the path segment used in listing request URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::Top => "top",
            SortMode::Rising => "rising",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(SortMode::Hot),
            "new" => Ok(SortMode::New),
            "top" => Ok(SortMode::Top),
            "rising" => Ok(SortMode::Rising),
            other => Err(SettingsError::Validation(format!(
                "unknown sort mode: {}",
                other
            ))),
        }
    }
}

/// Per-user display settings
///
/// A settings change invalidates all outstanding feed work, exactly like a
/// source change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Listing sort order
    pub sort: SortMode,

    /// Number of playable clips one page-fill cycle aims to collect
    pub per_page: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sort: SortMode::Hot,
            per_page: 10,
        }
    }
}

impl Settings {
    /// Validates the settings values
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Settings are valid
    /// * `Err(SettingsError::Validation)` - A value is out of range
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.per_page == 0 {
            return Err(SettingsError::Validation(
                "per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
