use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ExtvarError;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A sub-model of the coupled system. The archive lays out history files
/// under the short directory name returned by [`Component::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    #[serde(alias = "atmosphere")]
    Atm,
    #[serde(alias = "ocean")]
    Ocn,
    #[serde(alias = "land")]
    Lnd,
    #[serde(alias = "sea_ice")]
    Ice,
    #[serde(alias = "river")]
    Rof,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Atm => "atm",
            Component::Ocn => "ocn",
            Component::Lnd => "lnd",
            Component::Ice => "ice",
            Component::Rof => "rof",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Component {
    type Err = ExtvarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atm" | "atmosphere" => Ok(Component::Atm),
            "ocn" | "ocean" => Ok(Component::Ocn),
            "lnd" | "land" => Ok(Component::Lnd),
            "ice" | "sea_ice" => Ok(Component::Ice),
            "rof" | "river" => Ok(Component::Rof),
            _ => Err(ExtvarError::UnknownComponent(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

const ECO_PREFIX: &str = "eco_";

/// Temporal resolution label, e.g. `monthly`, `daily`, `six_hourly`,
/// `eco_daily`. The label itself is the catalog key; only destination paths
/// use the rewritten form from [`Frequency::dest_label`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(String);

impl Frequency {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn monthly() -> Self {
        Self::new("monthly")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label used in destination paths: `six_hourly` becomes `hourly` and an
    /// `eco_` prefix is dropped. Applying it to its own output is a no-op.
    pub fn dest_label(&self) -> &str {
        match self.0.as_str() {
            "six_hourly" => "hourly",
            s => s.strip_prefix(ECO_PREFIX).unwrap_or(s),
        }
    }

    pub fn is_monthly(&self) -> bool {
        self.0 == "monthly"
    }

    /// Daily output in either the regular or the `eco_` stream.
    pub fn is_daily(&self) -> bool {
        self.dest_label() == "daily"
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Frequency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::str::FromStr for Frequency {
    type Err = ExtvarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::paths::validate_identifier(s)?;
        Ok(Self::new(s))
    }
}

// ---------------------------------------------------------------------------
// ExtractType
// ---------------------------------------------------------------------------

/// Which variable list of the catalog is active for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractType {
    #[default]
    Basic,
    Extra,
}

impl ExtractType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractType::Basic => "basic",
            ExtractType::Extra => "extra",
        }
    }
}

impl fmt::Display for ExtractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtractType {
    type Err = ExtvarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ExtractType::Basic),
            "extra" => Ok(ExtractType::Extra),
            _ => Err(ExtvarError::UnknownExtractType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
