//! Resolver configuration
//!
//! `ResolverConfig` is the per-call view of the behavior policy and install
//! state; `ResolverOptions` holds the search budget and can be loaded from
//! TOML.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pod_core::error::PodError;
use pod_core::types::{PackageId, Version};

use crate::ResolverResult;

/// Global preference steering version selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DependencyBehavior {
    /// Drop every dependency edge and take the highest version
    Ignore,
    /// Smallest satisfying version
    #[default]
    Lowest,
    /// Largest satisfying version
    Highest,
    /// Lowest major, then the highest minor and patch within it
    HighestMinor,
    /// Lowest major and minor, then the highest patch within them
    HighestPatch,
}

/// Behavior policy and install state for one resolve call
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub behavior: DependencyBehavior,
    /// Installed version per id
    pub installed: BTreeMap<PackageId, Version>,
    /// Targets that are not installed yet
    pub new_ids: BTreeSet<PackageId>,
    /// Every target id
    pub target_ids: BTreeSet<PackageId>,
}

/// Search budget for the combination solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverOptions {
    /// Candidate evaluations allowed before the search fails closed
    pub max_attempts: u64,
    /// Wall-clock limit in milliseconds
    ///
    /// Unset by default, so only `max_attempts` bounds a search until a
    /// caller asks for a deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Attempts between cancellation and timeout checks
    pub cancellation_poll_interval: u32,
}

const DEFAULT_MAX_ATTEMPTS: u64 = 5_000_000;
const DEFAULT_POLL_INTERVAL: u32 = 1024;

impl DependencyBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyBehavior::Ignore => "ignore",
            DependencyBehavior::Lowest => "lowest",
            DependencyBehavior::Highest => "highest",
            DependencyBehavior::HighestMinor => "highest-minor",
            DependencyBehavior::HighestPatch => "highest-patch",
        }
    }
}

impl FromStr for DependencyBehavior {
    type Err = PodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept "HighestMinor", "highest-minor" and "highest_minor"
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "ignore" => Ok(DependencyBehavior::Ignore),
            "lowest" => Ok(DependencyBehavior::Lowest),
            "highest" => Ok(DependencyBehavior::Highest),
            "highestminor" => Ok(DependencyBehavior::HighestMinor),
            "highestpatch" => Ok(DependencyBehavior::HighestPatch),
            _ => Err(PodError::ConfigParse {
                message: format!("unknown dependency behavior '{}'", s),
            }),
        }
    }
}

impl TryFrom<String> for DependencyBehavior {
    type Error = PodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DependencyBehavior> for String {
    fn from(behavior: DependencyBehavior) -> Self {
        behavior.as_str().to_string()
    }
}

impl fmt::Display for DependencyBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResolverConfig {
    /// Create a config with no installed packages and no targets
    pub fn new(behavior: DependencyBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Installed version of `id`, if it is installed
    pub fn installed_version(&self, id: &PackageId) -> Option<&Version> {
        self.installed.get(id)
    }

    /// Installed version of `id` when it should be kept in place
    ///
    /// Newly targeted ids never have a preferred version.
    pub fn preferred_version(&self, id: &PackageId) -> Option<&Version> {
        if self.new_ids.contains(id) {
            None
        } else {
            self.installed_version(id)
        }
    }

    pub fn is_target(&self, id: &PackageId) -> bool {
        self.target_ids.contains(id)
    }

    pub fn is_installed(&self, id: &PackageId) -> bool {
        self.installed.contains_key(id)
    }

    pub fn is_new(&self, id: &PackageId) -> bool {
        self.new_ids.contains(id)
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_ms: None,
            cancellation_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ResolverOptions {
    /// Parse options from a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> ResolverResult<Self> {
        toml::from_str(content).map_err(|e| PodError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the wall-clock limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set how often cancellation is polled
    pub fn with_poll_interval(mut self, interval: u32) -> Self {
        self.cancellation_poll_interval = interval;
        self
    }

    /// Wall-clock limit, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Poll interval, never zero
    pub fn poll_interval(&self) -> u64 {
        u64::from(self.cancellation_poll_interval.max(1))
    }
}
