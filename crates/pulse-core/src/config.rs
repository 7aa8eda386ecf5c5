// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Construction-time settings for the bus and the coordinator.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_RELEASE_GRACE_MS;

/// Bus-level toggles. All of them can also be flipped at runtime through
/// the bus setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Trace every enqueue and registration at debug level.
    pub debug_logging: bool,
    /// Log deprecation warnings for mapped legacy emissions.
    pub deprecation_warnings: bool,
    /// Master switch for the legacy side of dual emissions.
    pub legacy_emission_enabled: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            deprecation_warnings: true,
            legacy_emission_enabled: true,
        }
    }
}

/// Coordinator-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Trace transaction lifecycles at debug level.
    pub debug_logging: bool,
    /// Age at which a closed transaction record becomes eligible for the
    /// advisory sweep, in milliseconds.
    pub release_grace_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            release_grace_ms: DEFAULT_RELEASE_GRACE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_enable_warnings_and_legacy_emission() {
        let config = BusConfig::default();
        assert!(!config.debug_logging);
        assert!(config.deprecation_warnings);
        assert!(config.legacy_emission_enabled);
    }

    #[test]
    fn configs_round_trip_through_serde_with_defaults() {
        let parsed: CoordinatorConfig = serde_json::from_str("{}").expect("defaults fill");
        assert_eq!(parsed, CoordinatorConfig::default());
        let parsed: BusConfig =
            serde_json::from_str(r#"{"deprecation_warnings":false}"#).expect("parses");
        assert!(!parsed.deprecation_warnings);
        assert!(parsed.legacy_emission_enabled);
    }
}
