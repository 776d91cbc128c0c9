// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for building stability histories.
//!
//! Defaults are embedded from `default-config.toml`. User configuration is a
//! TOML document with the same keys, all optional, layered on top.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Resolved configuration for building stability histories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StabilityConfig {
    max_history_length: usize,
    exclude: Vec<String>,
}

impl StabilityConfig {
    /// The embedded default configuration.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Returns the embedded default configuration.
    ///
    /// Panics if the embedded TOML is invalid.
    pub fn from_embedded() -> Self {
        let config: DefaultStabilityConfig =
            toml::from_str(Self::DEFAULT_CONFIG).expect("embedded default config should parse");
        assert!(
            config.max_history_length > 0,
            "embedded default config has a zero max-history-length"
        );
        Self {
            max_history_length: config.max_history_length,
            exclude: config.exclude,
        }
    }

    /// Parses user configuration and layers it on top of the defaults.
    ///
    /// `source_name` describes where `input` came from, for error messages.
    /// Unknown keys are ignored with a warning.
    pub fn from_toml_str(source_name: &str, input: &str) -> Result<Self, ConfigParseError> {
        let error = |kind| ConfigParseError::new(source_name, kind);

        let deserializer = toml::Deserializer::parse(input)
            .map_err(|err| error(ConfigParseErrorKind::Deserialize(Box::new(err))))?;
        let mut unknown = BTreeSet::new();
        let config: DeserializedStabilityConfig =
            serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })
            .map_err(|err| error(ConfigParseErrorKind::Deserialize(Box::new(err))))?;

        if !unknown.is_empty() {
            warn!(
                "ignoring unknown keys in stability config {source_name}: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", "),
            );
        }

        let mut resolved = Self::from_embedded();
        if let Some(max_history_length) = config.max_history_length {
            if max_history_length == 0 {
                return Err(error(ConfigParseErrorKind::ZeroHistoryLength));
            }
            resolved.max_history_length = max_history_length;
        }
        if let Some(exclude) = config.exclude {
            resolved.exclude = exclude;
        }
        Ok(resolved)
    }

    /// Returns the number of most recent runs kept for each unit.
    pub fn max_history_length(&self) -> usize {
        self.max_history_length
    }

    /// Returns the names of units dropped from aggregates.
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Returns true if units named `name` are dropped from aggregates.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|excluded| excluded == name)
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self::from_embedded()
    }
}

/// The embedded default configuration, with every key required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct DefaultStabilityConfig {
    max_history_length: usize,
    exclude: Vec<String>,
}

/// User configuration, with every key optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedStabilityConfig {
    #[serde(default)]
    max_history_length: Option<usize>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}
