//! Types for configuration resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placeholder::{PlaceholderError, Resolver};
use crate::platform::{Platform, parse_platforms};
use crate::util::hash::Hashable;

/// The kind of value an option holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
  Str,
  Bool,
  List,
}

/// An effective option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
  Bool(bool),
  List(Vec<String>),
  Str(String),
}

impl OptionValue {
  /// Render the value the way commands see it in their environment.
  ///
  /// Lists are joined by a single space.
  pub fn render(&self) -> String {
    match self {
      OptionValue::Str(s) => s.clone(),
      OptionValue::Bool(b) => b.to_string(),
      OptionValue::List(items) => items.join(" "),
    }
  }

  pub fn is_empty(&self) -> bool {
    match self {
      OptionValue::Str(s) => s.is_empty(),
      OptionValue::Bool(_) => false,
      OptionValue::List(items) => items.is_empty(),
    }
  }
}

/// Errors raised while resolving configuration. All of them abort the
/// invocation before any task runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("mandatory option {option} is not set and cannot be derived")]
  Missing { option: String },

  #[error("invalid value '{value}' for {option}: {reason}")]
  Invalid {
    option: String,
    value: String,
    reason: String,
  },

  #[error("unknown option {option}{}", suggestion.as_ref().map(|s| format!(" (did you mean {s}?)")).unwrap_or_default())]
  UnknownOption { option: String, suggestion: Option<String> },

  #[error("malformed override '{0}': expected KEY=VALUE")]
  MalformedOverride(String),
}

impl ConfigError {
  pub fn option(&self) -> Option<&str> {
    match self {
      ConfigError::Missing { option } | ConfigError::Invalid { option, .. } | ConfigError::UnknownOption { option, .. } => {
        Some(option)
      }
      ConfigError::MalformedOverride(_) => None,
    }
  }
}

/// The fully resolved, immutable configuration of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
  values: BTreeMap<String, OptionValue>,
}

impl Hashable for ConfigSnapshot {}

impl ConfigSnapshot {
  pub(crate) fn new(values: BTreeMap<String, OptionValue>) -> Self {
    Self { values }
  }

  pub fn get(&self, name: &str) -> Option<&OptionValue> {
    self.values.get(name)
  }

  /// String form of an option, empty if the option is not declared.
  pub fn get_str(&self, name: &str) -> String {
    self.values.get(name).map(OptionValue::render).unwrap_or_default()
  }

  pub fn get_bool(&self, name: &str) -> Option<bool> {
    match self.values.get(name) {
      Some(OptionValue::Bool(b)) => Some(*b),
      _ => None,
    }
  }

  pub fn get_list(&self, name: &str) -> Vec<String> {
    match self.values.get(name) {
      Some(OptionValue::List(items)) => items.clone(),
      Some(other) if !other.is_empty() => vec![other.render()],
      _ => Vec::new(),
    }
  }

  /// The `PLATFORMS` option parsed into release targets.
  pub fn platforms(&self) -> Result<Vec<Platform>, ConfigError> {
    let entries = self.get_list("PLATFORMS");
    parse_platforms(entries.iter().map(String::as_str)).map_err(|reason| ConfigError::Invalid {
      option: "PLATFORMS".to_string(),
      value: entries.join(" "),
      reason,
    })
  }

  /// A copy of this snapshot with one option replaced.
  pub fn with_override(&self, name: &str, value: OptionValue) -> ConfigSnapshot {
    let mut values = self.values.clone();
    values.insert(name.to_string(), value);
    ConfigSnapshot { values }
  }

  /// A copy of this snapshot targeting one release platform.
  pub fn for_platform(&self, platform: &Platform) -> ConfigSnapshot {
    self
      .with_override("TARGET_OS", OptionValue::Str(platform.os.to_string()))
      .with_override("ARCH", OptionValue::Str(platform.arch.to_string()))
  }

  /// Every option as an environment variable.
  pub fn to_env(&self) -> BTreeMap<String, String> {
    self.values.iter().map(|(k, v)| (k.clone(), v.render())).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
    self.values.iter()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl Resolver for ConfigSnapshot {
  fn resolve_option(&self, name: &str) -> Result<String, PlaceholderError> {
    self
      .values
      .get(name)
      .map(OptionValue::render)
      .ok_or_else(|| PlaceholderError::UnresolvedOption(name.to_string()))
  }
}
