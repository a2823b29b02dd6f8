//! Configuration resolution.
//!
//! Every option gets exactly one effective value, computed once per
//! invocation with this precedence:
//!
//! 1. A non-empty override (command line `KEY=VALUE`, then environment)
//! 2. The option's derivation rule, evaluated against options resolved
//!    before it and the probed host facts
//! 3. The built-in default
//!
//! A mandatory option that is still empty fails resolution, which happens
//! before any task is looked at.

pub mod host;
pub mod options;
pub mod types;

use std::collections::BTreeMap;

use tracing::debug;

use crate::util::suggest::suggest_similar;

pub use host::HostFacts;
pub use options::{OptionSpec, Resolved, builtin_options};
pub use types::{ConfigError, ConfigSnapshot, OptionKind, OptionValue};

/// Overrides keyed by option name. Later layers replace earlier ones.
pub type Overrides = BTreeMap<String, String>;

/// Resolve every declared option into a snapshot.
///
/// Pure: identical inputs always produce an identical snapshot.
pub fn resolve(specs: &[OptionSpec], overrides: &Overrides, host: &HostFacts) -> Result<ConfigSnapshot, ConfigError> {
  let mut resolved = Resolved::new();

  for spec in specs {
    let from_override = overrides.get(spec.name).filter(|v| !v.trim().is_empty());

    let value = match from_override {
      Some(raw) => {
        debug!(option = spec.name, source = "override", "resolved option");
        Some(parse_value(spec, raw)?)
      }
      None => match spec
        .derive
        .and_then(|rule| rule(&resolved, host))
        .filter(|v| !v.trim().is_empty())
      {
        Some(derived) => {
          debug!(option = spec.name, source = "derived", "resolved option");
          Some(parse_value(spec, &derived)?)
        }
        None => spec.default.map(|d| parse_value(spec, d)).transpose()?,
      },
    };

    let value = value.unwrap_or_else(|| empty_value(spec.kind));
    if spec.mandatory && value.is_empty() {
      return Err(ConfigError::Missing {
        option: spec.name.to_string(),
      });
    }

    if let Some(check) = spec.validate
      && !value.is_empty()
    {
      check(&value).map_err(|reason| ConfigError::Invalid {
        option: spec.name.to_string(),
        value: value.render(),
        reason,
      })?;
    }

    resolved.insert(spec.name.to_string(), value);
  }

  Ok(ConfigSnapshot::new(resolved))
}

/// Collect overrides from environment variables that name declared options.
pub fn overrides_from_env<I, K, V>(specs: &[OptionSpec], vars: I) -> Overrides
where
  I: IntoIterator<Item = (K, V)>,
  K: Into<String>,
  V: Into<String>,
{
  vars
    .into_iter()
    .map(|(k, v)| (k.into(), v.into()))
    .filter(|(k, _)| specs.iter().any(|s| s.name == k.as_str()))
    .collect()
}

/// Parse `KEY=VALUE` arguments. Keys must name declared options.
pub fn parse_overrides(specs: &[OptionSpec], args: &[String]) -> Result<Overrides, ConfigError> {
  let mut overrides = Overrides::new();

  for arg in args {
    let (key, value) = arg
      .split_once('=')
      .filter(|(k, _)| !k.is_empty())
      .ok_or_else(|| ConfigError::MalformedOverride(arg.clone()))?;

    if !specs.iter().any(|s| s.name == key) {
      return Err(ConfigError::UnknownOption {
        option: key.to_string(),
        suggestion: suggest_similar(key, specs.iter().map(|s| s.name)),
      });
    }

    overrides.insert(key.to_string(), value.to_string());
  }

  Ok(overrides)
}

/// Layer overrides; entries of `top` replace entries of `base`.
pub fn layer(base: Overrides, top: Overrides) -> Overrides {
  let mut merged = base;
  merged.extend(top);
  merged
}

fn empty_value(kind: OptionKind) -> OptionValue {
  match kind {
    OptionKind::Str => OptionValue::Str(String::new()),
    OptionKind::Bool => OptionValue::Bool(false),
    OptionKind::List => OptionValue::List(Vec::new()),
  }
}

fn parse_value(spec: &OptionSpec, raw: &str) -> Result<OptionValue, ConfigError> {
  let raw = raw.trim();
  match spec.kind {
    OptionKind::Str => Ok(OptionValue::Str(raw.to_string())),
    OptionKind::Bool => parse_bool(raw).map(OptionValue::Bool).ok_or_else(|| ConfigError::Invalid {
      option: spec.name.to_string(),
      value: raw.to_string(),
      reason: "expected true or false".to_string(),
    }),
    OptionKind::List => {
      let mut items: Vec<String> = Vec::new();
      for item in raw.split(|c: char| c.is_whitespace() || c == ',') {
        if !item.is_empty() && !items.iter().any(|i| i == item) {
          items.push(item.to_string());
        }
      }
      Ok(OptionValue::List(items))
    }
  }
}

fn parse_bool(raw: &str) -> Option<bool> {
  match raw.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" => Some(true),
    "false" | "0" | "no" | "off" => Some(false),
    _ => None,
  }
}
