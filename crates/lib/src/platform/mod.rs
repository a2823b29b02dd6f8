pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;
use std::str::FromStr;

use arch::Arch;
use os::Os;

/// A release target: an architecture, optionally qualified by an OS
/// (`arm64` or `linux/arm64`). The OS defaults to Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub os: Os,
  pub arch: Arch,
}

impl Platform {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self { os, arch }
  }

  /// Detect the platform of the running binary.
  pub fn current() -> Option<Self> {
    Some(Self {
      os: Os::current()?,
      arch: Arch::current()?,
    })
  }

  /// The `os/arch` form container builders expect (e.g. `linux/arm64`).
  pub fn qualified(&self) -> String {
    format!("{}/{}", self.os, self.arch)
  }
}

impl FromStr for Platform {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once('/') {
      Some((os, arch)) => Ok(Self::new(os.parse()?, arch.parse()?)),
      None => Ok(Self::new(Os::default(), s.parse()?)),
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.qualified())
  }
}

/// Parse a platform list, keeping the first occurrence of each entry.
pub fn parse_platforms<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Vec<Platform>, String> {
  let mut platforms: Vec<Platform> = Vec::new();
  for entry in entries {
    let platform: Platform = entry.parse()?;
    if !platforms.contains(&platform) {
      platforms.push(platform);
    }
  }
  Ok(platforms)
}
