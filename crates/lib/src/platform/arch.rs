use std::fmt;
use std::str::FromStr;

/// CPU architectures, named the way the Go toolchain and container
/// registries name them (`amd64`, not `x86_64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  Amd64,
  Arm64,
  Arm,
  S390x,
  Ppc64le,
  Riscv64,
}

impl Arch {
  /// Architecture of the running binary, if it has a toolchain name.
  pub fn current() -> Option<Self> {
    Self::from_target(std::env::consts::ARCH, cfg!(target_endian = "little"))
  }

  /// Map a Rust target architecture. `powerpc64` is only `ppc64le` on
  /// little-endian targets.
  fn from_target(arch: &str, little_endian: bool) -> Option<Self> {
    match arch {
      "x86_64" => Some(Self::Amd64),
      "aarch64" => Some(Self::Arm64),
      "arm" => Some(Self::Arm),
      "s390x" => Some(Self::S390x),
      "powerpc64" if little_endian => Some(Self::Ppc64le),
      "riscv64" => Some(Self::Riscv64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::Arm64 => "arm64",
      Self::Arm => "arm",
      Self::S390x => "s390x",
      Self::Ppc64le => "ppc64le",
      Self::Riscv64 => "riscv64",
    }
  }
}

impl FromStr for Arch {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "amd64" | "x86_64" => Ok(Self::Amd64),
      "arm64" | "aarch64" => Ok(Self::Arm64),
      "arm" => Ok(Self::Arm),
      "s390x" => Ok(Self::S390x),
      "ppc64le" => Ok(Self::Ppc64le),
      "riscv64" => Ok(Self::Riscv64),
      other => Err(format!("unsupported architecture '{other}'")),
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
