//! Crate-wide constants.

pub const APP_NAME: &str = "taskwell";

/// Length of the truncated snapshot fingerprint.
pub const FINGERPRINT_LEN: usize = 20;

/// Context flag exported into sandboxed commands. A nested orchestrator that
/// sees it set runs every action directly.
pub const IN_SANDBOX_ENV: &str = "TASKWELL_IN_SANDBOX";

/// Overrides the directory holding the builder lock.
pub const CACHE_DIR_ENV: &str = "TASKWELL_CACHE_DIR";

/// Exit code for errors raised before any task ran (unknown task, bad configuration).
pub const EXIT_RESOLUTION: i32 = 64;

/// Exit code when the sandbox engine is unreachable or lacks a capability.
pub const EXIT_SANDBOX: i32 = 69;

/// Exit code after an external interrupt.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit code the container engine uses for its own failures in `run`.
///
/// The engine passes a sandboxed body's exit code through unchanged, so a
/// body that itself exits 125 is reported as an unavailable sandbox rather
/// than a task failure. Task scripts must not use this code.
pub const ENGINE_RUN_FAILURE: i32 = 125;

/// Minimum container engine server version with buildx support.
pub const MIN_ENGINE_VERSION: (u64, u64) = (19, 3);
