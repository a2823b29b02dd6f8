//! Cross-process lock serializing builder provisioning.
//!
//! Two invocations provisioning the same builder at once would race on
//! `create` and `bootstrap`. Each builder name gets its own lock file under
//! the cache directory; the holder writes its PID so a waiting invocation
//! can say who it is waiting for.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub builder: String,
}

#[derive(Debug, Error)]
pub enum BuilderLockError {
  #[error("builder {builder} is being provisioned by PID {pid} (lock {lock_path})")]
  Contention {
    builder: String,
    pid: u32,
    started_at_unix: u64,
    lock_path: PathBuf,
  },

  #[error("builder lock {lock_path} is held by another process")]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

impl BuilderLockError {
  /// Another process holds the lock; retrying later may succeed.
  pub fn is_contention(&self) -> bool {
    matches!(
      self,
      BuilderLockError::Contention { .. } | BuilderLockError::ContentionUnknown { .. }
    )
  }
}

/// Exclusive lock on one builder name. Released on drop.
pub struct BuilderLock {
  file: File,
  lock_path: PathBuf,
}

impl BuilderLock {
  /// Take the lock without waiting.
  pub fn try_acquire(dir: &Path, builder: &str) -> Result<Self, BuilderLockError> {
    let lock_path = dir.join(format!("{builder}.lock"));

    if !dir.exists() {
      std::fs::create_dir_all(dir).map_err(BuilderLockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(BuilderLockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock || is_lock_violation(&err) {
        return Err(Self::contention_error(&lock_path));
      }
      return Err(BuilderLockError::LockFailed(err));
    }

    Self::write_metadata(&file, builder)?;

    Ok(BuilderLock { file, lock_path })
  }

  /// Metadata as written through the held handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, builder: &str) -> Result<(), BuilderLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      builder: builder.to_string(),
    };

    file.set_len(0).map_err(BuilderLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| BuilderLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(BuilderLockError::WriteMetadata)?;

    Ok(())
  }

  fn contention_error(lock_path: &Path) -> BuilderLockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return BuilderLockError::Contention {
          builder: metadata.builder,
          pid: metadata.pid,
          started_at_unix: metadata.started_at_unix,
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    BuilderLockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(unix)]
fn is_lock_violation(_: &io::Error) -> bool {
  false
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}

// ERROR_LOCK_VIOLATION
#[cfg(windows)]
fn is_lock_violation(err: &io::Error) -> bool {
  err.raw_os_error() == Some(33)
}
