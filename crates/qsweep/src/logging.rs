//! File logging for sweep runs
//!
//! Everything goes to one append-only `qsweep.log`. The file is trimmed from
//! the front before each process starts appending, so long-running sweep
//! campaigns never grow it past [`LogRotation::max_bytes`] by much.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::{WrapErr, bail};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the log file inside the log directory
pub const LOG_FILE_NAME: &str = "qsweep.log";

fn default_max_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_keep_bytes() -> u64 {
    1024 * 1024
}

/// Size limits applied to the log file before logging starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRotation {
    /// Trim once the file is larger than this
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Newest bytes kept when trimming, cut back to a whole line
    #[serde(default = "default_keep_bytes")]
    pub keep_bytes: u64,
}

impl Default for LogRotation {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            keep_bytes: default_keep_bytes(),
        }
    }
}

impl LogRotation {
    pub fn validate(&self) -> color_eyre::Result<()> {
        if self.keep_bytes >= self.max_bytes {
            bail!(
                "log rotation keeps {} bytes but trims at {}; keep_bytes must be smaller",
                self.keep_bytes,
                self.max_bytes
            );
        }
        Ok(())
    }

    /// Trim the file at `path` when it is over the limit.
    ///
    /// Returns how many bytes were dropped; a missing file counts as 0.
    pub fn apply(&self, path: &Path) -> io::Result<u64> {
        let len = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        if len <= self.max_bytes {
            return Ok(0);
        }

        let mut tail = Vec::new();
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(len.saturating_sub(self.keep_bytes)))?;
        file.read_to_end(&mut tail)?;

        // first line of the tail is usually cut
        let start = tail.iter().position(|&b| b == b'\n').map_or(0, |i| i + 1);
        let kept = &tail[start..];
        let dropped = len - kept.len() as u64;

        let mut file = File::create(path)?;
        writeln!(file, "--- {LOG_FILE_NAME} trimmed, {dropped} older bytes dropped ---")?;
        file.write_all(kept)?;
        Ok(dropped)
    }
}

/// Send `qsweep` and `qsweep_core` events to `{log_dir}/qsweep.log`.
///
/// `RUST_LOG` takes precedence over `level`. Only one global subscriber can
/// exist per process, so a second call fails.
pub fn init_logging(log_dir: &Path, level: &str, rotation: &LogRotation) -> color_eyre::Result<PathBuf> {
    rotation.validate()?;
    fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("creating log directory {}", log_dir.display()))?;
    let log_path = log_dir.join(LOG_FILE_NAME);

    let dropped = rotation.apply(&log_path).unwrap_or_else(|e| {
        eprintln!("Warning: could not trim {}: {e}", log_path.display());
        0
    });

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("opening {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qsweep={level},qsweep_core={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_thread_names(true),
        )
        .try_init()?;

    tracing::info!(log_path = %log_path.display(), dropped, "qsweep logging initialized");
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> LogRotation {
        LogRotation {
            max_bytes: 500,
            keep_bytes: 50,
        }
    }

    #[test]
    fn test_log_under_the_limit_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        fs::write(&path, "point 0 done\npoint 1 done\n").unwrap();

        assert_eq!(small().apply(&path).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "point 0 done\npoint 1 done\n");
    }

    #[test]
    fn test_trim_keeps_newest_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        // 100 lines of 10 bytes
        let content: String = (0..100).map(|i| format!("entry {i:03}\n")).collect();
        fs::write(&path, &content).unwrap();

        // the 50-byte tail starts on a line boundary, and its first line is
        // still dropped
        assert_eq!(small().apply(&path).unwrap(), 960);
        let trimmed = fs::read_to_string(&path).unwrap();
        let mut lines = trimmed.lines();
        assert_eq!(
            lines.next(),
            Some("--- qsweep.log trimmed, 960 older bytes dropped ---")
        );
        assert_eq!(
            lines.collect::<Vec<_>>(),
            ["entry 096", "entry 097", "entry 098", "entry 099"]
        );
    }

    #[test]
    fn test_missing_log_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(small().apply(&dir.path().join("absent.log")).unwrap(), 0);
    }

    #[test]
    fn test_keep_must_be_below_limit() {
        let rotation = LogRotation {
            max_bytes: 100,
            keep_bytes: 100,
        };
        let err = rotation.validate().unwrap_err();
        assert!(err.to_string().contains("keep_bytes must be smaller"));
        assert!(LogRotation::default().validate().is_ok());
    }

    #[test]
    fn test_init_from_settings_writes_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = crate::RunSettings {
            log_level: "debug".to_string(),
            log_dir: Some(dir.path().join("logs")),
            ..Default::default()
        };

        let path = settings.init_logging().unwrap().unwrap();
        assert_eq!(path, dir.path().join("logs").join(LOG_FILE_NAME));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("logging initialized"));

        // only one global subscriber per process
        assert!(init_logging(dir.path(), "info", &LogRotation::default()).is_err());
    }
}
