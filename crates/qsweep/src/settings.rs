//! Run settings loaded from YAML
//!
//! ```yaml
//! log_level: debug
//! log_dir: /tmp/qsweep
//! log_rotation:
//!   max_bytes: 10485760
//! sweep:
//!   axes:
//!     - object: qubit
//!       key: frequency
//!       min: 4.0
//!       max: 6.0
//!       step: 0.5
//!     - object: cavity
//!       key: dimension
//!       values: [3, 5]
//!   execution:
//!     mode: parallel
//!     workers: 4
//! ```

use std::path::{Path, PathBuf};

use color_eyre::eyre::{WrapErr, eyre};
use qsweep_core::SweepSpec;
use serde::{Deserialize, Serialize};

use crate::logging::LogRotation;

fn default_log_level() -> String {
    "info".to_string()
}

/// Everything a host needs to run one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    /// Filter level for qsweep targets, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for `qsweep.log`; no file logging when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_rotation: LogRotation,

    #[serde(default)]
    pub sweep: SweepSpec,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            log_rotation: LogRotation::default(),
            sweep: SweepSpec::default(),
        }
    }
}

impl RunSettings {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    /// Save to YAML string
    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Read settings from a YAML file
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading run settings from {}", path.display()))?;
        Self::from_yaml(&content)
            .map_err(|e| eyre!("parsing run settings in {}: {e}", path.display()))
    }

    /// Install file logging when `log_dir` is set; returns the log file path
    pub fn init_logging(&self) -> color_eyre::Result<Option<PathBuf>> {
        self.log_dir
            .as_deref()
            .map(|dir| crate::logging::init_logging(dir, &self.log_level, &self.log_rotation))
            .transpose()
    }

    /// Write settings to a YAML file, creating parent directories
    pub fn save(&self, path: &Path) -> color_eyre::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = self
            .to_yaml()
            .map_err(|e| eyre!("serializing run settings: {e}"))?;
        std::fs::write(path, yaml)
            .wrap_err_with(|| format!("writing run settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsweep_core::{AxisSpec, ExecutionConfig, ExecutionMode, Value};

    const SAMPLE: &str = r#"
log_level: debug
sweep:
  axes:
    - object: qubit
      key: frequency
      min: 4.0
      max: 6.0
      step: 0.5
    - object: cavity
      key: dimension
      values: [3, 5]
    - object: coupling
      key: g
      values: [0.1, 0.2]
      lockstep: true
  execution:
    mode: parallel
    workers: 2
"#;

    #[test]
    fn test_parse_sample() {
        let settings = RunSettings::from_yaml(SAMPLE).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_dir, None);

        let axes = &settings.sweep.axes;
        assert_eq!(axes.len(), 3);
        assert_eq!(axes[0].min, Some(4.0));
        assert_eq!(axes[1].values, Some(vec![Value::Int(3), Value::Int(5)]));
        assert!(axes[2].lockstep);
        assert_eq!(settings.sweep.execution.mode, ExecutionMode::Parallel);
        assert_eq!(settings.sweep.execution.workers, 2);
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let settings = RunSettings::from_yaml("log_dir: /tmp/qsweep\n").unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.log_dir, Some(PathBuf::from("/tmp/qsweep")));
        assert_eq!(settings.log_rotation, LogRotation::default());
        assert!(settings.sweep.axes.is_empty());
    }

    #[test]
    fn test_partial_log_rotation() {
        let settings = RunSettings::from_yaml("log_rotation:\n  keep_bytes: 4096\n").unwrap();
        assert_eq!(settings.log_rotation.keep_bytes, 4096);
        assert_eq!(settings.log_rotation.max_bytes, LogRotation::default().max_bytes);
        assert!(RunSettings::from_yaml("log_rotation:\n  keep: 1\n").is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(RunSettings::from_yaml("log_levle: debug\n").is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.yaml");
        let settings = RunSettings {
            log_level: "trace".to_string(),
            log_dir: Some(dir.path().to_path_buf()),
            log_rotation: LogRotation {
                max_bytes: 2048,
                keep_bytes: 512,
            },
            sweep: SweepSpec {
                axes: vec![AxisSpec::range("qubit", "frequency", 1.0, 2.0, 0.5)],
                execution: ExecutionConfig::sequential(),
            },
        };

        settings.save(&path).unwrap();
        assert_eq!(RunSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunSettings::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(format!("{err:?}").contains("absent.yaml"));
    }
}
