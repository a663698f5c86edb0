//! Network widget settings.
//!
//! Loaded from an optional YAML file; every key is optional and falls back
//! to the defaults documented on each field.

use crate::gaps::{checks_for_minutes, GapFilter};
use crate::windows::WindowKind;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_MAX_VISIBLE_GAPS: usize = 3;

/// Settings file as written by the user, before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNetworkConfig {
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub metrics: RawSection,
    #[serde(default)]
    pub gaps: RawGaps,
    #[serde(default)]
    pub uptime: RawUptime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSection {
    pub show: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGaps {
    pub show: Option<bool>,
    /// Gap entries shown before "show more"
    pub max: Option<f64>,
    /// Shortest outage listed, in minutes
    pub cadence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUptime {
    pub show: Option<bool>,
    pub hour: Option<bool>,
    pub day: Option<bool>,
    pub week: Option<bool>,
    pub month: Option<bool>,
    pub year: Option<bool>,
}

impl RawUptime {
    fn flag(&self, kind: WindowKind) -> Option<bool> {
        match kind {
            WindowKind::Hour => self.hour,
            WindowKind::Day => self.day,
            WindowKind::Week => self.week,
            WindowKind::Month => self.month,
            WindowKind::Year => self.year,
        }
    }
}

/// Effective settings after defaults and clamping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    pub log_file: Option<PathBuf>,
    pub metrics: SectionSettings,
    pub gaps: GapSettings,
    pub uptime: UptimeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSettings {
    pub show: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapSettings {
    pub show: bool,
    /// At least 1 (default: 3)
    pub max_visible: usize,
    /// Non-negative (default: 0)
    pub cadence_minutes: f64,
    /// `cadence_minutes` rounded up to whole checks
    pub cadence_checks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeSettings {
    pub show: bool,
    /// Never empty; all windows when none are enabled
    pub windows: Vec<WindowKind>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self::from_raw(RawNetworkConfig::default())
    }
}

impl NetworkSettings {
    pub fn from_raw(raw: RawNetworkConfig) -> Self {
        let max_visible = raw
            .gaps
            .max
            .filter(|v| v.is_finite())
            .map(|v| v.max(1.0) as usize)
            .unwrap_or(DEFAULT_MAX_VISIBLE_GAPS);
        let cadence_minutes = raw
            .gaps
            .cadence
            .filter(|v| v.is_finite())
            .map(|v| v.max(0.0))
            .unwrap_or(0.0);

        Self {
            log_file: raw.log_file,
            metrics: SectionSettings {
                show: raw.metrics.show != Some(false),
            },
            gaps: GapSettings {
                show: raw.gaps.show != Some(false),
                max_visible,
                cadence_minutes,
                cadence_checks: checks_for_minutes(cadence_minutes),
            },
            uptime: UptimeSettings {
                show: raw.uptime.show != Some(false),
                windows: enabled_windows(&raw.uptime),
            },
        }
    }

    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        // an empty document parses as null
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawNetworkConfig = serde_yaml::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    pub fn gap_filter(&self) -> GapFilter {
        GapFilter::new(self.gaps.cadence_minutes, self.gaps.max_visible)
    }
}

/// Windows not explicitly disabled; all of them if that leaves none.
fn enabled_windows(flags: &RawUptime) -> Vec<WindowKind> {
    let enabled: Vec<WindowKind> = WindowKind::ALL
        .into_iter()
        .filter(|kind| flags.flag(*kind) != Some(false))
        .collect();
    if enabled.is_empty() {
        WindowKind::ALL.to_vec()
    } else {
        enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = NetworkSettings::default();
        assert!(settings.log_file.is_none());
        assert!(settings.metrics.show);
        assert!(settings.gaps.show);
        assert!(settings.uptime.show);
        assert_eq!(settings.gaps.max_visible, 3);
        assert_eq!(settings.gaps.cadence_checks, 0);
        assert_eq!(settings.uptime.windows, WindowKind::ALL.to_vec());
    }

    #[test]
    fn test_yaml_overrides() {
        let settings = NetworkSettings::from_yaml(
            r#"
log_file: /var/log/public-ip.log
metrics:
  show: false
gaps:
  max: 0
  cadence: 12
uptime:
  week: false
  year: false
"#,
        )
        .unwrap();
        assert_eq!(settings.log_file, Some(PathBuf::from("/var/log/public-ip.log")));
        assert!(!settings.metrics.show);
        assert_eq!(settings.gaps.max_visible, 1);
        assert_eq!(settings.gaps.cadence_checks, 3);
        assert_eq!(
            settings.uptime.windows,
            vec![WindowKind::Hour, WindowKind::Day, WindowKind::Month]
        );
        assert_eq!(settings.gap_filter().min_missed_checks, 3);
    }

    #[test]
    fn test_all_windows_disabled_falls_back_to_all() {
        let settings = NetworkSettings::from_yaml(
            "uptime: { hour: false, day: false, week: false, month: false, year: false }",
        )
        .unwrap();
        assert_eq!(settings.uptime.windows.len(), 5);
    }

    #[test]
    fn test_negative_cadence_clamped() {
        let settings = NetworkSettings::from_yaml("gaps: { cadence: -10 }").unwrap();
        assert_eq!(settings.gaps.cadence_minutes, 0.0);
        assert_eq!(settings.gaps.cadence_checks, 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gaps:\n  max: 5").unwrap();
        let settings = NetworkSettings::load(file.path()).unwrap();
        assert_eq!(settings.gaps.max_visible, 5);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NetworkSettings::load(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let settings = NetworkSettings::from_yaml("log_file: /tmp/ip.log\ngaps: { cadence: 10 }").unwrap();
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["logFile"], "/tmp/ip.log");
        assert_eq!(value["gaps"]["maxVisible"], 3);
        assert_eq!(value["gaps"]["cadenceMinutes"], 10.0);
        assert_eq!(value["gaps"]["cadenceChecks"], 2);
        assert_eq!(value["uptime"]["windows"][0], "hour");
        assert!(value.get("log_file").is_none());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(NetworkSettings::from_yaml("").unwrap(), NetworkSettings::default());
    }
}
