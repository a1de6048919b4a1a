use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How the recurrence scan moves its comparison baseline after a record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorAdvance {
    /// Move the anchor only when the record recurred within the threshold.
    #[default]
    OnMatch,
    /// Every record becomes the next baseline, matched or not.
    Always,
}

/// Tunable thresholds for the three reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub count_top_most_common_causes: usize,
    pub count_top_longest_repair_times: usize,
    /// Days within which a repeated cause on the same machine counts as a recurrence.
    pub count_cause_failure_recurred: u32,
    pub anchor_advance: AnchorAdvance,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            count_top_most_common_causes: 3,
            count_top_longest_repair_times: 3,
            count_cause_failure_recurred: 15,
            anchor_advance: AnchorAdvance::OnMatch,
        }
    }
}

/// On-disk configuration file.
///
/// ```toml
/// db_path = "atmra.sqlite"
///
/// [analytics]
/// count_top_most_common_causes = 3
/// count_top_longest_repair_times = 3
/// count_cause_failure_recurred = 15
/// anchor_advance = "on_match"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: String,
    pub analytics: AnalyticsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "atmra.sqlite".to_string(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Reject values the reports cannot use. The engine itself accepts anything.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.count_top_most_common_causes == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "count_top_most_common_causes must be greater than 0",
            ));
        }
        if self.count_top_longest_repair_times == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "count_top_longest_repair_times must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let config: AppConfig = toml::from_str(text).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse configuration")
                .with_details(e.to_string())
        })?;
        if config.db_path.trim().is_empty() {
            return Err(AppError::new("CONFIG_INVALID", "db_path must not be empty"));
        }
        config.analytics.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read configuration file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| {
            AppError::new("CONFIG_SERIALIZE_FAILED", "Failed to serialize configuration")
                .with_details(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.analytics.count_cause_failure_recurred, 15);
    }

    #[test]
    fn partial_analytics_section_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [analytics]
            count_cause_failure_recurred = 30
            anchor_advance = "always"
            "#,
        )
        .expect("parse");
        assert_eq!(config.analytics.count_cause_failure_recurred, 30);
        assert_eq!(config.analytics.anchor_advance, AnchorAdvance::Always);
        assert_eq!(config.analytics.count_top_most_common_causes, 3);
    }

    #[test]
    fn zero_top_count_is_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
            [analytics]
            count_top_longest_repair_times = 0
            "#,
        )
        .expect_err("invalid");
        assert_eq!(err.code, "CONFIG_INVALID");
    }

    #[test]
    fn negative_days_do_not_parse() {
        let err = AppConfig::from_toml_str(
            r#"
            [analytics]
            count_cause_failure_recurred = -1
            "#,
        )
        .expect_err("invalid");
        assert_eq!(err.code, "CONFIG_PARSE_FAILED");
    }

    #[test]
    fn loads_from_file_and_falls_back_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.toml");
        assert_eq!(AppConfig::load(&missing).expect("defaults"), AppConfig::default());

        let path = dir.path().join("atmra.toml");
        let mut f = std::fs::File::create(&path).expect("create");
        writeln!(f, "db_path = \"repairs.sqlite\"\n[analytics]\ncount_top_most_common_causes = 5")
            .expect("write");

        let config = AppConfig::load(&path).expect("load");
        assert_eq!(config.db_path, "repairs.sqlite");
        assert_eq!(config.analytics.count_top_most_common_causes, 5);
    }

    #[test]
    fn round_trips_through_toml() {
        let text = AppConfig::default().to_toml_string().expect("serialize");
        assert_eq!(AppConfig::from_toml_str(&text).expect("parse"), AppConfig::default());
    }
}
