use std::str::FromStr;

use anyhow::{Context, Result};

use crate::customizer::bulk::MAX_WORKERS_LIMIT;
use crate::customizer::distributor::{ActiveSetPolicy, SectionRanking, DEFAULT_MAX_ACTIVE_SECTIONS};
use crate::customizer::locator::SectionRules;
use crate::customizer::processor::EngineConfig;

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Concurrent documents in a batch, clamped to `1..=MAX_WORKERS_LIMIT`.
    pub max_workers: usize,
    pub max_active_sections: usize,
    pub section_ranking: SectionRanking,
    /// Overrides the built-in section-end titles when set.
    pub section_end_labels: Option<Vec<String>>,
    pub max_upload_mb: usize,
    pub max_batch_files: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_active_sections: usize = parse_or(&lookup, "MAX_ACTIVE_SECTIONS", DEFAULT_MAX_ACTIVE_SECTIONS)?;
        if max_active_sections == 0 {
            anyhow::bail!("MAX_ACTIVE_SECTIONS must be at least 1");
        }

        let section_ranking = match lookup("SECTION_RANKING") {
            Some(raw) => SectionRanking::from_str(raw.trim()).map_err(anyhow::Error::msg)?,
            None => SectionRanking::default(),
        };

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_workers: parse_or(&lookup, "MAX_WORKERS", 4usize)?.clamp(1, MAX_WORKERS_LIMIT),
            max_active_sections,
            section_ranking,
            section_end_labels: lookup("SECTION_END_LABELS").map(|raw| parse_labels(&raw)),
            max_upload_mb: parse_or(&lookup, "MAX_UPLOAD_MB", 50usize)?,
            max_batch_files: parse_or(&lookup, "MAX_BATCH_FILES", 20usize)?,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut sections = SectionRules::default();
        if let Some(labels) = &self.section_end_labels {
            sections.section_end_labels = labels.clone();
        }
        EngineConfig {
            sections,
            active_set: ActiveSetPolicy {
                max_sections: self.max_active_sections,
                ranking: self.section_ranking,
            },
            ..EngineConfig::default()
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Comma-separated, case-insensitive labels; blanks are dropped.
fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|label| label.trim().to_lowercase())
        .filter(|label| !label.is_empty())
        .collect()
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.max_active_sections, 3);
        assert_eq!(config.section_ranking, SectionRanking::DocumentOrder);
        assert_eq!(config.max_upload_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.max_batch_files, 20);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("MAX_ACTIVE_SECTIONS", "5"),
            ("SECTION_RANKING", "most_bullets"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        let engine = config.engine_config();
        assert_eq!(engine.active_set.max_sections, 5);
        assert_eq!(engine.active_set.ranking, SectionRanking::MostBullets);
        assert!(!engine.sections.marker_labels.is_empty());
        assert!(engine.sections.section_end_labels.contains(&"education".to_string()));
    }

    #[test]
    fn test_section_end_labels_override() {
        let config = config_from(&[("SECTION_END_LABELS", " Education, Side Projects ,,")]).unwrap();
        assert_eq!(
            config.engine_config().sections.section_end_labels,
            vec!["education", "side projects"]
        );
    }

    #[test]
    fn test_workers_clamped() {
        assert_eq!(config_from(&[("MAX_WORKERS", "64")]).unwrap().max_workers, 8);
        assert_eq!(config_from(&[("MAX_WORKERS", "0")]).unwrap().max_workers, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("MAX_ACTIVE_SECTIONS", "0")]).is_err());
        assert!(config_from(&[("SECTION_RANKING", "random")]).is_err());
    }
}
