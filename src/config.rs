use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

const DEFAULT_KNOWN_ORGANIZATIONS: &[&str] = &["Spacenos", "Sensewire", "Infiprime", "RIT"];
const DEFAULT_FALLBACK_ROOT: &str = "General";

/// Top-level foldering vocabulary handed to the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRules {
    pub known_organizations: Vec<String>,
    pub fallback_root: String,
}

impl Default for TaxonomyRules {
    fn default() -> Self {
        Self {
            known_organizations: DEFAULT_KNOWN_ORGANIZATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_root: DEFAULT_FALLBACK_ROOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub drive_base_url: String,
    pub taxonomy: TaxonomyRules,
    pub sample_concurrency: usize,
    pub execute_concurrency: usize,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            drive_base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
            taxonomy: TaxonomyRules::default(),
            sample_concurrency: DEFAULT_CONCURRENCY,
            execute_concurrency: DEFAULT_CONCURRENCY,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Reads the process environment, loading a `.env` file first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let taxonomy = TaxonomyRules {
            known_organizations: non_empty("ORGANIZER_KNOWN_ORGS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(ToOwned::to_owned)
                        .collect()
                })
                .unwrap_or(defaults.taxonomy.known_organizations),
            fallback_root: non_empty("ORGANIZER_FALLBACK_ROOT")
                .unwrap_or(defaults.taxonomy.fallback_root),
        };

        Self {
            openai_api_key: non_empty("OPENAI_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            temperature: parse_or(non_empty("COMPLETION_TEMPERATURE"), defaults.temperature),
            max_tokens: parse_or(non_empty("COMPLETION_MAX_TOKENS"), defaults.max_tokens),
            drive_base_url: non_empty("DRIVE_API_BASE_URL").unwrap_or(defaults.drive_base_url),
            taxonomy,
            sample_concurrency: parse_or(
                non_empty("ORGANIZER_SAMPLE_CONCURRENCY"),
                defaults.sample_concurrency,
            )
            .max(1),
            execute_concurrency: parse_or(
                non_empty("ORGANIZER_EXECUTE_CONCURRENCY"),
                defaults.execute_concurrency,
            )
            .max(1),
            http_timeout_secs: parse_or(non_empty("HTTP_TIMEOUT_SECS"), defaults.http_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

fn parse_or<T: FromStr + Copy>(raw: Option<String>, fallback: T) -> T {
    match raw {
        None => fallback,
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring unparseable config value {value:?}");
            fallback
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.taxonomy, TaxonomyRules::default());
    }

    #[test]
    fn reads_overrides_and_org_list() {
        let config = config_from(&[
            ("OPENAI_KEY", "sk-test"),
            ("ORGANIZER_KNOWN_ORGS", "Acme, Globex ,,"),
            ("ORGANIZER_EXECUTE_CONCURRENCY", "0"),
            ("COMPLETION_TEMPERATURE", "0.2"),
        ]);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.taxonomy.known_organizations, vec!["Acme", "Globex"]);
        assert_eq!(config.execute_concurrency, 1);
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let config = config_from(&[("COMPLETION_MAX_TOKENS", "lots")]);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
